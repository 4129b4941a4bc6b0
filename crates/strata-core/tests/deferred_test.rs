mod common;

use common::{MockContext, MockDevice, NativeCall};
use strata_core::math::LinearRgba;
use strata_core::renderer::*;

fn record_scene(commands: &mut CommandBuffer) {
    let color = RenderTarget::new(TextureId(1));
    let depth = DepthStencilAttachment::new(RenderTarget::new(TextureId(2)));

    commands.push_debug_group("scene").unwrap();
    commands
        .begin_render_pass(
            &[
                ColorAttachment::clear(color, LinearRgba::WHITE),
                ColorAttachment::discard(RenderTarget::new(TextureId(3))),
            ],
            Some(&depth),
        )
        .unwrap();
    commands
        .set_viewports(&[Viewport::from_size(800.0, 600.0)])
        .unwrap();
    commands.set_scissor_rect(&ScissorRect::new(0, 0, 800, 600)).unwrap();
    commands.set_blend_color(LinearRgba::TRANSPARENT).unwrap();
    commands.bind_buffer(0, BufferId(11)).unwrap();
    commands.bind_buffer_data(1, b"uniforms").unwrap();
    commands.insert_debug_marker("draw").unwrap();
    commands.end_render_pass().unwrap();
    commands.pop_debug_group().unwrap();
}

#[test]
fn test_zero_block_size_selects_native_deferred() {
    let device = MockDevice::new();
    let mut commands = CommandBuffer::new(device.shared(), 0).unwrap();

    assert_eq!(commands.mode(), RecordingMode::NativeDeferred);
    assert_eq!(
        commands.recorded_bytes(),
        Err(CommandBufferError::InterpreterDisabled)
    );
    assert_eq!(commands.command_count(), Err(CommandBufferError::InterpreterDisabled));
    assert_eq!(device.state().deferred_contexts_created, 1);

    commands.insert_debug_marker("direct").unwrap();
    assert_eq!(device.state().command_lists_finished, 0);

    let mut context = device.immediate_context();
    commands.execute(&mut context).unwrap();

    assert_eq!(device.state().command_lists_finished, 1);
    assert_eq!(
        context.calls,
        vec![
            NativeCall::ExecuteCommandList(CommandListId(0)),
            NativeCall::SetMarker("direct".to_owned()),
        ]
    );
}

#[test]
fn test_nonzero_block_size_never_touches_deferred_contexts() {
    let device = MockDevice::new();
    let mut commands = CommandBuffer::new(device.shared(), 4096).unwrap();
    assert_eq!(commands.mode(), RecordingMode::Interpreted);

    record_scene(&mut commands);
    let mut context = device.immediate_context();
    commands.execute(&mut context).unwrap();

    let state = device.state();
    assert_eq!(state.deferred_contexts_created, 0);
    assert_eq!(state.command_lists_finished, 0);
}

#[test]
fn test_both_modes_issue_identical_native_calls() {
    let device = MockDevice::new();

    let mut interpreted =
        CommandBuffer::with_settings(device.shared(), &CommandBufferSettings::default()).unwrap();
    let mut native = CommandBuffer::with_settings(
        device.shared(),
        &CommandBufferSettings::native_deferred(),
    )
    .unwrap();

    record_scene(&mut interpreted);
    record_scene(&mut native);

    let mut interpreted_context = MockContext::standalone();
    interpreted.execute(&mut interpreted_context).unwrap();
    let mut native_context = device.immediate_context();
    native.execute(&mut native_context).unwrap();

    assert_eq!(interpreted_context.calls.len(), 13);
    assert_eq!(interpreted_context.calls, native_context.work());
}

#[test]
fn test_deferred_reset_discards_native_work() {
    let device = MockDevice::new();
    let mut commands = CommandBuffer::new(device.shared(), 0).unwrap();

    commands.insert_debug_marker("discarded").unwrap();
    commands.reset();
    assert_eq!(device.state().deferred_resets, 1);

    commands.insert_debug_marker("kept").unwrap();
    let mut context = device.immediate_context();
    commands.execute(&mut context).unwrap();
    assert_eq!(context.work(), vec![NativeCall::SetMarker("kept".to_owned())]);
}

#[test]
fn test_deferred_commit_runs_on_the_immediate_context() {
    let device = MockDevice::new();
    let mut commands = CommandBuffer::new(device.shared(), 0).unwrap();
    record_scene(&mut commands);

    let submission = commands.commit().unwrap();
    commands.wait_until_completed().unwrap();

    let state = device.state();
    assert_eq!(state.waited, vec![submission]);
    assert_eq!(
        state.immediate_calls.first(),
        Some(&NativeCall::ExecuteCommandList(CommandListId(0)))
    );
    assert_eq!(state.immediate_calls.len(), 14);
    assert!(state.lists.is_empty());
}

#[test]
fn test_deferred_context_creation_failure_is_reported() {
    let device = MockDevice::new();
    device.state().fail_deferred_creation = true;

    let err = CommandBuffer::new(device.shared(), 0).unwrap_err();
    assert!(matches!(
        err,
        CommandBufferError::Native(NativeError::BackendError(_))
    ));

    // The interpreted mode does not need a deferred context.
    assert!(CommandBuffer::new(device.shared(), 1).is_ok());
}

#[test]
fn test_native_errors_pass_through_execute() {
    let device = MockDevice::new();
    let mut commands = CommandBuffer::new(device.shared(), 0).unwrap();
    commands.pop_debug_group().unwrap();

    // A context that does not share the device's command lists cannot run them.
    let mut foreign = MockContext::standalone();
    assert_eq!(
        commands.execute(&mut foreign),
        Err(CommandBufferError::Native(NativeError::UnknownCommandList(
            CommandListId(0)
        )))
    );
}

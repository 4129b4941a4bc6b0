// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The interpreted command buffer: serialize on record, dispatch on execute.

use super::dispatch::DispatchTable;
use super::encoder::{CommandDecoder, CommandEncoder};
use super::records::encode_render_pass;
use super::stream::CommandStream;
use super::RecordingMode;
use crate::math::LinearRgba;
use crate::renderer::api::*;
use crate::renderer::error::{CommandBufferError, CommandStreamError};
use crate::renderer::traits::{CommandRecorder, NativeContext};

/// A command buffer that records into a [`CommandStream`] and replays it through a
/// [`DispatchTable`].
///
/// Recording never touches a native context. [`CommandRecorder::execute`] rewinds
/// the stream and replays every command in order, so the same recording can be
/// executed any number of times.
///
/// A malformed stream means recording and replay disagree on a payload shape. It is
/// always logged and returned; with [`SoftwareCommandBuffer::set_fail_loudly`] on,
/// which is the default in debug builds, replay panics right after logging it.
#[derive(Debug)]
pub struct SoftwareCommandBuffer {
    stream: CommandStream,
    dispatch: DispatchTable,
    command_count: usize,
    fail_loudly: bool,
}

impl SoftwareCommandBuffer {
    /// Creates a buffer whose stream is preallocated to `stream_block_size` bytes.
    pub fn new(stream_block_size: u64) -> Self {
        let capacity = usize::try_from(stream_block_size).unwrap_or(usize::MAX);
        Self {
            stream: CommandStream::with_capacity(capacity),
            dispatch: DispatchTable::new(),
            command_count: 0,
            fail_loudly: cfg!(debug_assertions),
        }
    }

    /// Chooses whether a malformed stream panics during replay instead of only
    /// being returned. Native errors are always returned.
    pub fn set_fail_loudly(&mut self, fail_loudly: bool) {
        self.fail_loudly = fail_loudly;
    }

    /// The recorded stream.
    pub fn stream(&self) -> &CommandStream {
        &self.stream
    }

    /// The number of commands recorded since the last reset.
    pub fn command_count(&self) -> usize {
        self.command_count
    }

    fn record<F>(&mut self, id: CommandId, payload: F) -> Result<(), CommandBufferError>
    where
        F: FnOnce(&mut CommandEncoder<'_>) -> Result<(), CommandStreamError>,
    {
        CommandEncoder::new(&mut self.stream).encode(id, payload)?;
        self.command_count += 1;
        log::trace!("Recorded {} ({} bytes total).", id, self.stream.len());
        Ok(())
    }

    /// Replays every recorded command against `context`, returning how many ran.
    ///
    /// Replay stops at the first malformed command; the error is logged with the
    /// command's byte offset and returned. Reads never cross a command's declared
    /// payload, so a short length fails before the native call is made.
    ///
    /// # Panics
    ///
    /// On a malformed stream when loud failure is on, see
    /// [`SoftwareCommandBuffer::set_fail_loudly`].
    pub fn replay(&self, context: &mut dyn NativeContext) -> Result<usize, CommandBufferError> {
        let mut decoder = CommandDecoder::new(&self.stream);
        decoder.rewind();

        let mut replayed = 0;
        loop {
            let position = decoder.position();
            let header = match decoder.read_command_header() {
                Ok(Some(header)) => header,
                Ok(None) => break,
                Err(err) => {
                    log::error!("Malformed command header at byte {position}: {err}");
                    return Err(self.malformed(err.into()));
                }
            };

            log::trace!("Replaying {} at byte {}.", header.id, header.position);
            let result = self
                .dispatch
                .dispatch(header.id, &mut decoder, context)
                .and_then(|()| decoder.finish_command(&header).map_err(Into::into));
            if let Err(err) = result {
                log::error!(
                    "Failed to replay {} at byte {}: {}",
                    header.id,
                    header.position,
                    err
                );
                return Err(self.malformed(err));
            }
            replayed += 1;
        }
        Ok(replayed)
    }

    fn malformed(&self, err: CommandBufferError) -> CommandBufferError {
        if self.fail_loudly && matches!(err, CommandBufferError::Stream(_)) {
            panic!("Malformed command stream: {err}");
        }
        err
    }
}

impl CommandRecorder for SoftwareCommandBuffer {
    fn push_debug_group(&mut self, label: &str) -> Result<(), CommandBufferError> {
        self.record(CommandId::PushDebugGroup, |e| e.write_str(label))
    }

    fn pop_debug_group(&mut self) -> Result<(), CommandBufferError> {
        self.record(CommandId::PopDebugGroup, |_| Ok(()))
    }

    fn insert_debug_marker(&mut self, label: &str) -> Result<(), CommandBufferError> {
        self.record(CommandId::InsertDebugMarker, |e| e.write_str(label))
    }

    fn begin_render_pass(
        &mut self,
        colors: &[ColorAttachment],
        depth_stencil: Option<&DepthStencilAttachment>,
    ) -> Result<(), CommandBufferError> {
        check_limit("color attachments", colors.len(), MAX_COLOR_ATTACHMENTS)?;
        self.record(CommandId::BeginRenderPass, |e| {
            encode_render_pass(e, colors, depth_stencil)
        })
    }

    fn end_render_pass(&mut self) -> Result<(), CommandBufferError> {
        self.record(CommandId::EndRenderPass, |_| Ok(()))
    }

    fn set_viewports(&mut self, viewports: &[Viewport]) -> Result<(), CommandBufferError> {
        check_limit("viewports", viewports.len(), MAX_VIEWPORTS)?;
        self.record(CommandId::SetViewports, |e| e.write_slice(viewports))
    }

    fn set_scissor_rects(&mut self, rects: &[ScissorRect]) -> Result<(), CommandBufferError> {
        check_limit("scissor rects", rects.len(), MAX_VIEWPORTS)?;
        self.record(CommandId::SetScissorRects, |e| e.write_slice(rects))
    }

    fn set_blend_color(&mut self, color: LinearRgba) -> Result<(), CommandBufferError> {
        self.record(CommandId::SetBlendColor, |e| {
            e.write(&color);
            Ok(())
        })
    }

    fn bind_buffer(&mut self, slot: u32, buffer: BufferId) -> Result<(), CommandBufferError> {
        self.record(CommandId::BindBuffer, |e| {
            e.write(&slot);
            e.write(&buffer);
            Ok(())
        })
    }

    fn bind_buffer_data(&mut self, slot: u32, data: &[u8]) -> Result<(), CommandBufferError> {
        self.record(CommandId::BindBufferData, |e| {
            e.write(&slot);
            e.write_bytes(data)
        })
    }

    fn execute(&mut self, context: &mut dyn NativeContext) -> Result<(), CommandBufferError> {
        let replayed = self.replay(context)?;
        log::debug!(
            "Executed {} commands ({} bytes) from the command stream.",
            replayed,
            self.stream.len()
        );
        Ok(())
    }

    fn reset(&mut self) {
        log::debug!(
            "Resetting command stream ({} commands, {} bytes).",
            self.command_count,
            self.stream.len()
        );
        self.stream.reset();
        self.command_count = 0;
    }

    fn mode(&self) -> RecordingMode {
        RecordingMode::Interpreted
    }
}

/// Rejects a count above a fixed per-command limit.
pub(crate) fn check_limit(
    what: &'static str,
    count: usize,
    max: usize,
) -> Result<(), CommandBufferError> {
    if count > max {
        return Err(CommandBufferError::LimitExceeded { what, count, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::traits::DebugAnnotation;
    use crate::renderer::command::COMMAND_HEADER_SIZE;
    use crate::renderer::NativeError;

    /// Counts calls and remembers the last debug label.
    #[derive(Default)]
    struct CountingContext {
        calls: usize,
        labels: Vec<String>,
    }

    impl DebugAnnotation for CountingContext {
        fn begin_event(&mut self, label: &str) {
            self.calls += 1;
            self.labels.push(label.to_owned());
        }
        fn end_event(&mut self) {
            self.calls += 1;
        }
        fn set_marker(&mut self, label: &str) {
            self.calls += 1;
            self.labels.push(label.to_owned());
        }
    }

    impl NativeContext for CountingContext {
        fn clear_render_target(&mut self, _target: &RenderTarget, _color: LinearRgba) {
            self.calls += 1;
        }
        fn discard_render_target(&mut self, _target: &RenderTarget) {
            self.calls += 1;
        }
        fn clear_depth_stencil(&mut self, _: &RenderTarget, _: Option<f32>, _: Option<u8>) {
            self.calls += 1;
        }
        fn set_render_targets(&mut self, _: &[RenderTarget], _: Option<&RenderTarget>) {
            self.calls += 1;
        }
        fn set_viewports(&mut self, _viewports: &[Viewport]) {
            self.calls += 1;
        }
        fn set_scissor_rects(&mut self, _rects: &[ScissorRect]) {
            self.calls += 1;
        }
        fn set_blend_color(&mut self, _color: LinearRgba) {
            self.calls += 1;
        }
        fn bind_buffer(&mut self, _slot: u32, _buffer: BufferId) {
            self.calls += 1;
        }
        fn bind_buffer_data(&mut self, _slot: u32, _data: &[u8]) {
            self.calls += 1;
        }
        fn execute_command_list(&mut self, list: CommandListId) -> Result<(), NativeError> {
            Err(NativeError::UnknownCommandList(list))
        }
    }

    #[test]
    fn test_empty_buffer_replays_nothing() {
        let buffer = SoftwareCommandBuffer::new(256);
        let mut context = CountingContext::default();
        assert_eq!(buffer.replay(&mut context).unwrap(), 0);
        assert_eq!(context.calls, 0);
    }

    #[test]
    fn test_replay_is_repeatable() {
        let mut buffer = SoftwareCommandBuffer::new(256);
        buffer.insert_debug_marker("a").unwrap();
        buffer.set_blend_color(LinearRgba::WHITE).unwrap();

        let mut context = CountingContext::default();
        assert_eq!(buffer.replay(&mut context).unwrap(), 2);
        assert_eq!(buffer.replay(&mut context).unwrap(), 2);
        assert_eq!(context.labels, vec!["a", "a"]);
        assert_eq!(buffer.command_count(), 2);
    }

    #[test]
    fn test_limits_are_checked_before_recording() {
        let mut buffer = SoftwareCommandBuffer::new(0);
        let colors = [ColorAttachment::load(RenderTarget::default()); MAX_COLOR_ATTACHMENTS + 1];
        assert_eq!(
            buffer.begin_render_pass(&colors, None),
            Err(CommandBufferError::LimitExceeded {
                what: "color attachments",
                count: MAX_COLOR_ATTACHMENTS + 1,
                max: MAX_COLOR_ATTACHMENTS,
            })
        );
        let viewports = [Viewport::from_size(1.0, 1.0); MAX_VIEWPORTS + 1];
        assert!(buffer.set_viewports(&viewports).is_err());
        assert!(buffer.stream().is_empty());
        assert_eq!(buffer.command_count(), 0);
    }

    #[test]
    fn test_corrupted_load_action_stops_replay() {
        let mut buffer = SoftwareCommandBuffer::new(256);
        buffer.insert_debug_marker("before").unwrap();
        let marker_len = buffer.stream.len();
        buffer
            .begin_render_pass(&[ColorAttachment::load(RenderTarget::default())], None)
            .unwrap();
        buffer.insert_debug_marker("after").unwrap();

        // header, then the count prefix, then the record's target.
        let load_action_offset = marker_len + 5 + 4 + 16;
        buffer
            .stream
            .overwrite_raw(load_action_offset, &99u32.to_ne_bytes());

        buffer.set_fail_loudly(false);
        let mut context = CountingContext::default();
        let err = buffer.replay(&mut context).unwrap_err();
        assert!(matches!(
            err,
            CommandBufferError::Stream(CommandStreamError::InvalidValue { value: 99, .. })
        ));
        assert_eq!(context.labels, vec!["before"]);
    }

    #[test]
    fn test_trailing_garbage_is_detected() {
        let mut buffer = SoftwareCommandBuffer::new(64);
        buffer.pop_debug_group().unwrap();
        buffer.stream.write_raw(&[CommandId::COUNT as u8]);

        buffer.set_fail_loudly(false);
        let mut context = CountingContext::default();
        let err = buffer.replay(&mut context).unwrap_err();
        assert_eq!(
            err,
            CommandBufferError::Stream(CommandStreamError::UnknownCommand {
                position: 5,
                tag: CommandId::COUNT as u8,
            })
        );
        assert_eq!(context.calls, 1);
    }

    #[test]
    fn test_oversized_payload_length_is_a_mismatch() {
        let mut buffer = SoftwareCommandBuffer::new(64);
        buffer.set_blend_color(LinearRgba::RED).unwrap();
        buffer.stream.write_raw(&[0; 4]);
        buffer.stream.overwrite_raw(1, &20u32.to_ne_bytes());

        buffer.set_fail_loudly(false);
        let mut context = CountingContext::default();
        let err = buffer.replay(&mut context).unwrap_err();
        assert!(matches!(
            err,
            CommandBufferError::Stream(CommandStreamError::PayloadMismatch {
                expected: 20,
                consumed: 16,
                ..
            })
        ));
    }

    #[test]
    fn test_reset_keeps_capacity() {
        let mut buffer = SoftwareCommandBuffer::new(128);
        buffer.push_debug_group("frame").unwrap();
        let capacity = buffer.stream().capacity();
        buffer.reset();
        assert!(buffer.stream().is_empty());
        assert_eq!(buffer.command_count(), 0);
        assert_eq!(buffer.stream().capacity(), capacity);
    }

    #[test]
    fn test_short_payload_length_issues_no_native_call() {
        let mut buffer = SoftwareCommandBuffer::new(64);
        buffer.set_fail_loudly(false);
        buffer.push_debug_group("abc").unwrap();
        buffer.stream.overwrite_raw(1, &0u32.to_ne_bytes());

        let mut context = CountingContext::default();
        let err = buffer.replay(&mut context).unwrap_err();
        assert_eq!(
            err,
            CommandBufferError::Stream(CommandStreamError::Overrun {
                position: COMMAND_HEADER_SIZE,
                requested: 4,
                remaining: 0,
            })
        );
        assert_eq!(context.calls, 0);
        assert!(context.labels.is_empty());
    }

    #[test]
    #[should_panic(expected = "Malformed command stream")]
    fn test_loud_failure_panics_on_malformed_stream() {
        let mut buffer = SoftwareCommandBuffer::new(64);
        buffer.set_fail_loudly(true);
        buffer.stream.write_raw(&[CommandId::COUNT as u8, 0, 0, 0, 0]);
        let _ = buffer.replay(&mut CountingContext::default());
    }
}

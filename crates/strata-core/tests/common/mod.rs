#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use strata_core::math::LinearRgba;
use strata_core::renderer::traits::{
    DebugAnnotation, NativeContext, NativeDeferredContext, NativeDevice,
};
use strata_core::renderer::{
    BufferId, CommandBufferError, CommandListId, NativeError, RenderTarget, ScissorRect,
    SubmissionId, Viewport,
};

/// One observed call on a mock context.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeCall {
    BeginEvent(String),
    EndEvent,
    SetMarker(String),
    ClearRenderTarget(RenderTarget, LinearRgba),
    DiscardRenderTarget(RenderTarget),
    ClearDepthStencil(RenderTarget, Option<f32>, Option<u8>),
    SetRenderTargets(Vec<RenderTarget>, Option<RenderTarget>),
    SetViewports(Vec<Viewport>),
    SetScissorRects(Vec<ScissorRect>),
    SetBlendColor(LinearRgba),
    BindBuffer(u32, BufferId),
    BindBufferData(u32, Vec<u8>),
    ExecuteCommandList(CommandListId),
}

/// State shared between a mock device and every context it hands out.
#[derive(Debug, Default)]
pub struct MockState {
    pub fail_deferred_creation: bool,
    pub deferred_contexts_created: usize,
    pub command_lists_finished: usize,
    pub deferred_resets: usize,
    pub lists: HashMap<CommandListId, Vec<NativeCall>>,
    next_list: u64,
    pub submissions: Vec<SubmissionId>,
    pub waited: Vec<SubmissionId>,
    pub released: Vec<SubmissionId>,
    /// Everything issued on the immediate context during submissions.
    pub immediate_calls: Vec<NativeCall>,
}

/// A context that logs every call. Doubles as a deferred context.
#[derive(Debug)]
pub struct MockContext {
    state: Arc<Mutex<MockState>>,
    pub calls: Vec<NativeCall>,
}

impl MockContext {
    pub fn new(state: Arc<Mutex<MockState>>) -> Self {
        Self {
            state,
            calls: Vec::new(),
        }
    }

    /// A context with private state, for replay-only tests.
    pub fn standalone() -> Self {
        Self::new(Arc::default())
    }

    /// The calls with command list executions removed, i.e. only the work itself.
    pub fn work(&self) -> Vec<NativeCall> {
        self.calls
            .iter()
            .filter(|call| !matches!(call, NativeCall::ExecuteCommandList(_)))
            .cloned()
            .collect()
    }
}

impl DebugAnnotation for MockContext {
    fn begin_event(&mut self, label: &str) {
        self.calls.push(NativeCall::BeginEvent(label.to_owned()));
    }

    fn end_event(&mut self) {
        self.calls.push(NativeCall::EndEvent);
    }

    fn set_marker(&mut self, label: &str) {
        self.calls.push(NativeCall::SetMarker(label.to_owned()));
    }
}

impl NativeContext for MockContext {
    fn clear_render_target(&mut self, target: &RenderTarget, color: LinearRgba) {
        self.calls.push(NativeCall::ClearRenderTarget(*target, color));
    }

    fn discard_render_target(&mut self, target: &RenderTarget) {
        self.calls.push(NativeCall::DiscardRenderTarget(*target));
    }

    fn clear_depth_stencil(&mut self, target: &RenderTarget, depth: Option<f32>, stencil: Option<u8>) {
        self.calls
            .push(NativeCall::ClearDepthStencil(*target, depth, stencil));
    }

    fn set_render_targets(&mut self, colors: &[RenderTarget], depth_stencil: Option<&RenderTarget>) {
        self.calls.push(NativeCall::SetRenderTargets(
            colors.to_vec(),
            depth_stencil.copied(),
        ));
    }

    fn set_viewports(&mut self, viewports: &[Viewport]) {
        self.calls.push(NativeCall::SetViewports(viewports.to_vec()));
    }

    fn set_scissor_rects(&mut self, rects: &[ScissorRect]) {
        self.calls.push(NativeCall::SetScissorRects(rects.to_vec()));
    }

    fn set_blend_color(&mut self, color: LinearRgba) {
        self.calls.push(NativeCall::SetBlendColor(color));
    }

    fn bind_buffer(&mut self, slot: u32, buffer: BufferId) {
        self.calls.push(NativeCall::BindBuffer(slot, buffer));
    }

    fn bind_buffer_data(&mut self, slot: u32, data: &[u8]) {
        self.calls.push(NativeCall::BindBufferData(slot, data.to_vec()));
    }

    fn execute_command_list(&mut self, list: CommandListId) -> Result<(), NativeError> {
        let recorded = self
            .state
            .lock()
            .unwrap()
            .lists
            .remove(&list)
            .ok_or(NativeError::UnknownCommandList(list))?;
        self.calls.push(NativeCall::ExecuteCommandList(list));
        self.calls.extend(recorded);
        Ok(())
    }
}

impl NativeDeferredContext for MockContext {
    fn finish_command_list(&mut self) -> Result<CommandListId, NativeError> {
        let mut state = self.state.lock().unwrap();
        let id = CommandListId(state.next_list);
        state.next_list += 1;
        state.command_lists_finished += 1;
        state.lists.insert(id, std::mem::take(&mut self.calls));
        Ok(id)
    }

    fn reset(&mut self) {
        self.calls.clear();
        self.state.lock().unwrap().deferred_resets += 1;
    }
}

/// A device that hands out [`MockContext`]s and tracks submissions.
#[derive(Debug, Default, Clone)]
pub struct MockDevice {
    state: Arc<Mutex<MockState>>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    /// An immediate context sharing this device's command lists.
    pub fn immediate_context(&self) -> MockContext {
        MockContext::new(self.state.clone())
    }

    pub fn shared(&self) -> Arc<dyn NativeDevice> {
        Arc::new(self.clone())
    }
}

impl NativeDevice for MockDevice {
    fn create_deferred_context(&self) -> Result<Box<dyn NativeDeferredContext>, NativeError> {
        let mut state = self.state();
        if state.fail_deferred_creation {
            return Err(NativeError::BackendError(
                "deferred contexts are not supported".to_owned(),
            ));
        }
        state.deferred_contexts_created += 1;
        Ok(Box::new(MockContext::new(self.state.clone())))
    }

    fn submit(
        &self,
        record: &mut dyn FnMut(&mut dyn NativeContext) -> Result<(), CommandBufferError>,
    ) -> Result<SubmissionId, CommandBufferError> {
        let mut context = self.immediate_context();
        record(&mut context)?;

        let mut state = self.state();
        let id = SubmissionId(state.submissions.len() as u64 + 1);
        state.submissions.push(id);
        state.immediate_calls.extend(context.calls);
        Ok(id)
    }

    fn wait_for_submission(&self, submission: SubmissionId) -> Result<(), NativeError> {
        let mut state = self.state();
        if !state.submissions.contains(&submission) || state.waited.contains(&submission) {
            return Err(NativeError::UnknownSubmission(submission));
        }
        state.waited.push(submission);
        Ok(())
    }

    fn release_submission(&self, submission: SubmissionId) {
        self.state().released.push(submission);
    }
}

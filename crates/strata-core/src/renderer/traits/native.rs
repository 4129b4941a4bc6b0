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

use crate::math::LinearRgba;
use crate::renderer::api::*;
use crate::renderer::error::{CommandBufferError, NativeError};
use std::fmt::Debug;

/// Debug annotation calls understood by graphics debuggers.
pub trait DebugAnnotation {
    /// Opens a named event scope.
    fn begin_event(&mut self, label: &str);

    /// Closes the innermost event scope.
    fn end_event(&mut self);

    /// Inserts a single named marker.
    fn set_marker(&mut self, label: &str);
}

/// A native graphics context that commands are replayed against.
///
/// Apart from [`NativeContext::execute_command_list`], these calls cannot fail at the
/// call site. A backend that detects a problem (an unknown texture handle, for
/// instance) reports it when the recorded work is finalized or submitted.
pub trait NativeContext: DebugAnnotation + Send {
    /// Clears a color target to `color`.
    fn clear_render_target(&mut self, target: &RenderTarget, color: LinearRgba);

    /// Tells the backend that the existing contents of `target` are no longer needed.
    fn discard_render_target(&mut self, target: &RenderTarget);

    /// Clears the depth and/or stencil aspects of a depth-stencil target.
    ///
    /// An aspect whose value is `None` is left untouched.
    fn clear_depth_stencil(&mut self, target: &RenderTarget, depth: Option<f32>, stencil: Option<u8>);

    /// Binds the color targets and optional depth-stencil target for subsequent work.
    ///
    /// An empty `colors` slice with no depth-stencil unbinds everything.
    fn set_render_targets(&mut self, colors: &[RenderTarget], depth_stencil: Option<&RenderTarget>);

    /// Sets the viewports, in slot order.
    fn set_viewports(&mut self, viewports: &[Viewport]);

    /// Sets the scissor rectangles, in slot order.
    fn set_scissor_rects(&mut self, rects: &[ScissorRect]);

    /// Sets the constant blend color.
    fn set_blend_color(&mut self, color: LinearRgba);

    /// Binds a device-owned buffer to `slot`.
    fn bind_buffer(&mut self, slot: u32, buffer: BufferId);

    /// Binds a block of inline data to `slot`.
    fn bind_buffer_data(&mut self, slot: u32, data: &[u8]);

    /// Executes a command list previously produced by a deferred context.
    fn execute_command_list(&mut self, list: CommandListId) -> Result<(), NativeError>;
}

/// A native context that accumulates work instead of executing it.
pub trait NativeDeferredContext: NativeContext {
    /// Finalizes the accumulated work into a command list and starts a new, empty one.
    fn finish_command_list(&mut self) -> Result<CommandListId, NativeError>;

    /// Discards all accumulated work.
    fn reset(&mut self);
}

/// The device-level collaborator used by command buffers.
///
/// This trait is object-safe and shared as an `Arc<dyn NativeDevice>` between
/// every command buffer recording for it.
pub trait NativeDevice: Send + Sync + Debug + 'static {
    /// Creates a context that records into a native command list.
    /// ## Returns
    /// A boxed deferred context owned by the caller.
    /// ## Errors
    /// * `NativeError` - If the backend cannot create a deferred context.
    fn create_deferred_context(&self) -> Result<Box<dyn NativeDeferredContext>, NativeError>;

    /// Submits work to the device.
    ///
    /// The device hands its immediate context to `record`, then queues whatever was
    /// issued against it for execution.
    /// ## Arguments
    /// * `record` - Issues the work against the immediate context.
    /// ## Returns
    /// A handle that can later be passed to [`NativeDevice::wait_for_submission`].
    /// ## Errors
    /// * `CommandBufferError` - Anything returned by `record`, or a native submission failure.
    fn submit(
        &self,
        record: &mut dyn FnMut(&mut dyn NativeContext) -> Result<(), CommandBufferError>,
    ) -> Result<SubmissionId, CommandBufferError>;

    /// Blocks the calling thread until a submission has finished executing.
    /// ## Arguments
    /// * `submission` - A handle returned by [`NativeDevice::submit`].
    /// ## Errors
    /// * `NativeError` - If the handle is unknown or the device was lost.
    fn wait_for_submission(&self, submission: SubmissionId) -> Result<(), NativeError>;

    /// Forgets a submission that will never be waited on.
    ///
    /// The work still runs to completion; only the device's bookkeeping for the
    /// handle is dropped. Unknown handles are ignored.
    fn release_submission(&self, _submission: SubmissionId) {}
}

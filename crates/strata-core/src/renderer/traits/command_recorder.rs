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
use crate::renderer::command::RecordingMode;
use crate::renderer::error::CommandBufferError;
use crate::renderer::traits::NativeContext;

/// A trait for an object that records a sequence of graphics commands.
///
/// Implemented by both the interpreted [`SoftwareCommandBuffer`] and the native
/// [`DeferredCommandBuffer`]. Recording the same calls on either and then executing
/// them against a context produces the same native calls.
///
/// [`SoftwareCommandBuffer`]: crate::renderer::SoftwareCommandBuffer
/// [`DeferredCommandBuffer`]: crate::renderer::DeferredCommandBuffer
pub trait CommandRecorder: Send {
    /// Opens a named debug group.
    fn push_debug_group(&mut self, label: &str) -> Result<(), CommandBufferError>;

    /// Closes the innermost debug group.
    fn pop_debug_group(&mut self) -> Result<(), CommandBufferError>;

    /// Inserts a named debug marker.
    fn insert_debug_marker(&mut self, label: &str) -> Result<(), CommandBufferError>;

    /// Begins a render pass on the given attachments, performing their load actions.
    fn begin_render_pass(
        &mut self,
        colors: &[ColorAttachment],
        depth_stencil: Option<&DepthStencilAttachment>,
    ) -> Result<(), CommandBufferError>;

    /// Ends the current render pass.
    fn end_render_pass(&mut self) -> Result<(), CommandBufferError>;

    /// Sets the viewports, in slot order.
    fn set_viewports(&mut self, viewports: &[Viewport]) -> Result<(), CommandBufferError>;

    /// Sets a single viewport.
    fn set_viewport(&mut self, viewport: &Viewport) -> Result<(), CommandBufferError> {
        self.set_viewports(std::slice::from_ref(viewport))
    }

    /// Sets the scissor rectangles, in slot order.
    fn set_scissor_rects(&mut self, rects: &[ScissorRect]) -> Result<(), CommandBufferError>;

    /// Sets a single scissor rectangle.
    fn set_scissor_rect(&mut self, rect: &ScissorRect) -> Result<(), CommandBufferError> {
        self.set_scissor_rects(std::slice::from_ref(rect))
    }

    /// Sets the constant blend color.
    fn set_blend_color(&mut self, color: LinearRgba) -> Result<(), CommandBufferError>;

    /// Binds a device-owned buffer to `slot`.
    fn bind_buffer(&mut self, slot: u32, buffer: BufferId) -> Result<(), CommandBufferError>;

    /// Binds a copy of `data` to `slot`.
    fn bind_buffer_data(&mut self, slot: u32, data: &[u8]) -> Result<(), CommandBufferError>;

    /// Executes everything recorded so far against `context`.
    fn execute(&mut self, context: &mut dyn NativeContext) -> Result<(), CommandBufferError>;

    /// Discards everything recorded so far, keeping allocations for reuse.
    fn reset(&mut self);

    /// Which recording strategy this recorder uses.
    fn mode(&self) -> RecordingMode;
}

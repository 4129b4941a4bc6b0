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

//! The native passthrough command buffer.

use super::dispatch::apply_begin_render_pass;
use super::software::check_limit;
use super::RecordingMode;
use crate::math::LinearRgba;
use crate::renderer::api::*;
use crate::renderer::error::{CommandBufferError, NativeError};
use crate::renderer::traits::{
    CommandRecorder, DebugAnnotation, NativeContext, NativeDeferredContext, NativeDevice,
};
use std::fmt;

/// A command buffer that forwards every recording call straight to a native
/// deferred context.
///
/// There is no command stream. Executing finalizes the deferred context into a
/// native command list and asks the target context to run it.
pub struct DeferredCommandBuffer {
    context: Box<dyn NativeDeferredContext>,
}

impl DeferredCommandBuffer {
    /// Creates a buffer recording into a new deferred context from `device`.
    pub fn new(device: &dyn NativeDevice) -> Result<Self, NativeError> {
        let context = device.create_deferred_context()?;
        log::debug!("Created native deferred context for {device:?}.");
        Ok(Self { context })
    }

    /// Wraps an existing deferred context.
    pub fn from_context(context: Box<dyn NativeDeferredContext>) -> Self {
        Self { context }
    }
}

impl fmt::Debug for DeferredCommandBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredCommandBuffer").finish_non_exhaustive()
    }
}

impl CommandRecorder for DeferredCommandBuffer {
    fn push_debug_group(&mut self, label: &str) -> Result<(), CommandBufferError> {
        self.context.begin_event(label);
        Ok(())
    }

    fn pop_debug_group(&mut self) -> Result<(), CommandBufferError> {
        self.context.end_event();
        Ok(())
    }

    fn insert_debug_marker(&mut self, label: &str) -> Result<(), CommandBufferError> {
        self.context.set_marker(label);
        Ok(())
    }

    fn begin_render_pass(
        &mut self,
        colors: &[ColorAttachment],
        depth_stencil: Option<&DepthStencilAttachment>,
    ) -> Result<(), CommandBufferError> {
        check_limit("color attachments", colors.len(), MAX_COLOR_ATTACHMENTS)?;
        apply_begin_render_pass(self.context.as_mut(), colors, depth_stencil);
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<(), CommandBufferError> {
        self.context.set_render_targets(&[], None);
        Ok(())
    }

    fn set_viewports(&mut self, viewports: &[Viewport]) -> Result<(), CommandBufferError> {
        check_limit("viewports", viewports.len(), MAX_VIEWPORTS)?;
        self.context.set_viewports(viewports);
        Ok(())
    }

    fn set_scissor_rects(&mut self, rects: &[ScissorRect]) -> Result<(), CommandBufferError> {
        check_limit("scissor rects", rects.len(), MAX_VIEWPORTS)?;
        self.context.set_scissor_rects(rects);
        Ok(())
    }

    fn set_blend_color(&mut self, color: LinearRgba) -> Result<(), CommandBufferError> {
        self.context.set_blend_color(color);
        Ok(())
    }

    fn bind_buffer(&mut self, slot: u32, buffer: BufferId) -> Result<(), CommandBufferError> {
        self.context.bind_buffer(slot, buffer);
        Ok(())
    }

    fn bind_buffer_data(&mut self, slot: u32, data: &[u8]) -> Result<(), CommandBufferError> {
        self.context.bind_buffer_data(slot, data);
        Ok(())
    }

    fn execute(&mut self, context: &mut dyn NativeContext) -> Result<(), CommandBufferError> {
        let list = self.context.finish_command_list()?;
        log::debug!("Executing native command list {list:?}.");
        context.execute_command_list(list)?;
        Ok(())
    }

    fn reset(&mut self) {
        log::debug!("Resetting native deferred context.");
        self.context.reset();
    }

    fn mode(&self) -> RecordingMode {
        RecordingMode::NativeDeferred
    }
}

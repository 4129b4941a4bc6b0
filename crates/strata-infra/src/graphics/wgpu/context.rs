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


use std::collections::HashMap;
use std::fmt;
use std::mem;

use strata_core::math::LinearRgba;
use strata_core::renderer::traits::{DebugAnnotation, NativeContext, NativeDeferredContext};
use strata_core::renderer::{
    BufferId, CommandListId, NativeError, RenderTarget, ScissorRect, Viewport,
};

use super::conversions::IntoWgpu;
use super::device::WgpuDevice;

/// Where an open debug group was pushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DebugGroupScope {
    Encoder,
    Pass,
    /// Already popped because its pass or encoder was closed first.
    Closed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct DepthStencilClear {
    depth: Option<f32>,
    stencil: Option<u8>,
}

/// An immediate-style recording context on top of a `wgpu::CommandEncoder`.
///
/// WGPU has no standalone clear or "bind render targets" calls, so the context
/// translates them:
/// - clears and discards are remembered per [`RenderTarget`] and folded into the load
///   operation of the next render pass that binds the target. Clears that are never
///   followed by a bind get a pass of their own when the encoder is flushed;
/// - `set_render_targets` ends the current pass and begins a new one, then re-applies
///   the current viewport, scissor and blend constant;
/// - debug groups go to the open pass, or to the encoder outside of a pass.
///
/// Backend failures are not reported by the infallible context calls. The first one is
/// kept and returned when the work is finished, either by
/// [`NativeDeferredContext::finish_command_list`] or by the device's submit.
pub struct WgpuContext {
    device: WgpuDevice,
    label: String,
    // Declared before `encoder` so it is dropped first.
    pass: Option<wgpu::RenderPass<'static>>,
    encoder: Option<wgpu::CommandEncoder>,
    finished: Vec<wgpu::CommandBuffer>,

    color_clears: HashMap<RenderTarget, wgpu::Color>,
    depth_clears: HashMap<RenderTarget, DepthStencilClear>,

    viewport: Option<Viewport>,
    scissor: Option<ScissorRect>,
    blend_color: Option<LinearRgba>,

    debug_groups: Vec<DebugGroupScope>,
    /// Encoder debug groups ended while a pass was open.
    pending_encoder_pops: usize,

    error: Option<NativeError>,
}

impl WgpuContext {
    pub(crate) fn new(device: WgpuDevice, label: impl Into<String>) -> Self {
        Self {
            device,
            label: label.into(),
            pass: None,
            encoder: None,
            finished: Vec::new(),
            color_clears: HashMap::new(),
            depth_clears: HashMap::new(),
            viewport: None,
            scissor: None,
            blend_color: None,
            debug_groups: Vec::new(),
            pending_encoder_pops: 0,
            error: None,
        }
    }

    /// The debug label used for this context's encoders and passes.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether a render pass is currently open.
    pub fn is_pass_open(&self) -> bool {
        self.pass.is_some()
    }

    /// Flushes all recorded work and hands out the finished command buffers.
    pub(crate) fn into_command_buffers(mut self) -> Result<Vec<wgpu::CommandBuffer>, NativeError> {
        self.take_command_buffers()
    }

    fn take_command_buffers(&mut self) -> Result<Vec<wgpu::CommandBuffer>, NativeError> {
        self.flush_encoder();
        let buffers = mem::take(&mut self.finished);
        match self.error.take() {
            Some(error) => Err(error),
            None => Ok(buffers),
        }
    }

    fn fail(&mut self, error: NativeError) {
        log::error!("WgpuContext '{}': {error}", self.label);
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn encoder(&mut self) -> &mut wgpu::CommandEncoder {
        let device = &self.device;
        let label = &self.label;
        self.encoder
            .get_or_insert_with(|| device.create_command_encoder(label))
    }

    /// Resets the state that does not survive a command list boundary.
    fn clear_state(&mut self) {
        self.viewport = None;
        self.scissor = None;
        self.blend_color = None;
    }

    /// Begins a pass on the given targets, consuming their pending clears.
    fn open_pass(
        &mut self,
        colors: &[RenderTarget],
        depth_stencil: Option<&RenderTarget>,
    ) -> Result<wgpu::RenderPass<'static>, NativeError> {
        let color_views = colors
            .iter()
            .map(|target| self.device.target_view(target).map(|(view, _)| view))
            .collect::<Result<Vec<_>, _>>()?;
        let depth_view = depth_stencil
            .map(|target| {
                self.device
                    .target_view(target)
                    .map(|(view, format)| (*target, view, format))
            })
            .transpose()?;

        let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment>> = colors
            .iter()
            .zip(&color_views)
            .map(|(target, view)| {
                Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: self.color_clears.remove(target).into_wgpu(),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })
            })
            .collect();

        let depth_stencil_attachment = depth_view.as_ref().map(|(target, view, format)| {
            let clear = self.depth_clears.remove(target).unwrap_or_default();
            wgpu::RenderPassDepthStencilAttachment {
                view,
                depth_ops: format.has_depth_aspect().then(|| wgpu::Operations {
                    load: clear.depth.into_wgpu(),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: format.has_stencil_aspect().then(|| wgpu::Operations {
                    load: clear.stencil.map(u32::from).into_wgpu(),
                    store: wgpu::StoreOp::Store,
                }),
            }
        });

        let descriptor = wgpu::RenderPassDescriptor {
            label: Some(self.label.as_str()),
            color_attachments: &color_attachments,
            depth_stencil_attachment,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        };

        let device = &self.device;
        let label = &self.label;
        let encoder = self
            .encoder
            .get_or_insert_with(|| device.create_command_encoder(label));
        Ok(encoder.begin_render_pass(&descriptor).forget_lifetime())
    }

    fn end_pass(&mut self) {
        let Some(mut pass) = self.pass.take() else {
            return;
        };
        for scope in self.debug_groups.iter_mut().rev() {
            if *scope == DebugGroupScope::Pass {
                log::warn!(
                    "WgpuContext '{}': Debug group left open at the end of a render pass.",
                    self.label
                );
                pass.pop_debug_group();
                *scope = DebugGroupScope::Closed;
            }
        }
        drop(pass);

        let pops = mem::take(&mut self.pending_encoder_pops);
        if pops > 0 {
            let encoder = self.encoder();
            for _ in 0..pops {
                encoder.pop_debug_group();
            }
        }
    }

    /// Records the clears no render pass has consumed, each in a pass of its own.
    fn flush_pending_clears(&mut self) {
        let colors: Vec<RenderTarget> = self.color_clears.keys().copied().collect();
        for target in colors {
            if let Err(error) = self.open_pass(std::slice::from_ref(&target), None) {
                self.fail(error);
            }
        }
        let depths: Vec<RenderTarget> = self.depth_clears.keys().copied().collect();
        for target in depths {
            if let Err(error) = self.open_pass(&[], Some(&target)) {
                self.fail(error);
            }
        }
        self.color_clears.clear();
        self.depth_clears.clear();
    }

    /// Ends the open pass, records pending clears and finishes the current encoder.
    fn flush_encoder(&mut self) {
        self.end_pass();
        self.flush_pending_clears();

        let Some(mut encoder) = self.encoder.take() else {
            return;
        };
        for scope in self.debug_groups.iter_mut().rev() {
            if *scope == DebugGroupScope::Encoder {
                encoder.pop_debug_group();
                *scope = DebugGroupScope::Closed;
            }
        }
        self.finished.push(encoder.finish());
    }

    fn apply_state(&mut self) {
        let Some(pass) = self.pass.as_mut() else {
            return;
        };
        if let Some(v) = self.viewport {
            pass.set_viewport(v.x, v.y, v.width, v.height, v.min_depth, v.max_depth);
        }
        if let Some(s) = self.scissor {
            pass.set_scissor_rect(s.x, s.y, s.width, s.height);
        }
        if let Some(color) = self.blend_color {
            pass.set_blend_constant(color.into_wgpu());
        }
    }
}

impl fmt::Debug for WgpuContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WgpuContext")
            .field("label", &self.label)
            .field("pass_open", &self.pass.is_some())
            .field("finished", &self.finished.len())
            .field("pending_clears", &(self.color_clears.len() + self.depth_clears.len()))
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl DebugAnnotation for WgpuContext {
    fn begin_event(&mut self, label: &str) {
        if let Some(pass) = self.pass.as_mut() {
            pass.push_debug_group(label);
            self.debug_groups.push(DebugGroupScope::Pass);
        } else {
            self.encoder().push_debug_group(label);
            self.debug_groups.push(DebugGroupScope::Encoder);
        }
    }

    fn end_event(&mut self) {
        match self.debug_groups.pop() {
            Some(DebugGroupScope::Pass) => {
                if let Some(pass) = self.pass.as_mut() {
                    pass.pop_debug_group();
                }
            }
            Some(DebugGroupScope::Encoder) => {
                if self.pass.is_some() {
                    self.pending_encoder_pops += 1;
                } else {
                    self.encoder().pop_debug_group();
                }
            }
            Some(DebugGroupScope::Closed) => {}
            None => log::warn!(
                "WgpuContext '{}': end_event without a matching begin_event, ignored.",
                self.label
            ),
        }
    }

    fn set_marker(&mut self, label: &str) {
        if let Some(pass) = self.pass.as_mut() {
            pass.insert_debug_marker(label);
        } else {
            self.encoder().insert_debug_marker(label);
        }
    }
}

impl NativeContext for WgpuContext {
    fn clear_render_target(&mut self, target: &RenderTarget, color: LinearRgba) {
        self.color_clears.insert(*target, color.into_wgpu());
    }

    fn discard_render_target(&mut self, target: &RenderTarget) {
        // WGPU only offers an unsafe "don't care" load, a clear is the closest safe match.
        match self.device.texture_format(target.texture) {
            Ok(format) if format.is_depth_stencil_format() => {
                self.depth_clears.insert(
                    *target,
                    DepthStencilClear {
                        depth: format.has_depth_aspect().then_some(1.0),
                        stencil: format.has_stencil_aspect().then_some(0),
                    },
                );
            }
            Ok(_) => {
                self.color_clears
                    .insert(*target, LinearRgba::TRANSPARENT.into_wgpu());
            }
            Err(error) => self.fail(error),
        }
    }

    fn clear_depth_stencil(&mut self, target: &RenderTarget, depth: Option<f32>, stencil: Option<u8>) {
        if depth.is_none() && stencil.is_none() {
            return;
        }
        let clear = self.depth_clears.entry(*target).or_default();
        if depth.is_some() {
            clear.depth = depth;
        }
        if stencil.is_some() {
            clear.stencil = stencil;
        }
    }

    fn set_render_targets(&mut self, colors: &[RenderTarget], depth_stencil: Option<&RenderTarget>) {
        self.end_pass();
        if colors.is_empty() && depth_stencil.is_none() {
            return;
        }
        match self.open_pass(colors, depth_stencil) {
            Ok(pass) => {
                self.pass = Some(pass);
                self.apply_state();
            }
            Err(error) => self.fail(error),
        }
    }

    fn set_viewports(&mut self, viewports: &[Viewport]) {
        if viewports.len() > 1 {
            log::warn!(
                "WgpuContext '{}': Only the first of {} viewports is applied.",
                self.label,
                viewports.len()
            );
        }
        self.viewport = viewports.first().copied();
        if let (Some(pass), Some(v)) = (self.pass.as_mut(), self.viewport) {
            pass.set_viewport(v.x, v.y, v.width, v.height, v.min_depth, v.max_depth);
        }
    }

    fn set_scissor_rects(&mut self, rects: &[ScissorRect]) {
        if rects.len() > 1 {
            log::warn!(
                "WgpuContext '{}': Only the first of {} scissor rects is applied.",
                self.label,
                rects.len()
            );
        }
        self.scissor = rects.first().copied();
        if let (Some(pass), Some(s)) = (self.pass.as_mut(), self.scissor) {
            pass.set_scissor_rect(s.x, s.y, s.width, s.height);
        }
    }

    fn set_blend_color(&mut self, color: LinearRgba) {
        self.blend_color = Some(color);
        if let Some(pass) = self.pass.as_mut() {
            pass.set_blend_constant(color.into_wgpu());
        }
    }

    fn bind_buffer(&mut self, slot: u32, buffer: BufferId) {
        log::warn!(
            "WgpuContext '{}': Buffer binding needs a pipeline layout, {buffer:?} at slot {slot} ignored.",
            self.label
        );
    }

    fn bind_buffer_data(&mut self, slot: u32, data: &[u8]) {
        log::warn!(
            "WgpuContext '{}': Buffer binding needs a pipeline layout, {} inline bytes at slot {slot} ignored.",
            self.label,
            data.len()
        );
    }

    fn execute_command_list(&mut self, list: CommandListId) -> Result<(), NativeError> {
        let buffers = self.device.take_command_list(list)?;
        self.flush_encoder();
        log::trace!(
            "WgpuContext '{}': Executing {list:?} ({} command buffer(s)).",
            self.label,
            buffers.len()
        );
        self.finished.extend(buffers);
        self.clear_state();
        Ok(())
    }
}

impl NativeDeferredContext for WgpuContext {
    fn finish_command_list(&mut self) -> Result<CommandListId, NativeError> {
        let buffers = self.take_command_buffers();
        self.clear_state();
        self.debug_groups.clear();
        let id = self.device.register_command_list(buffers?)?;
        log::debug!("WgpuContext '{}': Finished {id:?}.", self.label);
        Ok(id)
    }

    fn reset(&mut self) {
        self.pass = None;
        self.encoder = None;
        self.finished.clear();
        self.color_clears.clear();
        self.depth_clears.clear();
        self.clear_state();
        self.debug_groups.clear();
        self.pending_encoder_pops = 0;
        self.error = None;
    }
}

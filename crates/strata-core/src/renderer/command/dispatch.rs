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

//! The tag-indexed table of replay functions.

use super::encoder::CommandDecoder;
use super::records::decode_render_pass;
use crate::math::LinearRgba;
use crate::renderer::api::*;
use crate::renderer::error::CommandBufferError;
use crate::renderer::traits::{DebugAnnotation, NativeContext};
use std::fmt;

/// Replays one command: reads its payload from the decoder and issues the native calls.
pub type ReplayFn =
    fn(&mut CommandDecoder<'_>, &mut dyn NativeContext) -> Result<(), CommandBufferError>;

/// Maps every [`CommandId`] to its replay function.
///
/// The table is filled from an exhaustive `match`, so adding a tag without a replay
/// function does not compile. It is immutable once built and freely copyable.
#[derive(Clone, Copy)]
pub struct DispatchTable {
    entries: [ReplayFn; CommandId::COUNT],
}

impl DispatchTable {
    /// Builds the table.
    pub fn new() -> Self {
        Self {
            entries: CommandId::ALL.map(replay_fn_for),
        }
    }

    /// The replay function for `id`.
    #[inline]
    pub fn get(&self, id: CommandId) -> ReplayFn {
        self.entries[id.index()]
    }

    /// Replays the command whose header has just been read from `decoder`.
    #[inline]
    pub fn dispatch(
        &self,
        id: CommandId,
        decoder: &mut CommandDecoder<'_>,
        context: &mut dyn NativeContext,
    ) -> Result<(), CommandBufferError> {
        (self.get(id))(decoder, context)
    }
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchTable")
            .field("entries", &self.entries.len())
            .finish()
    }
}

fn replay_fn_for(id: CommandId) -> ReplayFn {
    match id {
        CommandId::PushDebugGroup => replay_push_debug_group,
        CommandId::PopDebugGroup => replay_pop_debug_group,
        CommandId::InsertDebugMarker => replay_insert_debug_marker,
        CommandId::BeginRenderPass => replay_begin_render_pass,
        CommandId::EndRenderPass => replay_end_render_pass,
        CommandId::SetViewports => replay_set_viewports,
        CommandId::SetScissorRects => replay_set_scissor_rects,
        CommandId::SetBlendColor => replay_set_blend_color,
        CommandId::BindBuffer => replay_bind_buffer,
        CommandId::BindBufferData => replay_bind_buffer_data,
    }
}

/// Issues the native calls for beginning a render pass.
///
/// Shared by replay and by native deferred recording so both produce the same calls:
/// each color attachment is cleared or discarded according to its load action, the
/// depth-stencil attachment is cleared if either aspect clears (or discarded if both
/// discard), then all targets are bound.
pub(crate) fn apply_begin_render_pass<C: NativeContext + ?Sized>(
    context: &mut C,
    colors: &[ColorAttachment],
    depth_stencil: Option<&DepthStencilAttachment>,
) {
    let mut targets = [RenderTarget::default(); MAX_COLOR_ATTACHMENTS];
    for (slot, attachment) in targets.iter_mut().zip(colors) {
        match attachment.load_action {
            LoadAction::Clear => {
                context.clear_render_target(&attachment.target, attachment.clear_color)
            }
            LoadAction::Discard => context.discard_render_target(&attachment.target),
            LoadAction::Load => {}
        }
        *slot = attachment.target;
    }

    if let Some(depth_stencil) = depth_stencil {
        let depth = depth_stencil.depth_clear_value();
        let stencil = depth_stencil.stencil_clear_value();
        if depth.is_some() || stencil.is_some() {
            context.clear_depth_stencil(&depth_stencil.target, depth, stencil);
        } else if depth_stencil.depth_load_action == LoadAction::Discard
            && depth_stencil.stencil_load_action == LoadAction::Discard
        {
            context.discard_render_target(&depth_stencil.target);
        }
    }

    let count = colors.len().min(MAX_COLOR_ATTACHMENTS);
    context.set_render_targets(
        &targets[..count],
        depth_stencil.map(|attachment| &attachment.target),
    );
}

fn replay_push_debug_group(
    decoder: &mut CommandDecoder<'_>,
    context: &mut dyn NativeContext,
) -> Result<(), CommandBufferError> {
    let label = decoder.read_str()?;
    context.begin_event(label);
    Ok(())
}

fn replay_pop_debug_group(
    _decoder: &mut CommandDecoder<'_>,
    context: &mut dyn NativeContext,
) -> Result<(), CommandBufferError> {
    context.end_event();
    Ok(())
}

fn replay_insert_debug_marker(
    decoder: &mut CommandDecoder<'_>,
    context: &mut dyn NativeContext,
) -> Result<(), CommandBufferError> {
    let label = decoder.read_str()?;
    context.set_marker(label);
    Ok(())
}

fn replay_begin_render_pass(
    decoder: &mut CommandDecoder<'_>,
    context: &mut dyn NativeContext,
) -> Result<(), CommandBufferError> {
    let pass = decode_render_pass(decoder)?;
    apply_begin_render_pass(context, pass.colors(), pass.depth_stencil());
    Ok(())
}

fn replay_end_render_pass(
    _decoder: &mut CommandDecoder<'_>,
    context: &mut dyn NativeContext,
) -> Result<(), CommandBufferError> {
    context.set_render_targets(&[], None);
    Ok(())
}

fn replay_set_viewports(
    decoder: &mut CommandDecoder<'_>,
    context: &mut dyn NativeContext,
) -> Result<(), CommandBufferError> {
    let viewports = decoder.read_counted_slice::<Viewport>("viewport count", MAX_VIEWPORTS)?;
    context.set_viewports(&viewports);
    Ok(())
}

fn replay_set_scissor_rects(
    decoder: &mut CommandDecoder<'_>,
    context: &mut dyn NativeContext,
) -> Result<(), CommandBufferError> {
    let rects = decoder.read_counted_slice::<ScissorRect>("scissor rect count", MAX_VIEWPORTS)?;
    context.set_scissor_rects(&rects);
    Ok(())
}

fn replay_set_blend_color(
    decoder: &mut CommandDecoder<'_>,
    context: &mut dyn NativeContext,
) -> Result<(), CommandBufferError> {
    let color: LinearRgba = decoder.read()?;
    context.set_blend_color(color);
    Ok(())
}

fn replay_bind_buffer(
    decoder: &mut CommandDecoder<'_>,
    context: &mut dyn NativeContext,
) -> Result<(), CommandBufferError> {
    let slot: u32 = decoder.read()?;
    let buffer: BufferId = decoder.read()?;
    context.bind_buffer(slot, buffer);
    Ok(())
}

fn replay_bind_buffer_data(
    decoder: &mut CommandDecoder<'_>,
    context: &mut dyn NativeContext,
) -> Result<(), CommandBufferError> {
    let slot: u32 = decoder.read()?;
    let data = decoder.read_bytes()?;
    context.bind_buffer_data(slot, data);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_covers_every_tag() {
        let table = DispatchTable::new();
        for id in CommandId::ALL {
            // Fetching must not panic for any tag.
            let _ = table.get(id);
        }
        assert_eq!(format!("{table:?}"), "DispatchTable { entries: 10 }");
    }

    #[test]
    fn test_table_is_shareable() {
        fn assert_send_sync<T: Send + Sync + Copy>() {}
        assert_send_sync::<DispatchTable>();
    }
}

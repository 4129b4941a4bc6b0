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

//! Fixed-layout stream records for render pass attachments.

use super::encoder::{CommandDecoder, CommandEncoder};
use crate::math::LinearRgba;
use crate::renderer::api::*;
use crate::renderer::error::CommandStreamError;
use std::mem::size_of;

/// The stream layout of a [`ColorAttachment`].
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct ColorAttachmentRecord {
    /// The attachment's render target.
    pub target: RenderTarget,
    /// [`LoadAction`] as written by [`LoadAction::as_u32`].
    pub load_action: u32,
    /// Always zero.
    pub reserved: u32,
    /// The clear color.
    pub clear_color: LinearRgba,
}

impl From<&ColorAttachment> for ColorAttachmentRecord {
    fn from(attachment: &ColorAttachment) -> Self {
        Self {
            target: attachment.target,
            load_action: attachment.load_action.as_u32(),
            reserved: 0,
            clear_color: attachment.clear_color,
        }
    }
}

impl ColorAttachmentRecord {
    /// Converts back into a [`ColorAttachment`], validating the load action.
    ///
    /// `position` is only used to locate the error.
    pub fn to_attachment(&self, position: usize) -> Result<ColorAttachment, CommandStreamError> {
        Ok(ColorAttachment {
            target: self.target,
            load_action: decode_load_action(self.load_action, "color load_action", position)?,
            clear_color: self.clear_color,
        })
    }
}

/// The stream layout of a [`DepthStencilAttachment`].
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct DepthStencilAttachmentRecord {
    /// The attachment's render target.
    pub target: RenderTarget,
    /// Depth [`LoadAction`].
    pub depth_load_action: u32,
    /// Stencil [`LoadAction`].
    pub stencil_load_action: u32,
    /// The depth clear value.
    pub clear_depth: f32,
    /// The stencil clear value, widened to keep the record free of padding.
    pub clear_stencil: u32,
}

impl From<&DepthStencilAttachment> for DepthStencilAttachmentRecord {
    fn from(attachment: &DepthStencilAttachment) -> Self {
        Self {
            target: attachment.target,
            depth_load_action: attachment.depth_load_action.as_u32(),
            stencil_load_action: attachment.stencil_load_action.as_u32(),
            clear_depth: attachment.clear_depth,
            clear_stencil: u32::from(attachment.clear_stencil),
        }
    }
}

impl DepthStencilAttachmentRecord {
    /// Converts back into a [`DepthStencilAttachment`], validating every field.
    pub fn to_attachment(
        &self,
        position: usize,
    ) -> Result<DepthStencilAttachment, CommandStreamError> {
        let clear_stencil =
            u8::try_from(self.clear_stencil).map_err(|_| CommandStreamError::InvalidValue {
                position,
                field: "clear_stencil",
                value: u64::from(self.clear_stencil),
            })?;
        Ok(DepthStencilAttachment {
            target: self.target,
            depth_load_action: decode_load_action(
                self.depth_load_action,
                "depth_load_action",
                position,
            )?,
            stencil_load_action: decode_load_action(
                self.stencil_load_action,
                "stencil_load_action",
                position,
            )?,
            clear_depth: self.clear_depth,
            clear_stencil,
        })
    }
}

fn decode_load_action(
    value: u32,
    field: &'static str,
    position: usize,
) -> Result<LoadAction, CommandStreamError> {
    LoadAction::from_u32(value).ok_or(CommandStreamError::InvalidValue {
        position,
        field,
        value: u64::from(value),
    })
}

/// A decoded `BeginRenderPass` payload.
///
/// Color attachments are kept in a fixed array so replay never allocates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderPassRecord {
    colors: [ColorAttachment; MAX_COLOR_ATTACHMENTS],
    color_count: usize,
    depth_stencil: Option<DepthStencilAttachment>,
}

impl RenderPassRecord {
    /// The color attachments, in binding order.
    pub fn colors(&self) -> &[ColorAttachment] {
        &self.colors[..self.color_count]
    }

    /// The depth-stencil attachment, if one was recorded.
    pub fn depth_stencil(&self) -> Option<&DepthStencilAttachment> {
        self.depth_stencil.as_ref()
    }
}

/// Writes a `BeginRenderPass` payload.
pub fn encode_render_pass(
    encoder: &mut CommandEncoder<'_>,
    colors: &[ColorAttachment],
    depth_stencil: Option<&DepthStencilAttachment>,
) -> Result<(), CommandStreamError> {
    encoder.write_len(colors.len())?;
    for attachment in colors {
        encoder.write(&ColorAttachmentRecord::from(attachment));
    }
    encoder.write_bool(depth_stencil.is_some());
    if let Some(depth_stencil) = depth_stencil {
        encoder.write(&DepthStencilAttachmentRecord::from(depth_stencil));
    }
    Ok(())
}

/// Reads a `BeginRenderPass` payload written by [`encode_render_pass`].
pub fn decode_render_pass(
    decoder: &mut CommandDecoder<'_>,
) -> Result<RenderPassRecord, CommandStreamError> {
    let records =
        decoder.read_counted_slice::<ColorAttachmentRecord>("color attachment count", MAX_COLOR_ATTACHMENTS)?;
    let record_size = size_of::<ColorAttachmentRecord>();
    let records_start = decoder.position() - records.len() * record_size;

    let mut colors = [ColorAttachment::load(RenderTarget::default()); MAX_COLOR_ATTACHMENTS];
    for (index, (slot, record)) in colors.iter_mut().zip(records.iter()).enumerate() {
        *slot = record.to_attachment(records_start + index * record_size)?;
    }

    let depth_stencil = if decoder.read_bool("depth-stencil flag")? {
        let position = decoder.position();
        let record: DepthStencilAttachmentRecord = decoder.read()?;
        Some(record.to_attachment(position)?)
    } else {
        None
    };

    Ok(RenderPassRecord {
        colors,
        color_count: records.len(),
        depth_stencil,
    })
}

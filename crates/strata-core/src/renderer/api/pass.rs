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

//! Defines the render pass description and fixed-function state recorded into command buffers.

use super::resource::RenderTarget;
use crate::math::LinearRgba;

/// The maximum number of color attachments a single render pass may bind.
pub const MAX_COLOR_ATTACHMENTS: usize = 8;

/// The maximum number of viewports or scissor rectangles set by a single command.
pub const MAX_VIEWPORTS: usize = 16;

/// Describes what happens to an attachment's existing contents when a render pass begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum LoadAction {
    /// The attachment is cleared to a value supplied alongside the attachment.
    Clear = 0,
    /// The existing contents of the attachment are preserved.
    Load = 1,
    /// The existing contents are undefined; the backend may throw them away.
    Discard = 2,
}

impl LoadAction {
    /// Returns the value written to a command stream for this action.
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self as u32
    }

    /// Decodes a stream value, returning `None` for anything out of range.
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Clear),
            1 => Some(Self::Load),
            2 => Some(Self::Discard),
            _ => None,
        }
    }
}

/// A single color attachment of a render pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorAttachment {
    /// The sub-resource that will be rendered to.
    pub target: RenderTarget,
    /// What to do with the existing contents when the pass begins.
    pub load_action: LoadAction,
    /// The clear color, only used when `load_action` is [`LoadAction::Clear`].
    pub clear_color: LinearRgba,
}

impl ColorAttachment {
    /// An attachment that is cleared to `clear_color` when the pass begins.
    pub fn clear(target: RenderTarget, clear_color: LinearRgba) -> Self {
        Self {
            target,
            load_action: LoadAction::Clear,
            clear_color,
        }
    }

    /// An attachment whose existing contents are preserved.
    pub fn load(target: RenderTarget) -> Self {
        Self {
            target,
            load_action: LoadAction::Load,
            clear_color: LinearRgba::default(),
        }
    }

    /// An attachment whose existing contents may be discarded.
    pub fn discard(target: RenderTarget) -> Self {
        Self {
            target,
            load_action: LoadAction::Discard,
            clear_color: LinearRgba::default(),
        }
    }
}

/// The depth-stencil attachment of a render pass.
///
/// The depth and stencil aspects carry independent load actions. The defaults
/// clear depth to `1.0` and discard stencil.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthStencilAttachment {
    /// The depth-stencil sub-resource.
    pub target: RenderTarget,
    /// Load action applied to the depth aspect.
    pub depth_load_action: LoadAction,
    /// Load action applied to the stencil aspect.
    pub stencil_load_action: LoadAction,
    /// The depth clear value.
    pub clear_depth: f32,
    /// The stencil clear value.
    pub clear_stencil: u8,
}

impl DepthStencilAttachment {
    /// Creates an attachment for `target` with the default load actions and clear values.
    pub fn new(target: RenderTarget) -> Self {
        Self {
            target,
            depth_load_action: LoadAction::Clear,
            stencil_load_action: LoadAction::Discard,
            clear_depth: 1.0,
            clear_stencil: 0,
        }
    }

    /// The depth clear value if the depth aspect is cleared.
    #[inline]
    pub fn depth_clear_value(&self) -> Option<f32> {
        (self.depth_load_action == LoadAction::Clear).then_some(self.clear_depth)
    }

    /// The stencil clear value if the stencil aspect is cleared.
    #[inline]
    pub fn stencil_clear_value(&self) -> Option<u8> {
        (self.stencil_load_action == LoadAction::Clear).then_some(self.clear_stencil)
    }
}

/// A rectangular region of the render target that primitives are mapped to.
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Viewport {
    /// Left edge, in pixels.
    pub x: f32,
    /// Top edge, in pixels.
    pub y: f32,
    /// Width, in pixels.
    pub width: f32,
    /// Height, in pixels.
    pub height: f32,
    /// Minimum depth of the viewport, usually `0.0`.
    pub min_depth: f32,
    /// Maximum depth of the viewport, usually `1.0`.
    pub max_depth: f32,
}

impl Viewport {
    /// A viewport covering `width` x `height` pixels with the full `[0, 1]` depth range.
    pub const fn from_size(width: f32, height: f32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width,
            height,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// A rectangle outside of which fragments are discarded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct ScissorRect {
    /// Left edge, in pixels.
    pub x: u32,
    /// Top edge, in pixels.
    pub y: u32,
    /// Width, in pixels.
    pub width: u32,
    /// Height, in pixels.
    pub height: u32,
}

impl ScissorRect {
    /// Creates a new scissor rectangle.
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

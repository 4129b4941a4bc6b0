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

//! Opaque resource handles.
//!
//! Handles are plain values owned by the native device. Command buffers copy them
//! into their recordings and never check that the resource still exists.

/// An opaque handle to a texture owned by a native device.
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, Hash, bytemuck::Pod, bytemuck::Zeroable,
)]
#[repr(transparent)]
pub struct TextureId(pub u64);

/// An opaque handle to a buffer owned by a native device.
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, Hash, bytemuck::Pod, bytemuck::Zeroable,
)]
#[repr(transparent)]
pub struct BufferId(pub u64);

/// A single renderable sub-resource: one mip level of one array slice of a texture.
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, Hash, bytemuck::Pod, bytemuck::Zeroable,
)]
#[repr(C)]
pub struct RenderTarget {
    /// The texture to render into.
    pub texture: TextureId,
    /// The mip level of the texture.
    pub mip_level: u32,
    /// The array layer (or cube face) of the texture.
    pub slice: u32,
}

impl RenderTarget {
    /// Targets mip 0, slice 0 of `texture`.
    #[inline]
    pub const fn new(texture: TextureId) -> Self {
        Self {
            texture,
            mip_level: 0,
            slice: 0,
        }
    }

    /// Returns a copy of this target pointing at another mip level.
    #[inline]
    pub const fn with_mip_level(mut self, mip_level: u32) -> Self {
        self.mip_level = mip_level;
        self
    }

    /// Returns a copy of this target pointing at another array slice.
    #[inline]
    pub const fn with_slice(mut self, slice: u32) -> Self {
        self.slice = slice;
        self
    }
}

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


//! The WGPU backend.
//!
//! A [`WgpuDevice`] owns the `wgpu::Device` and `wgpu::Queue`, a registry of the
//! render textures it created and the command lists finished by deferred contexts.
//! Every context it hands out is a [`WgpuContext`], which turns the immediate-mode
//! calls of `NativeContext` into `wgpu` render passes.

mod context;
mod conversions;
mod device;
mod settings;

pub use self::context::WgpuContext;
pub use self::conversions::IntoWgpu;
pub use self::device::{RenderTextureDescriptor, WgpuDevice};
pub use self::settings::{PowerPreference, WgpuDeviceSettings};

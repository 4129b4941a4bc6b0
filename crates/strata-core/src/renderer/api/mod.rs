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

//! Data structures describing recorded commands and the resources they reference.

pub mod command;
pub mod pass;
pub mod resource;
pub mod settings;

pub use self::command::{CommandId, CommandListId, SubmissionId};
pub use self::pass::{
    ColorAttachment, DepthStencilAttachment, LoadAction, ScissorRect, Viewport,
    MAX_COLOR_ATTACHMENTS, MAX_VIEWPORTS,
};
pub use self::resource::{BufferId, RenderTarget, TextureId};
pub use self::settings::{CommandBufferSettings, DEFAULT_STREAM_BLOCK_SIZE};

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

//! Command recording and replay.
//!
//! - [`CommandStream`] and [`CommandEncoder`]/[`CommandDecoder`]: the framed byte log.
//! - [`DispatchTable`]: maps each command tag to its replay function.
//! - [`SoftwareCommandBuffer`]: records into the stream, replays through the table.
//! - [`DeferredCommandBuffer`]: forwards recording to a native deferred context.
//! - [`CommandBuffer`]: the front-end that picks one of the two and owns the lifecycle.

mod buffer;
mod deferred;
mod dispatch;
mod encoder;
mod records;
mod software;
mod stream;

pub use self::buffer::{CommandBuffer, CommandBufferState, RecordingMode};
pub use self::deferred::DeferredCommandBuffer;
pub use self::dispatch::{DispatchTable, ReplayFn};
pub use self::encoder::{CommandDecoder, CommandEncoder, CommandHeader, COMMAND_HEADER_SIZE};
pub use self::records::{
    decode_render_pass, encode_render_pass, ColorAttachmentRecord, DepthStencilAttachmentRecord,
    RenderPassRecord,
};
pub use self::software::SoftwareCommandBuffer;
pub use self::stream::CommandStream;

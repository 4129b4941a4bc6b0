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

//! Provides the public, backend-agnostic command recording contracts.
//!
//! This module defines the "common language" for recording GPU work. It contains
//! the abstract `traits` (like [`NativeDevice`] and [`NativeContext`]), the value
//! types recorded into command buffers (like [`ColorAttachment`]), the error types,
//! and the [`command`] machinery that serializes and replays those recordings.
//!
//! The 'how' of talking to an actual GPU lives in a concrete backend (the `strata-infra`
//! crate implements these traits on top of WGPU). The [`CommandBuffer`] only ever sees
//! the traits, so the same recording code runs against any backend or against a mock.

pub mod api;
pub mod command;
pub mod error;
pub mod traits;

// Re-export the most important traits and types for easier use.
pub use self::api::*;
pub use self::command::{
    CommandBuffer, CommandBufferState, CommandStream, DeferredCommandBuffer, RecordingMode,
    SoftwareCommandBuffer,
};
pub use self::error::{CommandBufferError, CommandStreamError, NativeError};
pub use self::traits::{
    CommandRecorder, DebugAnnotation, NativeContext, NativeDeferredContext, NativeDevice,
};

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

//! Defines the core architectural traits for command recording.
//!
//! This module contains the contracts that decouple command buffers from any
//! specific graphics backend.
//!
//! - [`NativeDevice`]: Creates deferred contexts and accepts submissions.
//! - [`NativeContext`]: Receives the state and clear calls produced by replay.
//! - [`NativeDeferredContext`]: A context that accumulates work into a native command list.
//! - [`CommandRecorder`]: The recording contract shared by both command buffer variants.

mod command_recorder;
mod native;

pub use self::command_recorder::CommandRecorder;
pub use self::native::{DebugAnnotation, NativeContext, NativeDeferredContext, NativeDevice};

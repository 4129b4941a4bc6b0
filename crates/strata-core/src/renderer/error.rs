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

//! Defines the hierarchy of error types for command recording and replay.

use crate::renderer::api::command::{CommandId, CommandListId, SubmissionId};
use crate::renderer::command::CommandBufferState;
use std::fmt;

/// An error raised while reading or writing a command stream.
///
/// All of these, except [`CommandStreamError::LengthOverflow`], indicate a
/// malformed stream: the bytes being replayed do not match what the encoder writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandStreamError {
    /// A read would run past the end of the recorded data.
    Overrun {
        /// Read cursor position at the time of the read.
        position: usize,
        /// Number of bytes requested.
        requested: usize,
        /// Number of bytes left between the read cursor and the end of the stream.
        remaining: usize,
    },
    /// A command header carries a tag that is not a known [`CommandId`].
    UnknownCommand {
        /// Byte offset of the tag.
        position: usize,
        /// The raw tag value.
        tag: u8,
    },
    /// A replay function consumed a different number of bytes than the command's payload length.
    PayloadMismatch {
        /// Byte offset of the command header.
        position: usize,
        /// The command being replayed.
        command: CommandId,
        /// Payload length recorded in the header.
        expected: u32,
        /// Bytes actually consumed by the replay function.
        consumed: usize,
    },
    /// A decoded field holds a value that the encoder can never produce.
    InvalidValue {
        /// Byte offset just past the field.
        position: usize,
        /// The name of the field.
        field: &'static str,
        /// The offending raw value.
        value: u64,
    },
    /// A string payload is not valid UTF-8.
    InvalidUtf8 {
        /// Byte offset of the string bytes.
        position: usize,
    },
    /// A string or slice is too long to be described by its `u32` length prefix.
    LengthOverflow {
        /// The length that did not fit.
        len: usize,
    },
}

impl fmt::Display for CommandStreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandStreamError::Overrun {
                position,
                requested,
                remaining,
            } => write!(
                f,
                "Command stream overrun at byte {position}: requested {requested} bytes, {remaining} remaining"
            ),
            CommandStreamError::UnknownCommand { position, tag } => {
                write!(f, "Unknown command tag {tag} at byte {position}")
            }
            CommandStreamError::PayloadMismatch {
                position,
                command,
                expected,
                consumed,
            } => write!(
                f,
                "Command {command} at byte {position} declared a {expected} byte payload but replay consumed {consumed}"
            ),
            CommandStreamError::InvalidValue {
                position,
                field,
                value,
            } => write!(f, "Invalid value {value} for '{field}' at byte {position}"),
            CommandStreamError::InvalidUtf8 { position } => {
                write!(f, "Invalid UTF-8 string at byte {position}")
            }
            CommandStreamError::LengthOverflow { len } => {
                write!(f, "Length {len} does not fit in a u32 length prefix")
            }
        }
    }
}

impl std::error::Error for CommandStreamError {}

/// An error reported by a native graphics collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeError {
    /// The backend reported a failure, described by the message.
    BackendError(String),
    /// A resource handle does not refer to a live native resource.
    InvalidHandle,
    /// The native device was lost and can no longer accept work.
    DeviceLost,
    /// A command list handle was never produced or has already been executed.
    UnknownCommandList(CommandListId),
    /// A submission handle was never produced or has already been waited on.
    UnknownSubmission(SubmissionId),
}

impl fmt::Display for NativeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeError::BackendError(msg) => write!(f, "Native backend error: {msg}"),
            NativeError::InvalidHandle => write!(f, "Invalid native resource handle"),
            NativeError::DeviceLost => write!(f, "The native device was lost"),
            NativeError::UnknownCommandList(id) => write!(f, "Unknown command list: {id:?}"),
            NativeError::UnknownSubmission(id) => write!(f, "Unknown submission: {id:?}"),
        }
    }
}

impl std::error::Error for NativeError {}

/// The top-level error returned by command buffer operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandBufferError {
    /// The operation is not allowed in the command buffer's current state.
    InvalidState {
        /// The operation that was attempted.
        operation: &'static str,
        /// The state the command buffer was in.
        state: CommandBufferState,
    },
    /// The operation needs the byte stream, but the buffer records natively.
    InterpreterDisabled,
    /// A recorded command exceeds a fixed limit.
    LimitExceeded {
        /// What was counted (e.g. "color attachments").
        what: &'static str,
        /// The requested count.
        count: usize,
        /// The maximum allowed count.
        max: usize,
    },
    /// The command stream is malformed.
    Stream(CommandStreamError),
    /// The native collaborator failed.
    Native(NativeError),
}

impl fmt::Display for CommandBufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandBufferError::InvalidState { operation, state } => {
                write!(f, "Cannot {operation} a command buffer in state {state:?}")
            }
            CommandBufferError::InterpreterDisabled => write!(
                f,
                "The command buffer records natively and has no command stream"
            ),
            CommandBufferError::LimitExceeded { what, count, max } => {
                write!(f, "Too many {what}: {count} (maximum {max})")
            }
            CommandBufferError::Stream(err) => write!(f, "Command stream error: {err}"),
            CommandBufferError::Native(err) => write!(f, "Native error: {err}"),
        }
    }
}

impl std::error::Error for CommandBufferError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommandBufferError::Stream(err) => Some(err),
            CommandBufferError::Native(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CommandStreamError> for CommandBufferError {
    fn from(err: CommandStreamError) -> Self {
        CommandBufferError::Stream(err)
    }
}

impl From<NativeError> for CommandBufferError {
    fn from(err: NativeError) -> Self {
        CommandBufferError::Native(err)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn test_stream_error_display() {
        let err = CommandStreamError::Overrun {
            position: 12,
            requested: 8,
            remaining: 3,
        };
        assert_eq!(
            err.to_string(),
            "Command stream overrun at byte 12: requested 8 bytes, 3 remaining"
        );

        let err = CommandStreamError::PayloadMismatch {
            position: 0,
            command: CommandId::SetBlendColor,
            expected: 16,
            consumed: 12,
        };
        assert!(err.to_string().contains("SetBlendColor"));
    }

    #[test]
    fn test_invalid_state_display() {
        let err = CommandBufferError::InvalidState {
            operation: "record into",
            state: CommandBufferState::Committed,
        };
        assert_eq!(
            err.to_string(),
            "Cannot record into a command buffer in state Committed"
        );
        assert!(err.source().is_none());
    }

    #[test]
    fn test_conversions_keep_source() {
        let err: CommandBufferError = NativeError::DeviceLost.into();
        assert_eq!(err, CommandBufferError::Native(NativeError::DeviceLost));
        assert_eq!(err.source().unwrap().to_string(), "The native device was lost");

        let err: CommandBufferError = CommandStreamError::InvalidUtf8 { position: 5 }.into();
        assert!(matches!(err, CommandBufferError::Stream(_)));
        assert!(err.source().is_some());
    }
}

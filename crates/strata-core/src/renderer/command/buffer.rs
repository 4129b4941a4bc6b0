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

//! The public command buffer front-end and its state machine.

use super::deferred::DeferredCommandBuffer;
use super::software::SoftwareCommandBuffer;
use crate::math::LinearRgba;
use crate::renderer::api::*;
use crate::renderer::error::CommandBufferError;
use crate::renderer::traits::{CommandRecorder, NativeContext, NativeDevice};
use std::fmt;
use std::sync::Arc;

/// How a [`CommandBuffer`] records its commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordingMode {
    /// Commands are serialized into a byte stream and replayed by the interpreter.
    Interpreted,
    /// Commands go straight to a native deferred context.
    NativeDeferred,
}

/// The lifecycle state of a [`CommandBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandBufferState {
    /// Freshly created or reset; nothing recorded yet.
    Initial,
    /// At least one command has been recorded.
    Recording,
    /// Recording has been closed, or the buffer has been executed.
    Recorded,
    /// The buffer has been submitted to the device.
    Committed,
    /// The device has finished executing the submission.
    Completed,
}

impl fmt::Display for CommandBufferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug)]
enum Recorder {
    Software(SoftwareCommandBuffer),
    Deferred(DeferredCommandBuffer),
}

impl Recorder {
    fn as_dyn_mut(&mut self) -> &mut dyn CommandRecorder {
        match self {
            Recorder::Software(buffer) => buffer,
            Recorder::Deferred(buffer) => buffer,
        }
    }
}

/// A recordable command buffer bound to a [`NativeDevice`].
///
/// The recording strategy is chosen once, at construction: a non-zero stream block
/// size selects the interpreted [`SoftwareCommandBuffer`], zero selects the native
/// [`DeferredCommandBuffer`]. Both expose the same recording API, and recording the
/// same calls in either mode produces the same native calls on execution.
///
/// # Examples
///
/// ```ignore
/// let mut commands = CommandBuffer::new(device.clone(), 64 * 1024)?;
/// commands.push_debug_group("frame")?;
/// commands.begin_render_pass(&[ColorAttachment::clear(target, LinearRgba::BLACK)], None)?;
/// commands.end_render_pass()?;
/// commands.pop_debug_group()?;
/// commands.commit()?;
/// commands.wait_until_completed()?;
/// ```
pub struct CommandBuffer {
    label: Option<String>,
    device: Arc<dyn NativeDevice>,
    recorder: Recorder,
    state: CommandBufferState,
    submission: Option<SubmissionId>,
}

impl CommandBuffer {
    /// Creates a command buffer for `device`.
    ///
    /// `stream_block_size` is the initial stream reservation in bytes; zero disables
    /// the interpreter and records into a native deferred context instead.
    /// ## Errors
    /// * `CommandBufferError::Native` - If the device cannot create a deferred context.
    pub fn new(
        device: Arc<dyn NativeDevice>,
        stream_block_size: u64,
    ) -> Result<Self, CommandBufferError> {
        let recorder = if stream_block_size == 0 {
            Recorder::Deferred(DeferredCommandBuffer::new(device.as_ref())?)
        } else {
            Recorder::Software(SoftwareCommandBuffer::new(stream_block_size))
        };
        log::debug!(
            "Created command buffer ({:?}, block size {} bytes).",
            recorder.mode(),
            stream_block_size
        );
        Ok(Self {
            label: None,
            device,
            recorder,
            state: CommandBufferState::Initial,
            submission: None,
        })
    }

    /// Creates a command buffer from [`CommandBufferSettings`].
    pub fn with_settings(
        device: Arc<dyn NativeDevice>,
        settings: &CommandBufferSettings,
    ) -> Result<Self, CommandBufferError> {
        let mut buffer = Self::new(device, settings.stream_block_size)?;
        buffer.label = settings.label.clone();
        Ok(buffer)
    }

    /// The debug label, if any.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Sets the debug label.
    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = Some(label.into());
    }

    /// The current lifecycle state.
    pub fn state(&self) -> CommandBufferState {
        self.state
    }

    /// The recording strategy chosen at construction.
    pub fn mode(&self) -> RecordingMode {
        self.recorder.mode()
    }

    /// The device this buffer submits to.
    pub fn device(&self) -> &Arc<dyn NativeDevice> {
        &self.device
    }

    /// The handle of the last submission, if the buffer has been committed.
    pub fn submission(&self) -> Option<SubmissionId> {
        self.submission
    }

    /// The recorded command stream.
    /// ## Errors
    /// * `CommandBufferError::InterpreterDisabled` - In native deferred mode.
    pub fn recorded_bytes(&self) -> Result<&[u8], CommandBufferError> {
        match &self.recorder {
            Recorder::Software(buffer) => Ok(buffer.stream().as_bytes()),
            Recorder::Deferred(_) => Err(CommandBufferError::InterpreterDisabled),
        }
    }

    /// The number of commands recorded since the last reset.
    /// ## Errors
    /// * `CommandBufferError::InterpreterDisabled` - In native deferred mode.
    pub fn command_count(&self) -> Result<usize, CommandBufferError> {
        match &self.recorder {
            Recorder::Software(buffer) => Ok(buffer.command_count()),
            Recorder::Deferred(_) => Err(CommandBufferError::InterpreterDisabled),
        }
    }

    fn recording(&mut self) -> Result<&mut dyn CommandRecorder, CommandBufferError> {
        match self.state {
            CommandBufferState::Initial | CommandBufferState::Recording => {
                self.state = CommandBufferState::Recording;
                Ok(self.recorder.as_dyn_mut())
            }
            state => Err(CommandBufferError::InvalidState {
                operation: "record into",
                state,
            }),
        }
    }

    fn ensure_executable(&self, operation: &'static str) -> Result<(), CommandBufferError> {
        match self.state {
            CommandBufferState::Initial
            | CommandBufferState::Recording
            | CommandBufferState::Recorded => Ok(()),
            state => Err(CommandBufferError::InvalidState { operation, state }),
        }
    }

    /// Opens a named debug group.
    pub fn push_debug_group(&mut self, label: &str) -> Result<(), CommandBufferError> {
        self.recording()?.push_debug_group(label)
    }

    /// Closes the innermost debug group.
    pub fn pop_debug_group(&mut self) -> Result<(), CommandBufferError> {
        self.recording()?.pop_debug_group()
    }

    /// Inserts a named debug marker.
    pub fn insert_debug_marker(&mut self, label: &str) -> Result<(), CommandBufferError> {
        self.recording()?.insert_debug_marker(label)
    }

    /// Begins a render pass on the given attachments.
    pub fn begin_render_pass(
        &mut self,
        colors: &[ColorAttachment],
        depth_stencil: Option<&DepthStencilAttachment>,
    ) -> Result<(), CommandBufferError> {
        self.recording()?.begin_render_pass(colors, depth_stencil)
    }

    /// Ends the current render pass.
    pub fn end_render_pass(&mut self) -> Result<(), CommandBufferError> {
        self.recording()?.end_render_pass()
    }

    /// Sets a single viewport.
    pub fn set_viewport(&mut self, viewport: &Viewport) -> Result<(), CommandBufferError> {
        self.recording()?.set_viewport(viewport)
    }

    /// Sets the viewports, in slot order.
    pub fn set_viewports(&mut self, viewports: &[Viewport]) -> Result<(), CommandBufferError> {
        self.recording()?.set_viewports(viewports)
    }

    /// Sets a single scissor rectangle.
    pub fn set_scissor_rect(&mut self, rect: &ScissorRect) -> Result<(), CommandBufferError> {
        self.recording()?.set_scissor_rect(rect)
    }

    /// Sets the scissor rectangles, in slot order.
    pub fn set_scissor_rects(&mut self, rects: &[ScissorRect]) -> Result<(), CommandBufferError> {
        self.recording()?.set_scissor_rects(rects)
    }

    /// Sets the constant blend color.
    pub fn set_blend_color(&mut self, color: LinearRgba) -> Result<(), CommandBufferError> {
        self.recording()?.set_blend_color(color)
    }

    /// Binds a device-owned buffer to `slot`.
    pub fn bind_buffer(&mut self, slot: u32, buffer: BufferId) -> Result<(), CommandBufferError> {
        self.recording()?.bind_buffer(slot, buffer)
    }

    /// Binds a copy of `data` to `slot`.
    pub fn bind_buffer_data(&mut self, slot: u32, data: &[u8]) -> Result<(), CommandBufferError> {
        self.recording()?.bind_buffer_data(slot, data)
    }

    /// Closes recording. Further recording calls fail until [`CommandBuffer::reset`].
    pub fn end_recording(&mut self) -> Result<(), CommandBufferError> {
        self.ensure_executable("end recording of")?;
        self.state = CommandBufferState::Recorded;
        Ok(())
    }

    /// Executes the recorded commands against `context`.
    ///
    /// In interpreted mode this replays the stream and may be repeated. In native
    /// deferred mode it finalizes the deferred context into a command list and has
    /// `context` execute that list.
    pub fn execute(&mut self, context: &mut dyn NativeContext) -> Result<(), CommandBufferError> {
        self.ensure_executable("execute")?;
        self.state = CommandBufferState::Recorded;
        self.recorder.as_dyn_mut().execute(context)
    }

    /// Submits the recorded commands to the device.
    ///
    /// The device runs [`CommandBuffer::execute`] against its immediate context
    /// and returns a submission handle, kept for [`CommandBuffer::wait_until_completed`].
    pub fn commit(&mut self) -> Result<SubmissionId, CommandBufferError> {
        self.ensure_executable("commit")?;
        self.state = CommandBufferState::Recorded;

        let recorder = &mut self.recorder;
        let submission = self
            .device
            .submit(&mut |context: &mut dyn NativeContext| {
                recorder.as_dyn_mut().execute(context)
            })?;

        log::debug!(
            "Committed command buffer '{}' as {:?}.",
            self.label.as_deref().unwrap_or("unnamed"),
            submission
        );
        self.submission = Some(submission);
        self.state = CommandBufferState::Committed;
        Ok(submission)
    }

    /// Blocks until the device has finished executing the committed commands.
    pub fn wait_until_completed(&mut self) -> Result<(), CommandBufferError> {
        let submission = match (self.state, self.submission) {
            (CommandBufferState::Committed, Some(submission)) => submission,
            (state, _) => {
                return Err(CommandBufferError::InvalidState {
                    operation: "wait on",
                    state,
                })
            }
        };
        self.device.wait_for_submission(submission)?;
        self.state = CommandBufferState::Completed;
        Ok(())
    }

    /// Discards everything recorded and returns to [`CommandBufferState::Initial`].
    ///
    /// The stream allocation (or native deferred context) is kept for reuse.
    pub fn reset(&mut self) {
        self.release_submission();
        self.recorder.as_dyn_mut().reset();
        self.state = CommandBufferState::Initial;
    }

    /// Hands a submission that was never waited on back to the device.
    fn release_submission(&mut self) {
        if let Some(submission) = self.submission.take() {
            if self.state == CommandBufferState::Committed {
                log::trace!("Releasing unwaited {:?}.", submission);
                self.device.release_submission(submission);
            }
        }
    }
}

impl Drop for CommandBuffer {
    fn drop(&mut self) {
        self.release_submission();
    }
}

impl Recorder {
    fn mode(&self) -> RecordingMode {
        match self {
            Recorder::Software(buffer) => buffer.mode(),
            Recorder::Deferred(buffer) => buffer.mode(),
        }
    }
}

impl fmt::Debug for CommandBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandBuffer")
            .field("label", &self.label)
            .field("mode", &self.mode())
            .field("state", &self.state)
            .field("submission", &self.submission)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_buffer_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<CommandBuffer>();
    }

    #[test]
    fn test_state_display() {
        assert_eq!(CommandBufferState::Recorded.to_string(), "Recorded");
    }
}

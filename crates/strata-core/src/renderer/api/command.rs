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

//! Command tags and the opaque handles exchanged with a native device.

use std::fmt;

/// Identifies which recordable operation a serialized command represents.
///
/// Values are dense, start at zero and are used directly as an index into the
/// replay dispatch table. [`CommandId::COUNT`] is the table size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandId {
    /// Opens a named debug group.
    PushDebugGroup = 0,
    /// Closes the innermost debug group.
    PopDebugGroup = 1,
    /// Inserts a single named debug marker.
    InsertDebugMarker = 2,
    /// Binds render targets and performs their load actions.
    BeginRenderPass = 3,
    /// Unbinds all render targets.
    EndRenderPass = 4,
    /// Sets one or more viewports.
    SetViewports = 5,
    /// Sets one or more scissor rectangles.
    SetScissorRects = 6,
    /// Sets the constant blend color.
    SetBlendColor = 7,
    /// Binds a device-owned buffer to a slot.
    BindBuffer = 8,
    /// Binds a block of inline data to a slot.
    BindBufferData = 9,
}

impl CommandId {
    /// The number of command tags, i.e. the size of the dispatch table.
    pub const COUNT: usize = 10;

    /// Every command tag, in value order.
    pub const ALL: [CommandId; Self::COUNT] = [
        CommandId::PushDebugGroup,
        CommandId::PopDebugGroup,
        CommandId::InsertDebugMarker,
        CommandId::BeginRenderPass,
        CommandId::EndRenderPass,
        CommandId::SetViewports,
        CommandId::SetScissorRects,
        CommandId::SetBlendColor,
        CommandId::BindBuffer,
        CommandId::BindBufferData,
    ];

    /// Returns the on-stream byte for this tag.
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Decodes a tag byte, returning `None` for values outside the tag range.
    #[inline]
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    /// Index of this tag in the dispatch table.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// An opaque handle to a finalized native command list.
///
/// Returned by [`NativeDeferredContext::finish_command_list`] and consumed by
/// [`NativeContext::execute_command_list`].
///
/// [`NativeDeferredContext::finish_command_list`]: crate::renderer::traits::NativeDeferredContext::finish_command_list
/// [`NativeContext::execute_command_list`]: crate::renderer::traits::NativeContext::execute_command_list
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct CommandListId(pub u64);

/// An opaque handle to work accepted by [`NativeDevice::submit`].
///
/// [`NativeDevice::submit`]: crate::renderer::traits::NativeDevice::submit
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SubmissionId(pub u64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_are_dense() {
        for (index, id) in CommandId::ALL.iter().enumerate() {
            assert_eq!(id.index(), index);
            assert_eq!(CommandId::from_u8(id.as_u8()), Some(*id));
        }
    }

    #[test]
    fn test_out_of_range_tag_is_rejected() {
        assert_eq!(CommandId::from_u8(CommandId::COUNT as u8), None);
        assert_eq!(CommandId::from_u8(u8::MAX), None);
    }
}

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

//! The append-only byte log that interpreted command buffers record into.

use crate::renderer::error::CommandStreamError;
use std::cell::Cell;

/// An append-only byte buffer with an independent, seekable read cursor.
///
/// The write cursor is the length of the stream. The read cursor lives in a
/// [`Cell`], so reads only need `&self`; slices returned by [`CommandStream::read_raw`]
/// borrow the stream, which keeps it from being written to or reset while they
/// are alive.
#[derive(Debug, Default)]
pub struct CommandStream {
    data: Vec<u8>,
    read_position: Cell<usize>,
}

impl CommandStream {
    /// Creates an empty stream without allocating.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty stream with room for at least `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut stream = Self::new();
        stream.reserve(capacity);
        stream
    }

    /// Reserves room for at least `additional` more bytes.
    ///
    /// A reservation the allocator refuses is logged and otherwise ignored; the
    /// stream still grows on demand when written to.
    pub fn reserve(&mut self, additional: usize) {
        if let Err(err) = self.data.try_reserve(additional) {
            log::warn!("CommandStream: could not reserve {additional} bytes: {err}");
        }
    }

    /// Appends `bytes` at the write cursor.
    pub fn write_raw(&mut self, bytes: &[u8]) {
        let capacity = self.data.capacity();
        self.data.extend_from_slice(bytes);
        if self.data.capacity() != capacity {
            log::debug!(
                "CommandStream grew from {} to {} bytes.",
                capacity,
                self.data.capacity()
            );
        }
    }

    /// Overwrites already written bytes starting at `position`.
    ///
    /// `position + bytes.len()` must not exceed the stream length.
    pub(crate) fn overwrite_raw(&mut self, position: usize, bytes: &[u8]) {
        self.data[position..position + bytes.len()].copy_from_slice(bytes);
    }

    /// Drops everything written after `len`.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.data.truncate(len);
        if self.read_position.get() > len {
            self.read_position.set(len);
        }
    }

    /// Moves the read cursor to an absolute byte offset, clamped to the stream length.
    pub fn seek_read(&self, position: usize) {
        self.read_position.set(position.min(self.data.len()));
    }

    /// The current read cursor.
    #[inline]
    pub fn tell_read(&self) -> usize {
        self.read_position.get()
    }

    /// Bytes between the read cursor and the end of the stream.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.read_position.get()
    }

    /// Returns the next `size` bytes and advances the read cursor past them.
    ///
    /// # Errors
    /// [`CommandStreamError::Overrun`] if fewer than `size` bytes remain. The read
    /// cursor does not move in that case.
    pub fn read_raw(&self, size: usize) -> Result<&[u8], CommandStreamError> {
        let position = self.read_position.get();
        let remaining = self.data.len() - position;
        if size > remaining {
            return Err(CommandStreamError::Overrun {
                position,
                requested: size,
                remaining,
            });
        }
        self.read_position.set(position + size);
        Ok(&self.data[position..position + size])
    }

    /// Whether the read cursor has reached the end of the recorded data.
    #[inline]
    pub fn at_end(&self) -> bool {
        self.read_position.get() == self.data.len()
    }

    /// Empties the stream and rewinds the read cursor, keeping the allocation.
    pub fn reset(&mut self) {
        self.data.clear();
        self.read_position.set(0);
    }

    /// The number of bytes written.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether nothing has been written.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The size of the backing allocation.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Everything written so far.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read() {
        let mut stream = CommandStream::with_capacity(4);
        stream.write_raw(&[1, 2, 3]);
        stream.write_raw(&[4, 5]);
        assert_eq!(stream.len(), 5);

        assert_eq!(stream.read_raw(2).unwrap(), &[1, 2]);
        assert_eq!(stream.tell_read(), 2);
        assert_eq!(stream.read_raw(3).unwrap(), &[3, 4, 5]);
        assert!(stream.at_end());
    }

    #[test]
    fn test_overrun_leaves_cursor_in_place() {
        let mut stream = CommandStream::new();
        stream.write_raw(&[9; 6]);
        stream.seek_read(4);

        let err = stream.read_raw(3).unwrap_err();
        assert_eq!(
            err,
            CommandStreamError::Overrun {
                position: 4,
                requested: 3,
                remaining: 2,
            }
        );
        assert_eq!(stream.tell_read(), 4);
    }

    #[test]
    fn test_seek_is_clamped() {
        let mut stream = CommandStream::new();
        stream.write_raw(&[0; 3]);
        stream.seek_read(100);
        assert_eq!(stream.tell_read(), 3);
        assert!(stream.at_end());
    }

    #[test]
    fn test_reset_keeps_allocation() {
        let mut stream = CommandStream::with_capacity(64);
        stream.write_raw(&[7; 48]);
        let _ = stream.read_raw(10).unwrap();
        let capacity = stream.capacity();

        stream.reset();
        assert!(stream.is_empty());
        assert_eq!(stream.tell_read(), 0);
        assert_eq!(stream.capacity(), capacity);
    }

    #[test]
    fn test_growth_preserves_contents() {
        let mut stream = CommandStream::with_capacity(0);
        for i in 0..1000u32 {
            stream.write_raw(&i.to_ne_bytes());
        }
        for i in 0..1000u32 {
            let bytes = stream.read_raw(4).unwrap();
            assert_eq!(u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]), i);
        }
        assert!(stream.at_end());
    }

    #[test]
    fn test_overwrite_and_truncate() {
        let mut stream = CommandStream::new();
        stream.write_raw(&[0, 0, 0, 0, 5]);
        stream.overwrite_raw(1, &[8, 8]);
        assert_eq!(stream.as_bytes(), &[0, 8, 8, 0, 5]);

        stream.seek_read(5);
        stream.truncate(2);
        assert_eq!(stream.as_bytes(), &[0, 8]);
        assert_eq!(stream.tell_read(), 2);
    }
}

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

//! Typed, symmetric writers and readers layered on a [`CommandStream`].
//!
//! Every command is framed as a one-byte [`CommandId`], a `u32` payload length and
//! the payload itself. The length is patched in once the payload has been written,
//! and checked after replay, so a replay function that reads a different shape than
//! was recorded is caught at the command that caused it.

use super::stream::CommandStream;
use crate::renderer::api::CommandId;
use crate::renderer::error::CommandStreamError;
use bytemuck::Pod;
use std::borrow::Cow;
use std::mem::size_of;

/// Size of the framing written before every payload.
pub const COMMAND_HEADER_SIZE: usize = size_of::<u8>() + size_of::<u32>();

fn length_prefix(len: usize) -> Result<u32, CommandStreamError> {
    u32::try_from(len).map_err(|_| CommandStreamError::LengthOverflow { len })
}

/// Writes framed commands into a [`CommandStream`].
#[derive(Debug)]
pub struct CommandEncoder<'a> {
    stream: &'a mut CommandStream,
}

impl<'a> CommandEncoder<'a> {
    /// Creates an encoder appending to `stream`.
    pub fn new(stream: &'a mut CommandStream) -> Self {
        Self { stream }
    }

    /// Writes one complete command: tag, payload length and whatever `payload` writes.
    ///
    /// If `payload` fails, everything written for this command is removed again so
    /// the stream never holds a half-written command.
    pub fn encode<F>(&mut self, id: CommandId, payload: F) -> Result<(), CommandStreamError>
    where
        F: FnOnce(&mut Self) -> Result<(), CommandStreamError>,
    {
        let start = self.stream.len();
        self.write_command_id(id);
        let length_position = self.stream.len();
        self.write(&0u32);
        let payload_start = self.stream.len();

        let result = payload(self)
            .and_then(|()| length_prefix(self.stream.len() - payload_start));
        match result {
            Ok(payload_len) => {
                self.stream
                    .overwrite_raw(length_position, &payload_len.to_ne_bytes());
                Ok(())
            }
            Err(err) => {
                self.stream.truncate(start);
                Err(err)
            }
        }
    }

    /// Writes a command tag.
    #[inline]
    pub fn write_command_id(&mut self, id: CommandId) {
        self.stream.write_raw(&[id.as_u8()]);
    }

    /// Writes a plain-old-data value by raw byte copy.
    #[inline]
    pub fn write<T: Pod>(&mut self, value: &T) {
        self.stream.write_raw(bytemuck::bytes_of(value));
    }

    /// Writes a boolean as a single byte.
    #[inline]
    pub fn write_bool(&mut self, value: bool) {
        self.write(&u8::from(value));
    }

    /// Writes a `u32` length prefix.
    pub fn write_len(&mut self, len: usize) -> Result<(), CommandStreamError> {
        let len = length_prefix(len)?;
        self.write(&len);
        Ok(())
    }

    /// Writes a length-prefixed copy of `value`'s UTF-8 bytes.
    pub fn write_str(&mut self, value: &str) -> Result<(), CommandStreamError> {
        self.write_bytes(value.as_bytes())
    }

    /// Writes a length-prefixed byte block.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), CommandStreamError> {
        self.write_len(bytes.len())?;
        self.stream.write_raw(bytes);
        Ok(())
    }

    /// Writes an element count followed by the raw bytes of `values`.
    pub fn write_slice<T: Pod>(&mut self, values: &[T]) -> Result<(), CommandStreamError> {
        self.write_len(values.len())?;
        self.stream.write_raw(bytemuck::cast_slice(values));
        Ok(())
    }
}

/// The framing of one command as read back from a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandHeader {
    /// The command tag.
    pub id: CommandId,
    /// Payload length in bytes.
    pub payload_len: u32,
    /// Byte offset of the tag.
    pub position: usize,
    /// Byte offset of the first payload byte.
    pub payload_start: usize,
}

/// Reads framed commands back out of a [`CommandStream`].
///
/// Borrowed reads ([`CommandDecoder::read_str`], [`CommandDecoder::read_bytes`],
/// [`CommandDecoder::read_slice`]) point straight into the stream and live as
/// long as the stream borrow.
#[derive(Debug, Clone, Copy)]
pub struct CommandDecoder<'a> {
    stream: &'a CommandStream,
    /// End of the current command's payload. Reads never cross it.
    payload_end: Option<usize>,
}

impl<'a> CommandDecoder<'a> {
    /// Creates a decoder reading from the stream's current read cursor.
    pub fn new(stream: &'a CommandStream) -> Self {
        Self {
            stream,
            payload_end: None,
        }
    }

    /// Moves the read cursor back to the first command.
    #[inline]
    pub fn rewind(&mut self) {
        self.payload_end = None;
        self.stream.seek_read(0);
    }

    /// Bytes left before the end of the current payload, or of the stream outside a command.
    #[inline]
    pub fn remaining(&self) -> usize {
        match self.payload_end {
            Some(end) => end.saturating_sub(self.position()),
            None => self.stream.remaining(),
        }
    }

    /// The current read cursor.
    #[inline]
    pub fn position(&self) -> usize {
        self.stream.tell_read()
    }

    /// Reads the next command's framing.
    ///
    /// Returns `Ok(None)` when the cursor sits exactly on the end of the stream,
    /// which is how a well-formed stream terminates. Until the next header, reads are
    /// confined to the returned command's payload.
    pub fn read_command_header(&mut self) -> Result<Option<CommandHeader>, CommandStreamError> {
        self.payload_end = None;
        if self.stream.at_end() {
            return Ok(None);
        }

        let position = self.position();
        let tag: u8 = self.read()?;
        let id = CommandId::from_u8(tag)
            .ok_or(CommandStreamError::UnknownCommand { position, tag })?;
        let payload_len: u32 = self.read()?;
        let payload_start = self.position();

        let remaining = self.stream.remaining();
        if payload_len as usize > remaining {
            return Err(CommandStreamError::Overrun {
                position: payload_start,
                requested: payload_len as usize,
                remaining,
            });
        }
        self.payload_end = Some(payload_start + payload_len as usize);

        Ok(Some(CommandHeader {
            id,
            payload_len,
            position,
            payload_start,
        }))
    }

    /// Checks that exactly the command's payload has been consumed.
    pub fn finish_command(&self, header: &CommandHeader) -> Result<(), CommandStreamError> {
        let consumed = self.position() - header.payload_start;
        if consumed != header.payload_len as usize {
            return Err(CommandStreamError::PayloadMismatch {
                position: header.position,
                command: header.id,
                expected: header.payload_len,
                consumed,
            });
        }
        Ok(())
    }

    /// Reads the next `size` raw bytes.
    ///
    /// Inside a command, a read that would cross the end of its payload is an
    /// [`CommandStreamError::Overrun`] and leaves the cursor in place.
    #[inline]
    pub fn read_raw(&mut self, size: usize) -> Result<&'a [u8], CommandStreamError> {
        if let Some(end) = self.payload_end {
            let position = self.position();
            let remaining = end.saturating_sub(position);
            if size > remaining {
                return Err(CommandStreamError::Overrun {
                    position,
                    requested: size,
                    remaining,
                });
            }
        }
        let stream: &'a CommandStream = self.stream;
        stream.read_raw(size)
    }

    /// Reads a plain-old-data value. The stream carries no alignment, so this copies.
    #[inline]
    pub fn read<T: Pod>(&mut self) -> Result<T, CommandStreamError> {
        let bytes = self.read_raw(size_of::<T>())?;
        Ok(bytemuck::pod_read_unaligned(bytes))
    }

    /// Reads a boolean written by [`CommandEncoder::write_bool`].
    pub fn read_bool(&mut self, field: &'static str) -> Result<bool, CommandStreamError> {
        match self.read::<u8>()? {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(CommandStreamError::InvalidValue {
                position: self.position(),
                field,
                value: u64::from(value),
            }),
        }
    }

    /// Reads a `u32` length prefix.
    #[inline]
    pub fn read_len(&mut self) -> Result<usize, CommandStreamError> {
        Ok(self.read::<u32>()? as usize)
    }

    /// Reads a length-prefixed byte block without copying it.
    pub fn read_bytes(&mut self) -> Result<&'a [u8], CommandStreamError> {
        let len = self.read_len()?;
        self.read_raw(len)
    }

    /// Reads a length-prefixed UTF-8 string without copying it.
    pub fn read_str(&mut self) -> Result<&'a str, CommandStreamError> {
        let len = self.read_len()?;
        let position = self.position();
        let bytes = self.read_raw(len)?;
        std::str::from_utf8(bytes).map_err(|_| CommandStreamError::InvalidUtf8 { position })
    }

    /// Reads a length-prefixed UTF-8 string into an owned `String`.
    pub fn read_string(&mut self) -> Result<String, CommandStreamError> {
        self.read_str().map(str::to_owned)
    }

    /// Reads `count` values of `T`.
    ///
    /// Borrows the stream when the bytes happen to be aligned for `T`, otherwise
    /// copies them into an aligned vector.
    pub fn read_slice<T: Pod>(&mut self, count: usize) -> Result<Cow<'a, [T]>, CommandStreamError> {
        let position = self.position();
        let size = count
            .checked_mul(size_of::<T>())
            .ok_or(CommandStreamError::Overrun {
                position,
                requested: usize::MAX,
                remaining: self.remaining(),
            })?;
        let bytes = self.read_raw(size)?;
        match bytemuck::try_cast_slice::<u8, T>(bytes) {
            Ok(values) => Ok(Cow::Borrowed(values)),
            Err(_) => Ok(Cow::Owned(
                bytes
                    .chunks_exact(size_of::<T>())
                    .map(bytemuck::pod_read_unaligned)
                    .collect(),
            )),
        }
    }

    /// Reads an element count written by [`CommandEncoder::write_slice`], rejects
    /// counts above `max`, then reads the elements.
    pub fn read_counted_slice<T: Pod>(
        &mut self,
        field: &'static str,
        max: usize,
    ) -> Result<Cow<'a, [T]>, CommandStreamError> {
        let count = self.read_len()?;
        if count > max {
            return Err(CommandStreamError::InvalidValue {
                position: self.position(),
                field,
                value: count as u64,
            });
        }
        self.read_slice(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_one(
        stream: &mut CommandStream,
        id: CommandId,
        payload: impl FnOnce(&mut CommandEncoder<'_>) -> Result<(), CommandStreamError>,
    ) {
        CommandEncoder::new(stream).encode(id, payload).unwrap();
    }

    #[test]
    fn test_header_carries_payload_length() {
        let mut stream = CommandStream::new();
        encode_one(&mut stream, CommandId::InsertDebugMarker, |e| e.write_str("abc"));
        encode_one(&mut stream, CommandId::PopDebugGroup, |_| Ok(()));

        let mut decoder = CommandDecoder::new(&stream);
        decoder.rewind();

        let header = decoder.read_command_header().unwrap().unwrap();
        assert_eq!(header.id, CommandId::InsertDebugMarker);
        assert_eq!(header.position, 0);
        assert_eq!(header.payload_start, COMMAND_HEADER_SIZE);
        assert_eq!(header.payload_len, 4 + 3);
        assert_eq!(decoder.read_str().unwrap(), "abc");
        decoder.finish_command(&header).unwrap();

        let header = decoder.read_command_header().unwrap().unwrap();
        assert_eq!(header.id, CommandId::PopDebugGroup);
        assert_eq!(header.payload_len, 0);
        decoder.finish_command(&header).unwrap();

        assert_eq!(decoder.read_command_header().unwrap(), None);
    }

    #[test]
    fn test_failed_payload_is_rolled_back() {
        let mut stream = CommandStream::new();
        encode_one(&mut stream, CommandId::PopDebugGroup, |_| Ok(()));
        let len = stream.len();

        let result = CommandEncoder::new(&mut stream).encode(CommandId::SetBlendColor, |e| {
            e.write(&1.0f32);
            Err(CommandStreamError::LengthOverflow { len: 0 })
        });
        assert!(result.is_err());
        assert_eq!(stream.len(), len);
    }

    #[test]
    fn test_unknown_tag() {
        let mut stream = CommandStream::new();
        stream.write_raw(&[200, 0, 0, 0, 0]);
        let mut decoder = CommandDecoder::new(&stream);
        assert_eq!(
            decoder.read_command_header(),
            Err(CommandStreamError::UnknownCommand {
                position: 0,
                tag: 200
            })
        );
    }

    #[test]
    fn test_truncated_payload_is_an_overrun() {
        let mut stream = CommandStream::new();
        stream.write_raw(&[CommandId::SetBlendColor.as_u8()]);
        stream.write_raw(&16u32.to_ne_bytes());
        stream.write_raw(&[0; 8]);

        let mut decoder = CommandDecoder::new(&stream);
        assert!(matches!(
            decoder.read_command_header(),
            Err(CommandStreamError::Overrun {
                requested: 16,
                remaining: 8,
                ..
            })
        ));
    }

    #[test]
    fn test_under_read_is_a_payload_mismatch() {
        let mut stream = CommandStream::new();
        encode_one(&mut stream, CommandId::BindBuffer, |e| {
            e.write(&3u32);
            e.write(&7u64);
            Ok(())
        });

        let mut decoder = CommandDecoder::new(&stream);
        let header = decoder.read_command_header().unwrap().unwrap();
        let _slot: u32 = decoder.read().unwrap();
        assert_eq!(
            decoder.finish_command(&header),
            Err(CommandStreamError::PayloadMismatch {
                position: 0,
                command: CommandId::BindBuffer,
                expected: 12,
                consumed: 4,
            })
        );
    }

    #[test]
    fn test_reads_stop_at_the_payload_end() {
        let mut stream = CommandStream::new();
        encode_one(&mut stream, CommandId::PushDebugGroup, |e| e.write_str("abc"));
        encode_one(&mut stream, CommandId::PopDebugGroup, |_| Ok(()));
        // Declare an empty payload for the push.
        stream.overwrite_raw(1, &0u32.to_ne_bytes());

        let mut decoder = CommandDecoder::new(&stream);
        let header = decoder.read_command_header().unwrap().unwrap();
        assert_eq!(header.payload_len, 0);
        assert_eq!(decoder.remaining(), 0);
        assert_eq!(
            decoder.read_str(),
            Err(CommandStreamError::Overrun {
                position: COMMAND_HEADER_SIZE,
                requested: 4,
                remaining: 0,
            })
        );
        assert_eq!(decoder.position(), COMMAND_HEADER_SIZE);
    }

    #[test]
    fn test_invalid_utf8_and_bool() {
        let mut stream = CommandStream::new();
        stream.write_raw(&2u32.to_ne_bytes());
        stream.write_raw(&[0xff, 0xfe]);
        stream.write_raw(&[2]);

        let mut decoder = CommandDecoder::new(&stream);
        assert_eq!(
            decoder.read_str(),
            Err(CommandStreamError::InvalidUtf8 { position: 4 })
        );
        assert!(matches!(
            decoder.read_bool("flag"),
            Err(CommandStreamError::InvalidValue {
                field: "flag",
                value: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_slices_survive_misalignment() {
        let mut stream = CommandStream::new();
        let values = [1u64, u64::MAX, 42];
        {
            let mut encoder = CommandEncoder::new(&mut stream);
            encoder.write_bool(true);
            encoder.write_slice(&values).unwrap();
        }

        let mut decoder = CommandDecoder::new(&stream);
        assert!(decoder.read_bool("flag").unwrap());
        let read = decoder.read_counted_slice::<u64>("count", 8).unwrap();
        assert_eq!(&*read, &values);
        assert!(stream.at_end());
    }

    #[test]
    fn test_counted_slice_limit() {
        let mut stream = CommandStream::new();
        CommandEncoder::new(&mut stream)
            .write_slice(&[0u32; 5])
            .unwrap();
        let mut decoder = CommandDecoder::new(&stream);
        assert!(matches!(
            decoder.read_counted_slice::<u32>("count", 4),
            Err(CommandStreamError::InvalidValue { value: 5, .. })
        ));
    }
}

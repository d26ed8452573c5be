//! # Record Serialization
//!
//! Little-endian field access over fixed buffers.
//!
//! ## Design
//!
//! - The writer owns a stack buffer sized for the largest datagram, so
//!   encoding a reply never touches the heap
//! - The reader borrows the receive buffer and never copies payloads
//! - Fixed byte blobs (device ids, room properties) go through `bytemuck`

use bytemuck::{bytes_of, Pod};

use crate::checksum;
use crate::error::{WireError, WireResult};
use crate::MAX_DATAGRAM_SIZE;

/// Packet writer - encodes records into a pre-allocated buffer.
///
/// Reuse one writer per worker to avoid re-zeroing the buffer.
pub struct PacketWriter {
    buffer: [u8; MAX_DATAGRAM_SIZE],
    position: usize,
}

impl PacketWriter {
    /// Creates a writer with an empty buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffer: [0u8; MAX_DATAGRAM_SIZE],
            position: 0,
        }
    }

    /// Resets the writer for reuse.
    #[inline]
    pub fn reset(&mut self) {
        self.position = 0;
    }

    /// Returns the number of bytes written.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.position
    }

    /// Returns true if nothing has been written.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.position == 0
    }

    /// Returns the written bytes.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer[..self.position]
    }

    #[inline]
    fn reserve(&mut self, needed: usize) -> WireResult<&mut [u8]> {
        let remaining = MAX_DATAGRAM_SIZE - self.position;
        if needed > remaining {
            return Err(WireError::BufferFull { needed, remaining });
        }
        let start = self.position;
        self.position += needed;
        Ok(&mut self.buffer[start..start + needed])
    }

    /// Writes raw bytes.
    ///
    /// # Errors
    ///
    /// [`WireError::BufferFull`] if the bytes do not fit.
    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) -> WireResult<()> {
        self.reserve(bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }

    /// Writes a single byte.
    ///
    /// # Errors
    ///
    /// [`WireError::BufferFull`] if the buffer is full.
    #[inline]
    pub fn write_u8(&mut self, value: u8) -> WireResult<()> {
        self.write_bytes(&[value])
    }

    /// Writes a signed byte.
    ///
    /// # Errors
    ///
    /// [`WireError::BufferFull`] if the buffer is full.
    #[inline]
    pub fn write_i8(&mut self, value: i8) -> WireResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes a little-endian `u16`.
    ///
    /// # Errors
    ///
    /// [`WireError::BufferFull`] if the value does not fit.
    #[inline]
    pub fn write_u16(&mut self, value: u16) -> WireResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes a little-endian `i16`.
    ///
    /// # Errors
    ///
    /// [`WireError::BufferFull`] if the value does not fit.
    #[inline]
    pub fn write_i16(&mut self, value: i16) -> WireResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes a little-endian `u32`.
    ///
    /// # Errors
    ///
    /// [`WireError::BufferFull`] if the value does not fit.
    #[inline]
    pub fn write_u32(&mut self, value: u32) -> WireResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes a little-endian `i32`.
    ///
    /// # Errors
    ///
    /// [`WireError::BufferFull`] if the value does not fit.
    #[inline]
    pub fn write_i32(&mut self, value: i32) -> WireResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes a little-endian `u64`.
    ///
    /// # Errors
    ///
    /// [`WireError::BufferFull`] if the value does not fit.
    #[inline]
    pub fn write_u64(&mut self, value: u64) -> WireResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes a Pod value byte-for-byte.
    ///
    /// Only used for byte arrays, which have no endianness.
    ///
    /// # Errors
    ///
    /// [`WireError::BufferFull`] if the value does not fit.
    #[inline]
    pub fn write_pod<T: Pod>(&mut self, value: &T) -> WireResult<()> {
        self.write_bytes(bytes_of(value))
    }

    /// Appends the checksum of everything written so far.
    ///
    /// # Errors
    ///
    /// [`WireError::BufferFull`] if the checksum does not fit.
    pub fn write_checksum(&mut self) -> WireResult<()> {
        let sum = checksum::compute(self.as_slice());
        self.write_u32(sum)
    }
}

impl Default for PacketWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Packet reader - decodes fields from a borrowed datagram.
pub struct PacketReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> PacketReader<'a> {
    /// Creates a reader over `buffer`.
    #[must_use]
    pub const fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, position: 0 }
    }

    /// Returns the number of unread bytes.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    /// Returns the read position.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Reads `len` raw bytes.
    ///
    /// # Errors
    ///
    /// [`WireError::Truncated`] if fewer than `len` bytes remain.
    #[inline]
    pub fn read_bytes(&mut self, len: usize) -> WireResult<&'a [u8]> {
        let remaining = self.remaining();
        if len > remaining {
            return Err(WireError::Truncated {
                needed: len,
                remaining,
            });
        }
        let start = self.position;
        self.position += len;
        Ok(&self.buffer[start..start + len])
    }

    #[inline]
    fn read_array<const N: usize>(&mut self) -> WireResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Reads a single byte.
    ///
    /// # Errors
    ///
    /// [`WireError::Truncated`] at end of buffer.
    #[inline]
    pub fn read_u8(&mut self) -> WireResult<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Reads a signed byte.
    ///
    /// # Errors
    ///
    /// [`WireError::Truncated`] at end of buffer.
    #[inline]
    pub fn read_i8(&mut self) -> WireResult<i8> {
        self.read_array::<1>().map(i8::from_le_bytes)
    }

    /// Reads a little-endian `u16`.
    ///
    /// # Errors
    ///
    /// [`WireError::Truncated`] if fewer than two bytes remain.
    #[inline]
    pub fn read_u16(&mut self) -> WireResult<u16> {
        self.read_array().map(u16::from_le_bytes)
    }

    /// Reads a little-endian `i16`.
    ///
    /// # Errors
    ///
    /// [`WireError::Truncated`] if fewer than two bytes remain.
    #[inline]
    pub fn read_i16(&mut self) -> WireResult<i16> {
        self.read_array().map(i16::from_le_bytes)
    }

    /// Reads a little-endian `u32`.
    ///
    /// # Errors
    ///
    /// [`WireError::Truncated`] if fewer than four bytes remain.
    #[inline]
    pub fn read_u32(&mut self) -> WireResult<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    /// Reads a little-endian `i32`.
    ///
    /// # Errors
    ///
    /// [`WireError::Truncated`] if fewer than four bytes remain.
    #[inline]
    pub fn read_i32(&mut self) -> WireResult<i32> {
        self.read_array().map(i32::from_le_bytes)
    }

    /// Reads a little-endian `u64`.
    ///
    /// # Errors
    ///
    /// [`WireError::Truncated`] if fewer than eight bytes remain.
    #[inline]
    pub fn read_u64(&mut self) -> WireResult<u64> {
        self.read_array().map(u64::from_le_bytes)
    }

    /// Reads a Pod value byte-for-byte.
    ///
    /// # Errors
    ///
    /// [`WireError::Truncated`] if the value does not fit in the remaining bytes.
    #[inline]
    pub fn read_pod<T: Pod>(&mut self) -> WireResult<T> {
        let bytes = self.read_bytes(std::mem::size_of::<T>())?;
        Ok(bytemuck::pod_read_unaligned(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_little_endian_layout() {
        let mut writer = PacketWriter::new();
        writer.write_u8(0xAB).unwrap();
        writer.write_i16(-1).unwrap();
        writer.write_u32(0x0102_0304).unwrap();
        assert_eq!(writer.as_slice(), &[0xAB, 0xFF, 0xFF, 0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn test_reader_truncation() {
        let mut reader = PacketReader::new(&[1, 2, 3]);
        assert_eq!(reader.read_u16().unwrap(), 0x0201);
        assert_eq!(
            reader.read_u32(),
            Err(WireError::Truncated { needed: 4, remaining: 1 })
        );
    }

    #[test]
    fn test_pod_blob() {
        let blob = [7u8; 32];
        let mut writer = PacketWriter::new();
        writer.write_pod(&blob).unwrap();

        let mut reader = PacketReader::new(writer.as_slice());
        let back: [u8; 32] = reader.read_pod().unwrap();
        assert_eq!(back, blob);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_writer_overflow() {
        let mut writer = PacketWriter::new();
        writer.write_bytes(&[0u8; MAX_DATAGRAM_SIZE]).unwrap();
        assert!(matches!(writer.write_u8(1), Err(WireError::BufferFull { .. })));
    }
}

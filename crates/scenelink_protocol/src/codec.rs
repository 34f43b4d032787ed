//! # Binary Codec
//!
//! Growable writer and borrowed reader for every scenelink wire format.
//!
//! ## Layout rules
//!
//! - Scalars are little-endian.
//! - `Pod` aggregates (`Vec3`, `Quat`, `Color`, the package header) are
//!   copied byte for byte. Big-endian targets are rejected at compile time,
//!   so this is the same as writing each field little-endian.
//! - Byte strings and arrays carry a `u32` element count prefix. Writing a
//!   longer field is [`ProtocolError::LengthOverflow`], never a silent cut.
//!
//! A short buffer is always [`DecodeError::Truncated`]; a reader never
//! returns a partial value.

use bytemuck::{bytes_of, Pod};

use crate::error::{DecodeError, ProtocolError};

#[cfg(target_endian = "big")]
compile_error!("scenelink wire formats assume a little-endian target");

/// Byte writer backed by a `Vec<u8>`.
#[derive(Debug, Default, Clone)]
pub struct ByteWriter {
    buffer: Vec<u8>,
}

impl ByteWriter {
    /// Creates an empty writer.
    #[must_use]
    pub const fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Creates a writer with preallocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self { buffer: Vec::with_capacity(capacity) }
    }

    /// Clears the writer for reuse, keeping the allocation.
    #[inline]
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Returns the number of bytes written.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if no bytes have been written.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Returns a slice of the written data.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Consumes the writer, returning the buffer.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Writes a single byte.
    #[inline]
    pub fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    /// Writes a bool as one byte (0 or 1).
    #[inline]
    pub fn write_bool(&mut self, value: bool) {
        self.buffer.push(u8::from(value));
    }

    /// Writes a u16 in little-endian format.
    #[inline]
    pub fn write_u16(&mut self, value: u16) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes a u32 in little-endian format.
    #[inline]
    pub fn write_u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes an i32 in little-endian format.
    #[inline]
    pub fn write_i32(&mut self, value: i32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes a f32 in little-endian format.
    #[inline]
    pub fn write_f32(&mut self, value: f32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes a Pod type directly.
    #[inline]
    pub fn write_pod<T: Pod>(&mut self, value: &T) {
        self.buffer.extend_from_slice(bytes_of(value));
    }

    /// Appends bytes with no prefix.
    #[inline]
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Writes a `u32` length followed by the bytes.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::LengthOverflow`]; nothing is written.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), ProtocolError> {
        self.write_u32(len_prefix(bytes.len())?);
        self.buffer.extend_from_slice(bytes);
        Ok(())
    }

    /// Writes a `u32` element count followed by the floats.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::LengthOverflow`]; nothing is written.
    pub fn write_f32_array(&mut self, values: &[f32]) -> Result<(), ProtocolError> {
        self.write_u32(len_prefix(values.len())?);
        self.buffer.reserve(values.len() * 4);
        for &v in values {
            self.write_f32(v);
        }
        Ok(())
    }

    /// Writes a `u32` element count followed by the integers.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::LengthOverflow`]; nothing is written.
    pub fn write_i32_array(&mut self, values: &[i32]) -> Result<(), ProtocolError> {
        self.write_u32(len_prefix(values.len())?);
        self.buffer.reserve(values.len() * 4);
        for &v in values {
            self.write_i32(v);
        }
        Ok(())
    }
}

fn len_prefix(len: usize) -> Result<u32, ProtocolError> {
    u32::try_from(len).map_err(|_| ProtocolError::LengthOverflow(len))
}

/// Cursor over a borrowed byte buffer.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    /// Creates a reader at the start of `buffer`.
    #[must_use]
    pub const fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, position: 0 }
    }

    /// Current read offset.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Bytes not yet consumed.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buffer.len() - self.position
    }

    /// True once every byte has been consumed.
    #[inline]
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.position == self.buffer.len()
    }

    /// Borrows the next `len` bytes and advances past them.
    pub fn read_raw(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if len > self.remaining() {
            return Err(DecodeError::Truncated {
                offset: self.position,
                needed: len,
                available: self.remaining(),
            });
        }
        let slice = &self.buffer[self.position..self.position + len];
        self.position += len;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_raw(N)?);
        Ok(out)
    }

    /// Reads a single byte.
    #[inline]
    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Reads a bool; any byte other than 0 or 1 is rejected.
    pub fn read_bool(&mut self) -> Result<bool, DecodeError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(DecodeError::InvalidValue { field: "bool", value: i64::from(other) }),
        }
    }

    /// Reads a little-endian u16.
    #[inline]
    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        self.read_array().map(u16::from_le_bytes)
    }

    /// Reads a little-endian u32.
    #[inline]
    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        self.read_array().map(u32::from_le_bytes)
    }

    /// Reads a little-endian i32.
    #[inline]
    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        self.read_array().map(i32::from_le_bytes)
    }

    /// Reads a little-endian f32.
    #[inline]
    pub fn read_f32(&mut self) -> Result<f32, DecodeError> {
        self.read_array().map(f32::from_le_bytes)
    }

    /// Reads a Pod type directly.
    pub fn read_pod<T: Pod>(&mut self) -> Result<T, DecodeError> {
        let slice = self.read_raw(std::mem::size_of::<T>())?;
        Ok(bytemuck::pod_read_unaligned(slice))
    }

    /// Reads a `u32` count, checking `count * element_size` fits the buffer
    /// before anything is allocated.
    fn read_count(&mut self, element_size: usize) -> Result<usize, DecodeError> {
        let start = self.position;
        let count = self.read_u32()? as usize;
        let needed = count.saturating_mul(element_size);
        if needed > self.remaining() {
            return Err(DecodeError::Truncated {
                offset: start,
                needed,
                available: self.remaining(),
            });
        }
        Ok(count)
    }

    /// Reads a length-prefixed byte string.
    pub fn read_bytes(&mut self) -> Result<Vec<u8>, DecodeError> {
        let len = self.read_count(1)?;
        Ok(self.read_raw(len)?.to_vec())
    }

    /// Reads a count-prefixed float array.
    pub fn read_f32_array(&mut self) -> Result<Vec<f32>, DecodeError> {
        let count = self.read_count(4)?;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.read_f32()?);
        }
        Ok(values)
    }

    /// Reads a count-prefixed integer array.
    pub fn read_i32_array(&mut self) -> Result<Vec<i32>, DecodeError> {
        let count = self.read_count(4)?;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.read_i32()?);
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenelink_shared::{Quat, Vec3};

    #[test]
    fn test_scalar_layout_is_little_endian() {
        let mut w = ByteWriter::new();
        w.write_u16(0x0102);
        w.write_i32(-2);
        w.write_f32(1.5);
        assert_eq!(&w.as_slice()[..2], &[0x02, 0x01]);
        assert_eq!(&w.as_slice()[2..6], &[0xFE, 0xFF, 0xFF, 0xFF]);
        assert_eq!(&w.as_slice()[6..], &1.5f32.to_le_bytes());
    }

    #[test]
    fn test_mixed_sequence() {
        let mut w = ByteWriter::new();
        w.write_u8(7);
        w.write_bool(true);
        w.write_bytes(b"Cube").unwrap();
        w.write_f32_array(&[1.0, -0.0, f32::MAX]).unwrap();
        w.write_i32_array(&[-1, 0, 42]).unwrap();
        w.write_pod(&Vec3::new(1.0, 2.0, 3.0));
        w.write_pod(&Quat::IDENTITY);

        let bytes = w.into_bytes();
        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.read_u8().unwrap(), 7);
        assert!(r.read_bool().unwrap());
        assert_eq!(r.read_bytes().unwrap(), b"Cube");
        let floats = r.read_f32_array().unwrap();
        assert_eq!(floats[1].to_bits(), (-0.0f32).to_bits());
        assert_eq!(floats[2], f32::MAX);
        assert_eq!(r.read_i32_array().unwrap(), vec![-1, 0, 42]);
        assert_eq!(r.read_pod::<Vec3>().unwrap(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(r.read_pod::<Quat>().unwrap(), Quat::IDENTITY);
        assert!(r.is_exhausted());
    }

    #[test]
    fn test_truncated_scalar() {
        let mut r = ByteReader::new(&[1, 2, 3]);
        assert_eq!(
            r.read_u32(),
            Err(DecodeError::Truncated { offset: 0, needed: 4, available: 3 })
        );
        // Failed reads do not advance.
        assert_eq!(r.position(), 0);
    }

    #[test]
    fn test_oversized_count_rejected_before_allocation() {
        let mut w = ByteWriter::new();
        w.write_u32(u32::MAX);
        w.write_f32(1.0);
        let bytes = w.into_bytes();
        let mut r = ByteReader::new(&bytes);
        assert!(matches!(r.read_f32_array(), Err(DecodeError::Truncated { .. })));
    }

    #[test]
    fn test_empty_arrays() {
        let mut w = ByteWriter::new();
        w.write_f32_array(&[]).unwrap();
        w.write_i32_array(&[]).unwrap();
        w.write_bytes(&[]).unwrap();
        let bytes = w.into_bytes();
        assert_eq!(bytes.len(), 12);

        let mut r = ByteReader::new(&bytes);
        assert!(r.read_f32_array().unwrap().is_empty());
        assert!(r.read_i32_array().unwrap().is_empty());
        assert!(r.read_bytes().unwrap().is_empty());
    }

    #[test]
    fn test_length_prefix_limit() {
        assert_eq!(len_prefix(0), Ok(0));
        assert_eq!(len_prefix(u32::MAX as usize), Ok(u32::MAX));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_length_prefix_overflow_is_an_error() {
        let too_long = u32::MAX as usize + 1;
        assert_eq!(len_prefix(too_long), Err(ProtocolError::LengthOverflow(too_long)));
    }

    #[test]
    fn test_invalid_bool() {
        let mut r = ByteReader::new(&[2]);
        assert_eq!(r.read_bool(), Err(DecodeError::InvalidValue { field: "bool", value: 2 }));
    }
}

// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Growable CDR byte buffer with alignment origin and switchable byte order.
//!
//! One type serves both directions: machines write into it when encoding
//! and read from it when decoding. Alignment is always computed as
//! `(position - origin) % size`, never from absolute offset 0, because a
//! full sample aligns from just after the 4-byte encapsulation header while
//! a key aligns from offset 0.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::core::{CodecError, Endianness, Result};

/// Size of the CDR encapsulation header (4 bytes).
pub const CDR_HEADER_SIZE: usize = 4;

/// Default initial capacity for new buffers.
const DEFAULT_CAPACITY: usize = 64;

macro_rules! primitive_io {
    ($(#[$meta:meta])* $write:ident, $read:ident, $ty:ty, $width:expr, $put:ident, $get:ident) => {
        $(#[$meta])*
        pub fn $write(&mut self, value: $ty) {
            self.align($width);
            let endianness = self.endianness;
            let dst = self.claim($width);
            match endianness {
                Endianness::Big => BigEndian::$put(dst, value),
                Endianness::Little => LittleEndian::$put(dst, value),
            }
        }

        $(#[$meta])*
        pub fn $read(&mut self) -> Result<$ty> {
            self.align_read($width)?;
            let endianness = self.endianness;
            let src = self.take($width)?;
            Ok(match endianness {
                Endianness::Big => BigEndian::$get(src),
                Endianness::Little => LittleEndian::$get(src),
            })
        }
    };
}

/// Alignment-aware byte cursor over an owned, growable region.
///
/// Invariants:
/// - `pos <= data.len()` and `end <= data.len()`
/// - growth never moves or changes bytes that were already written
/// - after [`zero_out`](Self::zero_out) every byte is zero
#[derive(Debug, Clone)]
pub struct CdrBuffer {
    /// Backing storage; its length is the capacity
    data: Vec<u8>,
    /// Cursor
    pos: usize,
    /// Logical end (high-water mark of writes, or input length)
    end: usize,
    /// Alignment origin
    origin: usize,
    endianness: Endianness,
}

impl Default for CdrBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl CdrBuffer {
    /// Create an empty little-endian buffer with origin 0.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create an empty buffer with the given initial capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity.max(1)],
            pos: 0,
            end: 0,
            origin: 0,
            endianness: Endianness::default(),
        }
    }

    /// Wrap existing bytes for reading. The cursor starts at 0.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            data: bytes.to_vec(),
            pos: 0,
            end: bytes.len(),
            origin: 0,
            endianness: Endianness::default(),
        }
    }

    /// Current byte order.
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// Switch byte order for subsequent primitives. Written bytes are untouched.
    pub fn set_endianness(&mut self, endianness: Endianness) {
        self.endianness = endianness;
    }

    /// Current alignment origin.
    pub fn origin(&self) -> usize {
        self.origin
    }

    /// Set the offset alignment is computed from.
    pub fn set_origin(&mut self, origin: usize) {
        self.origin = origin;
    }

    /// Cursor position.
    #[inline]
    pub fn tell(&self) -> usize {
        self.pos
    }

    /// Move the cursor. Seeking past the end grows the buffer.
    pub fn seek(&mut self, pos: usize) {
        self.reserve_to(pos);
        self.pos = pos;
    }

    /// Number of logically valid bytes.
    pub fn len(&self) -> usize {
        self.end
    }

    /// Check if no bytes are logically valid.
    pub fn is_empty(&self) -> bool {
        self.end == 0
    }

    /// Bytes left to read before the logical end.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.end.saturating_sub(self.pos)
    }

    /// Allocated capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// The logically valid bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.end]
    }

    /// Consume the buffer and return the logically valid bytes.
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.data.truncate(self.end);
        self.data
    }

    /// Clear every byte and forget the logical end. The cursor is not moved.
    pub fn zero_out(&mut self) {
        self.data.fill(0);
        self.end = 0;
    }

    /// Prepare for reuse: zero content, cursor and origin back to 0.
    pub fn reset(&mut self) {
        self.zero_out();
        self.pos = 0;
        self.origin = 0;
    }

    /// Grow (at least doubling) so that `needed` bytes are addressable.
    fn reserve_to(&mut self, needed: usize) {
        if needed > self.data.len() {
            let grown = needed.max(self.data.len() * 2);
            self.data.resize(grown, 0);
        }
    }

    /// Hand out the next `count` bytes for writing and advance.
    fn claim(&mut self, count: usize) -> &mut [u8] {
        let start = self.pos;
        self.reserve_to(start + count);
        self.pos += count;
        self.end = self.end.max(self.pos);
        &mut self.data[start..self.pos]
    }

    /// Hand out the next `count` readable bytes and advance.
    fn take(&mut self, count: usize) -> Result<&[u8]> {
        if count > self.remaining() {
            return Err(CodecError::buffer_too_short(
                count,
                self.remaining(),
                self.pos as u64,
            ));
        }
        let start = self.pos;
        self.pos += count;
        Ok(&self.data[start..self.pos])
    }

    fn padding_for(&self, size: usize) -> usize {
        if size <= 1 {
            return 0;
        }
        let misalignment = self.pos.saturating_sub(self.origin) % size;
        if misalignment == 0 {
            0
        } else {
            size - misalignment
        }
    }

    /// Align for writing: pad with zero bytes up to the next multiple of
    /// `size` relative to the origin.
    pub fn align(&mut self, size: usize) {
        let padding = self.padding_for(size);
        if padding > 0 {
            self.claim(padding).fill(0);
        }
    }

    /// Align for reading: skip padding, failing if it runs past the end.
    pub fn align_read(&mut self, size: usize) -> Result<()> {
        let padding = self.padding_for(size);
        if padding > 0 {
            self.take(padding)?;
        }
        Ok(())
    }

    /// Write raw bytes without alignment.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.claim(bytes.len()).copy_from_slice(bytes);
    }

    /// Read `count` raw bytes without alignment.
    pub fn read_bytes(&mut self, count: usize) -> Result<&[u8]> {
        self.take(count)
    }

    /// Write an 8-bit unsigned integer.
    pub fn write_u8(&mut self, value: u8) {
        self.claim(1)[0] = value;
    }

    /// Read an 8-bit unsigned integer.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    /// Write an 8-bit signed integer.
    pub fn write_i8(&mut self, value: i8) {
        self.write_u8(value as u8);
    }

    /// Read an 8-bit signed integer.
    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    primitive_io!(
        /// 16-bit unsigned integer, 2-byte aligned.
        write_u16, read_u16, u16, 2, write_u16, read_u16
    );
    primitive_io!(
        /// 16-bit signed integer, 2-byte aligned.
        write_i16, read_i16, i16, 2, write_i16, read_i16
    );
    primitive_io!(
        /// 32-bit unsigned integer, 4-byte aligned.
        write_u32, read_u32, u32, 4, write_u32, read_u32
    );
    primitive_io!(
        /// 32-bit signed integer, 4-byte aligned.
        write_i32, read_i32, i32, 4, write_i32, read_i32
    );
    primitive_io!(
        /// 64-bit unsigned integer, 8-byte aligned.
        write_u64, read_u64, u64, 8, write_u64, read_u64
    );
    primitive_io!(
        /// 64-bit signed integer, 8-byte aligned.
        write_i64, read_i64, i64, 8, write_i64, read_i64
    );
    primitive_io!(
        /// 32-bit float, 4-byte aligned.
        write_f32, read_f32, f32, 4, write_f32, read_f32
    );
    primitive_io!(
        /// 64-bit float, 8-byte aligned.
        write_f64, read_f64, f64, 8, write_f64, read_f64
    );
}

use bytes::{Buf, Bytes};

use crate::builder::{AccessMode, DataOrder, DataTransformation, DataType, BIT_MASKS, STRING_TERMINATOR};
use crate::error::ProtocolError;

/// Reads values back out of a frame payload.
///
/// Payloads come from the network, so running past the end is reported as
/// [`ProtocolError::Underflow`] rather than panicking.
#[derive(Debug, Clone)]
pub struct FrameReader {
    buffer: Bytes,
    length: usize,
    mode: AccessMode,
    bit_index: usize,
}

impl FrameReader {
    pub fn new(buffer: Bytes) -> Self {
        Self {
            length: buffer.len(),
            buffer,
            mode: AccessMode::Byte,
            bit_index: 0,
        }
    }

    /// Length of the whole payload, independent of how much has been read.
    pub fn length(&self) -> usize {
        self.length
    }

    pub fn remaining(&self) -> usize {
        self.buffer.remaining()
    }

    pub fn get_unsigned(&mut self, ty: DataType) -> Result<u64, ProtocolError> {
        self.get_with(ty, DataOrder::Big, DataTransformation::None)
    }

    pub fn get_unsigned_with(
        &mut self,
        ty: DataType,
        order: DataOrder,
        transformation: DataTransformation,
    ) -> Result<u64, ProtocolError> {
        self.get_with(ty, order, transformation)
    }

    pub fn get_signed(&mut self, ty: DataType) -> Result<i64, ProtocolError> {
        self.get_signed_with(ty, DataOrder::Big, DataTransformation::None)
    }

    pub fn get_signed_with(
        &mut self,
        ty: DataType,
        order: DataOrder,
        transformation: DataTransformation,
    ) -> Result<i64, ProtocolError> {
        let raw = self.get_with(ty, order, transformation)?;
        let bits = ty.bytes() * 8;
        if bits == 64 {
            return Ok(raw as i64);
        }
        let shift = 64 - bits;
        Ok(((raw << shift) as i64) >> shift)
    }

    fn get_with(
        &mut self,
        ty: DataType,
        order: DataOrder,
        transformation: DataTransformation,
    ) -> Result<u64, ProtocolError> {
        assert_eq!(self.mode, AccessMode::Byte, "byte read in bit access");
        let length = ty.bytes();
        self.ensure(length)?;

        let mut value = 0u64;
        let mut read_byte = |buffer: &mut Bytes, i: usize| {
            let byte = buffer.get_u8();
            let byte = if i == 0 { transformation.revert(byte) } else { byte };
            value |= (byte as u64) << (i * 8);
        };

        match order {
            DataOrder::Big => {
                for i in (0..length).rev() {
                    read_byte(&mut self.buffer, i);
                }
            }
            DataOrder::Little => {
                for i in 0..length {
                    read_byte(&mut self.buffer, i);
                }
            }
            DataOrder::Middle | DataOrder::InversedMiddle => {
                assert_eq!(ty, DataType::Int, "{order:?} order is only defined for ints");
                let layout = if order == DataOrder::Middle {
                    [1, 0, 3, 2]
                } else {
                    [2, 3, 0, 1]
                };
                for i in layout {
                    value |= (self.buffer.get_u8() as u64) << (i * 8);
                }
            }
        }
        Ok(value)
    }

    pub fn switch_to_bit_access(&mut self) {
        assert_eq!(self.mode, AccessMode::Byte, "already in bit access");
        self.bit_index = (self.length - self.buffer.remaining()) * 8;
        self.mode = AccessMode::Bit;
    }

    pub fn switch_to_byte_access(&mut self) {
        assert_eq!(self.mode, AccessMode::Bit, "already in byte access");
        let consumed = self.length - self.buffer.remaining();
        let target = self.bit_index.div_ceil(8).min(self.length);
        self.buffer.advance(target.saturating_sub(consumed));
        self.mode = AccessMode::Byte;
    }

    pub fn get_bits(&mut self, amount: usize) -> Result<u32, ProtocolError> {
        assert!((1..=32).contains(&amount), "bit count {amount} outside 1..=32");
        assert_eq!(self.mode, AccessMode::Bit, "bit read in byte access");

        let consumed = self.length - self.buffer.remaining();
        let end = self.bit_index + amount;
        if end.div_ceil(8) > self.length {
            return Err(ProtocolError::Underflow {
                requested: end.div_ceil(8) - consumed,
                remaining: self.buffer.remaining(),
            });
        }

        let data = &self.buffer[..];
        let byte = |pos: usize| data[pos - consumed] as u32;

        let mut amount = amount;
        let mut byte_pos = self.bit_index >> 3;
        let mut bit_offset = 8 - (self.bit_index & 7);
        let mut value = 0u32;
        self.bit_index = end;

        while amount > bit_offset {
            value = value.wrapping_add((byte(byte_pos) & BIT_MASKS[bit_offset]) << (amount - bit_offset));
            byte_pos += 1;
            amount -= bit_offset;
            bit_offset = 8;
        }
        if amount == bit_offset {
            value = value.wrapping_add(byte(byte_pos) & BIT_MASKS[bit_offset]);
        } else {
            value = value.wrapping_add((byte(byte_pos) >> (bit_offset - amount)) & BIT_MASKS[amount]);
        }
        Ok(value)
    }

    pub fn get_bytes(&mut self, transformation: DataTransformation, len: usize) -> Result<Vec<u8>, ProtocolError> {
        self.ensure(len)?;
        Ok((0..len)
            .map(|_| transformation.revert(self.buffer.get_u8()))
            .collect())
    }

    /// Reads `len` bytes that were written last-to-first.
    pub fn get_bytes_reverse(
        &mut self,
        transformation: DataTransformation,
        len: usize,
    ) -> Result<Vec<u8>, ProtocolError> {
        let mut bytes = self.get_bytes(transformation, len)?;
        bytes.reverse();
        Ok(bytes)
    }

    /// Reads a newline-terminated string.
    pub fn get_string(&mut self) -> Result<String, ProtocolError> {
        assert_eq!(self.mode, AccessMode::Byte, "string read in bit access");
        let end = self
            .buffer
            .iter()
            .position(|&b| b == STRING_TERMINATOR)
            .ok_or_else(|| ProtocolError::malformed("string", "missing terminator"))?;
        let text = String::from_utf8_lossy(&self.buffer[..end]).into_owned();
        self.buffer.advance(end + 1);
        Ok(text)
    }

    /// Discards `len` bytes.
    pub fn skip(&mut self, len: usize) -> Result<(), ProtocolError> {
        self.ensure(len)?;
        self.buffer.advance(len);
        Ok(())
    }

    fn ensure(&self, requested: usize) -> Result<(), ProtocolError> {
        if self.buffer.remaining() < requested {
            return Err(ProtocolError::Underflow {
                requested,
                remaining: self.buffer.remaining(),
            });
        }
        Ok(())
    }
}

use bytes::{BufMut, BytesMut};

use crate::error::ProtocolError;
use crate::frame::Frame;
use crate::metadata::FrameMetadata;

pub(crate) const BIT_MASKS: [u32; 33] = {
    let mut masks = [0u32; 33];
    let mut i = 1;
    while i < 33 {
        masks[i] = if i == 32 { u32::MAX } else { (1 << i) - 1 };
        i += 1;
    }
    masks
};

/// Terminator of the newline-delimited strings used on the wire.
pub const STRING_TERMINATOR: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Byte,
    Short,
    TriByte,
    Int,
    Long,
}

impl DataType {
    pub fn bytes(self) -> usize {
        match self {
            Self::Byte => 1,
            Self::Short => 2,
            Self::TriByte => 3,
            Self::Int => 4,
            Self::Long => 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataOrder {
    Big,
    Little,
    /// `[b1, b0, b3, b2]`, ints only.
    Middle,
    /// `[b2, b3, b0, b1]`, ints only.
    InversedMiddle,
}

/// Transformation applied to the least significant byte of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataTransformation {
    None,
    /// `v + 128`
    Add,
    /// `128 - v`
    Subtract,
    /// `-v`
    Negate,
}

impl DataTransformation {
    pub(crate) fn apply(self, value: i64) -> u8 {
        match self {
            Self::None => value as u8,
            Self::Add => value.wrapping_add(128) as u8,
            Self::Subtract => 128i64.wrapping_sub(value) as u8,
            Self::Negate => value.wrapping_neg() as u8,
        }
    }

    pub(crate) fn revert(self, byte: u8) -> u8 {
        match self {
            Self::None => byte,
            Self::Add => byte.wrapping_sub(128),
            Self::Subtract => 128u8.wrapping_sub(byte),
            Self::Negate => byte.wrapping_neg(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Byte,
    Bit,
}

/// Accumulates a frame payload one value or one bit field at a time.
///
/// Typed writes require [`AccessMode::Byte`] and bit writes require
/// [`AccessMode::Bit`]; calling either in the wrong mode is a programming
/// error and panics.
#[derive(Debug, Clone)]
pub struct FrameBuilder {
    buffer: BytesMut,
    mode: AccessMode,
    bit_index: usize,
}

impl FrameBuilder {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
            mode: AccessMode::Byte,
            bit_index: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            ..Self::new()
        }
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Payload length in bytes. Only meaningful in byte access.
    pub fn len(&self) -> usize {
        self.check_byte_access();
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn switch_to_bit_access(&mut self) {
        assert_eq!(self.mode, AccessMode::Byte, "already in bit access");
        self.bit_index = self.buffer.len() * 8;
        self.mode = AccessMode::Bit;
    }

    pub fn switch_to_byte_access(&mut self) {
        assert_eq!(self.mode, AccessMode::Bit, "already in byte access");
        self.buffer.resize(self.bit_index.div_ceil(8), 0);
        self.mode = AccessMode::Byte;
    }

    pub fn put(&mut self, ty: DataType, value: i64) {
        self.put_with(ty, DataOrder::Big, DataTransformation::None, value);
    }

    pub fn put_transformed(&mut self, ty: DataType, transformation: DataTransformation, value: i64) {
        self.put_with(ty, DataOrder::Big, transformation, value);
    }

    pub fn put_ordered(&mut self, ty: DataType, order: DataOrder, value: i64) {
        self.put_with(ty, order, DataTransformation::None, value);
    }

    pub fn put_with(
        &mut self,
        ty: DataType,
        order: DataOrder,
        transformation: DataTransformation,
        value: i64,
    ) {
        self.check_byte_access();
        let length = ty.bytes();
        let byte_at = |i: usize| -> u8 {
            if i == 0 {
                transformation.apply(value)
            } else {
                (value >> (i * 8)) as u8
            }
        };

        match order {
            DataOrder::Big => {
                for i in (0..length).rev() {
                    self.buffer.put_u8(byte_at(i));
                }
            }
            DataOrder::Little => {
                for i in 0..length {
                    self.buffer.put_u8(byte_at(i));
                }
            }
            DataOrder::Middle | DataOrder::InversedMiddle => {
                assert_eq!(ty, DataType::Int, "{order:?} order is only defined for ints");
                assert_eq!(
                    transformation,
                    DataTransformation::None,
                    "{order:?} order cannot be transformed"
                );
                let layout = if order == DataOrder::Middle {
                    [1, 0, 3, 2]
                } else {
                    [2, 3, 0, 1]
                };
                for i in layout {
                    self.buffer.put_u8((value >> (i * 8)) as u8);
                }
            }
        }
    }

    /// Writes the low `amount` bits of `value`, most significant bit first.
    pub fn put_bits(&mut self, amount: usize, value: u32) {
        assert!((1..=32).contains(&amount), "bit count {amount} outside 1..=32");
        assert_eq!(self.mode, AccessMode::Bit, "bit write in byte access");

        let mut amount = amount;
        let mut byte_pos = self.bit_index >> 3;
        let mut bit_offset = 8 - (self.bit_index & 7);
        self.bit_index += amount;

        let required = self.bit_index.div_ceil(8);
        if self.buffer.len() < required {
            self.buffer.resize(required, 0);
        }

        while amount > bit_offset {
            let mut byte = self.buffer[byte_pos] as u32;
            byte &= !BIT_MASKS[bit_offset];
            byte |= (value >> (amount - bit_offset)) & BIT_MASKS[bit_offset];
            self.buffer[byte_pos] = byte as u8;
            byte_pos += 1;
            amount -= bit_offset;
            bit_offset = 8;
        }

        let mut byte = self.buffer[byte_pos] as u32;
        if amount == bit_offset {
            byte &= !BIT_MASKS[bit_offset];
            byte |= value & BIT_MASKS[bit_offset];
        } else {
            let shift = bit_offset - amount;
            byte &= !(BIT_MASKS[amount] << shift);
            byte |= (value & BIT_MASKS[amount]) << shift;
        }
        self.buffer[byte_pos] = byte as u8;
    }

    pub fn put_bit(&mut self, flag: bool) {
        self.put_bits(1, flag as u32);
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.check_byte_access();
        self.buffer.put_slice(bytes);
    }

    pub fn put_bytes_transformed(&mut self, transformation: DataTransformation, bytes: &[u8]) {
        self.check_byte_access();
        for &b in bytes {
            self.buffer.put_u8(transformation.apply(b as i8 as i64));
        }
    }

    pub fn put_bytes_reverse(&mut self, transformation: DataTransformation, bytes: &[u8]) {
        self.check_byte_access();
        for &b in bytes.iter().rev() {
            self.buffer.put_u8(transformation.apply(b as i8 as i64));
        }
    }

    /// Appends the byte payload of another builder.
    pub fn put_builder(&mut self, other: &FrameBuilder) {
        other.check_byte_access();
        self.put_bytes(&other.buffer);
    }

    /// Writes a newline-terminated string.
    pub fn put_string(&mut self, value: &str) {
        self.check_byte_access();
        self.buffer.put_slice(value.as_bytes());
        self.buffer.put_u8(STRING_TERMINATOR);
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.check_byte_access();
        &self.buffer
    }

    pub fn build(self, metadata: FrameMetadata) -> Result<Frame, ProtocolError> {
        self.check_byte_access();
        Frame::new(metadata, self.buffer.freeze())
    }

    fn check_byte_access(&self) {
        assert_eq!(self.mode, AccessMode::Byte, "byte operation in bit access");
    }
}

impl Default for FrameBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn big_and_little_endian_shorts() {
        let mut b = FrameBuilder::new();
        b.put(DataType::Short, 0x1234);
        b.put_ordered(DataType::Short, DataOrder::Little, 0x1234);
        assert_eq!(b.as_bytes(), &[0x12, 0x34, 0x34, 0x12]);
    }

    #[test]
    fn transformations_touch_only_low_byte() {
        let mut b = FrameBuilder::new();
        b.put_transformed(DataType::Byte, DataTransformation::Add, 1);
        b.put_transformed(DataType::Byte, DataTransformation::Subtract, 1);
        b.put_transformed(DataType::Byte, DataTransformation::Negate, 1);
        b.put_with(
            DataType::Short,
            DataOrder::Little,
            DataTransformation::Add,
            0x0102,
        );
        assert_eq!(b.as_bytes(), &[129, 127, 255, 0x82, 0x01]);
    }

    #[test]
    fn middle_orders() {
        let mut b = FrameBuilder::new();
        b.put_ordered(DataType::Int, DataOrder::Middle, 0x0A0B0C0D);
        b.put_ordered(DataType::Int, DataOrder::InversedMiddle, 0x0A0B0C0D);
        assert_eq!(
            b.as_bytes(),
            &[0x0C, 0x0D, 0x0A, 0x0B, 0x0B, 0x0A, 0x0D, 0x0C]
        );
    }

    #[test]
    fn bits_pack_msb_first() {
        let mut b = FrameBuilder::new();
        b.switch_to_bit_access();
        b.put_bits(1, 1);
        b.put_bits(2, 3);
        b.put_bits(7, 0b101_0101);
        b.switch_to_byte_access();
        assert_eq!(b.as_bytes(), &[0b1111_0101, 0b0100_0000]);
    }

    #[test]
    fn bit_field_spanning_many_bytes() {
        let mut b = FrameBuilder::new();
        b.switch_to_bit_access();
        b.put_bits(4, 0);
        b.put_bits(32, 0xDEAD_BEEF);
        b.put_bits(4, 0xF);
        b.switch_to_byte_access();
        assert_eq!(b.as_bytes(), &[0x0D, 0xEA, 0xDB, 0xEE, 0xFF]);
    }

    #[test]
    fn bytes_follow_bit_section_on_boundary() {
        let mut b = FrameBuilder::new();
        b.put(DataType::Byte, 7);
        b.switch_to_bit_access();
        b.put_bits(3, 0b111);
        b.switch_to_byte_access();
        b.put(DataType::Byte, 9);
        assert_eq!(b.as_bytes(), &[7, 0b1110_0000, 9]);
    }

    #[test]
    fn reversed_bytes_with_add() {
        let mut b = FrameBuilder::new();
        b.put_bytes_reverse(DataTransformation::Add, &[1, 2, 3]);
        assert_eq!(b.as_bytes(), &[131, 130, 129]);
    }

    #[test]
    fn strings_end_with_newline() {
        let mut b = FrameBuilder::new();
        b.put_string("hi");
        assert_eq!(b.as_bytes(), b"hi\n");
    }

    #[test]
    #[should_panic]
    fn byte_write_in_bit_mode_panics() {
        let mut b = FrameBuilder::new();
        b.switch_to_bit_access();
        b.put(DataType::Byte, 1);
    }

    #[test]
    fn build_checks_metadata() {
        let mut b = FrameBuilder::new();
        b.put(DataType::Int, 1);
        assert!(b.clone().build(FrameMetadata::fixed(1, 4)).is_ok());
        assert!(b.build(FrameMetadata::fixed(1, 3)).is_err());
    }
}

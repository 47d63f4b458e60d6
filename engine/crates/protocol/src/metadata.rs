/// Length class of a frame as declared by its metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameLength {
    Fixed(usize),
    /// One length byte follows the opcode.
    VariableByte,
    /// Two big-endian length bytes follow the opcode.
    VariableShort,
}

impl FrameLength {
    pub const VARIABLE_BYTE: i32 = -1;
    pub const VARIABLE_SHORT: i32 = -2;

    /// Parses the signed wire-table representation (`n >= 0`, `-1`, `-2`).
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            Self::VARIABLE_BYTE => Some(Self::VariableByte),
            Self::VARIABLE_SHORT => Some(Self::VariableShort),
            n if n >= 0 => Some(Self::Fixed(n as usize)),
            _ => None,
        }
    }

    pub fn to_raw(self) -> i32 {
        match self {
            Self::Fixed(n) => n as i32,
            Self::VariableByte => Self::VARIABLE_BYTE,
            Self::VariableShort => Self::VARIABLE_SHORT,
        }
    }

    /// Number of length bytes written after the opcode.
    pub fn header_size(self) -> usize {
        match self {
            Self::Fixed(_) => 0,
            Self::VariableByte => 1,
            Self::VariableShort => 2,
        }
    }

    /// Largest payload this length class can describe.
    pub fn max_payload(self) -> usize {
        match self {
            Self::Fixed(n) => n,
            Self::VariableByte => u8::MAX as usize,
            Self::VariableShort => u16::MAX as usize,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameMetadata {
    pub opcode: u8,
    pub length: FrameLength,
    /// Headless frames are written as their bare payload, without opcode or length.
    pub headless: bool,
}

impl FrameMetadata {
    pub const fn new(opcode: u8, length: FrameLength) -> Self {
        Self {
            opcode,
            length,
            headless: false,
        }
    }

    pub const fn fixed(opcode: u8, length: usize) -> Self {
        Self::new(opcode, FrameLength::Fixed(length))
    }

    pub const fn variable_byte(opcode: u8) -> Self {
        Self::new(opcode, FrameLength::VariableByte)
    }

    pub const fn variable_short(opcode: u8) -> Self {
        Self::new(opcode, FrameLength::VariableShort)
    }

    pub const fn headless(mut self) -> Self {
        self.headless = true;
        self
    }
}

/// Opcode tables for both directions of a connection phase.
#[derive(Debug, Clone)]
pub struct FrameMetadataSet {
    inbound: [Option<FrameMetadata>; 256],
    outbound: [Option<FrameMetadata>; 256],
}

impl FrameMetadataSet {
    pub fn new() -> Self {
        Self {
            inbound: [None; 256],
            outbound: [None; 256],
        }
    }

    /// Registers metadata for frames sent by the client. A later registration
    /// for the same opcode replaces the earlier one.
    pub fn register_inbound(&mut self, metadata: FrameMetadata) {
        self.inbound[metadata.opcode as usize] = Some(metadata);
    }

    pub fn register_outbound(&mut self, metadata: FrameMetadata) {
        self.outbound[metadata.opcode as usize] = Some(metadata);
    }

    pub fn inbound(&self, opcode: u8) -> Option<FrameMetadata> {
        self.inbound[opcode as usize]
    }

    pub fn outbound(&self, opcode: u8) -> Option<FrameMetadata> {
        self.outbound[opcode as usize]
    }

    pub fn inbound_count(&self) -> usize {
        self.inbound.iter().flatten().count()
    }
}

impl Default for FrameMetadataSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_length_markers() {
        assert_eq!(FrameLength::from_raw(-1), Some(FrameLength::VariableByte));
        assert_eq!(FrameLength::from_raw(-2), Some(FrameLength::VariableShort));
        assert_eq!(FrameLength::from_raw(6), Some(FrameLength::Fixed(6)));
        assert_eq!(FrameLength::from_raw(-3), None);
        assert_eq!(FrameLength::VariableShort.to_raw(), -2);
    }

    #[test]
    fn header_sizes_and_capacity() {
        assert_eq!(FrameLength::Fixed(4).header_size(), 0);
        assert_eq!(FrameLength::VariableByte.header_size(), 1);
        assert_eq!(FrameLength::VariableShort.header_size(), 2);
        assert_eq!(FrameLength::VariableByte.max_payload(), 255);
        assert_eq!(FrameLength::VariableShort.max_payload(), 65_535);
    }

    #[test]
    fn directions_are_independent() {
        let mut set = FrameMetadataSet::new();
        set.register_inbound(FrameMetadata::fixed(4, 2));
        set.register_outbound(FrameMetadata::variable_short(4));
        assert_eq!(set.inbound(4).unwrap().length, FrameLength::Fixed(2));
        assert_eq!(set.outbound(4).unwrap().length, FrameLength::VariableShort);
        assert!(set.inbound(5).is_none());
        assert_eq!(set.inbound_count(), 1);
    }
}

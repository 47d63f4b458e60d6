use crate::metadata::FrameLength;

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("unknown opcode {0}")]
    UnknownOpcode(u8),

    #[error("frame {opcode} truncated: needed {needed} bytes, {available} available")]
    Truncated {
        opcode: u8,
        needed: usize,
        available: usize,
    },

    #[error("payload of {len} bytes does not fit {length:?} for opcode {opcode}")]
    PayloadTooLarge {
        opcode: u8,
        len: usize,
        length: FrameLength,
    },

    #[error("frame {opcode} expects {expected} payload bytes, got {actual}")]
    LengthMismatch {
        opcode: u8,
        expected: usize,
        actual: usize,
    },

    #[error("read of {requested} bytes past end of frame ({remaining} remaining)")]
    Underflow { requested: usize, remaining: usize },

    #[error("invalid name: {0:?}")]
    InvalidName(String),

    #[error("malformed {message}: {reason}")]
    Malformed {
        message: &'static str,
        reason: String,
    },
}

impl ProtocolError {
    pub fn malformed(message: &'static str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            message,
            reason: reason.into(),
        }
    }
}

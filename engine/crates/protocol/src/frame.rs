use bytes::Bytes;

use crate::error::ProtocolError;
use crate::metadata::{FrameLength, FrameMetadata};
use crate::reader::FrameReader;

/// One opcode-tagged protocol unit with a complete payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    metadata: FrameMetadata,
    payload: Bytes,
}

impl Frame {
    /// Builds a frame, checking the payload against the declared length class.
    pub fn new(metadata: FrameMetadata, payload: impl Into<Bytes>) -> Result<Self, ProtocolError> {
        let payload = payload.into();
        if !metadata.headless {
            match metadata.length {
                FrameLength::Fixed(expected) if payload.len() != expected => {
                    return Err(ProtocolError::LengthMismatch {
                        opcode: metadata.opcode,
                        expected,
                        actual: payload.len(),
                    });
                }
                length if payload.len() > length.max_payload() => {
                    return Err(ProtocolError::PayloadTooLarge {
                        opcode: metadata.opcode,
                        len: payload.len(),
                        length,
                    });
                }
                _ => {}
            }
        }
        Ok(Self { metadata, payload })
    }

    pub(crate) fn from_parts(metadata: FrameMetadata, payload: Bytes) -> Self {
        Self { metadata, payload }
    }

    pub fn metadata(&self) -> FrameMetadata {
        self.metadata
    }

    pub fn opcode(&self) -> u8 {
        self.metadata.opcode
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn reader(&self) -> FrameReader {
        FrameReader::new(self.payload.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_frame_rejects_wrong_length() {
        let err = Frame::new(FrameMetadata::fixed(3, 1), vec![1u8, 2]).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::LengthMismatch {
                opcode: 3,
                expected: 1,
                actual: 2
            }
        ));
    }

    #[test]
    fn variable_byte_frame_rejects_oversized_payload() {
        let err = Frame::new(FrameMetadata::variable_byte(4), vec![0u8; 256]).unwrap_err();
        assert!(matches!(err, ProtocolError::PayloadTooLarge { len: 256, .. }));
    }

    #[test]
    fn headless_frame_skips_length_checks() {
        let metadata = FrameMetadata::fixed(2, 1).headless();
        let frame = Frame::new(metadata, vec![2u8, 0, 0]).unwrap();
        assert_eq!(frame.len(), 3);
    }
}

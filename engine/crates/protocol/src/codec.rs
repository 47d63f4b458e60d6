use std::sync::Arc;

use bytes::{Buf, BufMut, BytesMut};

use crate::error::ProtocolError;
use crate::frame::Frame;
use crate::isaac::{IsaacPair, IsaacRandom};
use crate::metadata::{FrameLength, FrameMetadata, FrameMetadataSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    Opcode,
    Length(FrameMetadata),
    Payload(FrameMetadata, usize),
}

/// Splits an inbound byte stream into frames.
///
/// Only the opcode state may wait for more input. Once an opcode has been
/// consumed (and, when ciphered, a keystream value spent on it) a missing
/// length or payload leaves the stream desynchronized, so the decoder reports
/// [`ProtocolError::Truncated`] and the session must be dropped.
#[derive(Debug)]
pub struct FrameDecoder {
    state: DecodeState,
    metadata: Arc<FrameMetadataSet>,
    cipher: Option<IsaacRandom>,
}

impl FrameDecoder {
    pub fn new(metadata: Arc<FrameMetadataSet>) -> Self {
        Self {
            state: DecodeState::Opcode,
            metadata,
            cipher: None,
        }
    }

    pub fn with_cipher(metadata: Arc<FrameMetadataSet>, cipher: IsaacRandom) -> Self {
        Self {
            cipher: Some(cipher),
            ..Self::new(metadata)
        }
    }

    pub fn is_ciphered(&self) -> bool {
        self.cipher.is_some()
    }

    /// Decodes the next frame from `src`, consuming exactly the bytes it spans.
    pub fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, ProtocolError> {
        loop {
            match self.state {
                DecodeState::Opcode => {
                    if !src.has_remaining() {
                        return Ok(None);
                    }
                    let raw = src.get_u8();
                    let opcode = match self.cipher.as_mut() {
                        Some(cipher) => raw.wrapping_sub(cipher.next_u32() as u8),
                        None => raw,
                    };
                    let metadata = self
                        .metadata
                        .inbound(opcode)
                        .ok_or(ProtocolError::UnknownOpcode(opcode))?;

                    match metadata.length {
                        FrameLength::Fixed(0) => {
                            return Ok(Some(Frame::from_parts(metadata, Default::default())));
                        }
                        FrameLength::Fixed(n) => self.state = DecodeState::Payload(metadata, n),
                        _ => self.state = DecodeState::Length(metadata),
                    }
                }
                DecodeState::Length(metadata) => {
                    let needed = metadata.length.header_size();
                    if src.remaining() < needed {
                        self.state = DecodeState::Opcode;
                        return Err(ProtocolError::Truncated {
                            opcode: metadata.opcode,
                            needed,
                            available: src.remaining(),
                        });
                    }
                    let length = match metadata.length {
                        FrameLength::VariableShort => src.get_u16() as usize,
                        _ => src.get_u8() as usize,
                    };
                    if length == 0 {
                        self.state = DecodeState::Opcode;
                        return Ok(Some(Frame::from_parts(metadata, Default::default())));
                    }
                    self.state = DecodeState::Payload(metadata, length);
                }
                DecodeState::Payload(metadata, length) => {
                    self.state = DecodeState::Opcode;
                    if src.remaining() < length {
                        return Err(ProtocolError::Truncated {
                            opcode: metadata.opcode,
                            needed: length,
                            available: src.remaining(),
                        });
                    }
                    let payload = src.split_to(length).freeze();
                    return Ok(Some(Frame::from_parts(metadata, payload)));
                }
            }
        }
    }
}

/// Serializes outbound frames.
#[derive(Debug, Default)]
pub struct FrameEncoder {
    cipher: Option<IsaacRandom>,
}

impl FrameEncoder {
    pub fn new() -> Self {
        Self { cipher: None }
    }

    pub fn with_cipher(cipher: IsaacRandom) -> Self {
        Self {
            cipher: Some(cipher),
        }
    }

    pub fn encode(&mut self, frame: &Frame, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        let metadata = frame.metadata();
        let payload = frame.payload();
        if metadata.headless {
            dst.put_slice(payload);
            return Ok(());
        }

        let length = metadata.length;
        match length {
            FrameLength::Fixed(expected) if payload.len() != expected => {
                return Err(ProtocolError::LengthMismatch {
                    opcode: metadata.opcode,
                    expected,
                    actual: payload.len(),
                });
            }
            _ if payload.len() > length.max_payload() => {
                return Err(ProtocolError::PayloadTooLarge {
                    opcode: metadata.opcode,
                    len: payload.len(),
                    length,
                });
            }
            _ => {}
        }

        let opcode = match self.cipher.as_mut() {
            Some(cipher) => metadata.opcode.wrapping_add(cipher.next_u32() as u8),
            None => metadata.opcode,
        };

        dst.reserve(1 + length.header_size() + payload.len());
        dst.put_u8(opcode);
        match length {
            FrameLength::VariableByte => dst.put_u8(payload.len() as u8),
            FrameLength::VariableShort => dst.put_u16(payload.len() as u16),
            FrameLength::Fixed(_) => {}
        }
        dst.put_slice(payload);
        Ok(())
    }
}

/// The decoder and encoder owned by one connection.
#[derive(Debug)]
pub struct FrameCodec {
    pub decoder: FrameDecoder,
    pub encoder: FrameEncoder,
}

impl FrameCodec {
    pub fn new(metadata: Arc<FrameMetadataSet>) -> Self {
        Self {
            decoder: FrameDecoder::new(metadata),
            encoder: FrameEncoder::new(),
        }
    }

    /// Replaces the codec with a ciphered one reading from a new opcode table.
    pub fn upgrade(&mut self, metadata: Arc<FrameMetadataSet>, pair: IsaacPair) {
        self.decoder = FrameDecoder::with_cipher(metadata, pair.decoding);
        self.encoder = FrameEncoder::with_cipher(pair.encoding);
    }

    pub fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, ProtocolError> {
        self.decoder.decode(src)
    }

    pub fn encode(&mut self, frame: &Frame, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        self.encoder.encode(frame, dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> Arc<FrameMetadataSet> {
        let mut set = FrameMetadataSet::new();
        for md in [
            FrameMetadata::fixed(0, 0),
            FrameMetadata::fixed(3, 1),
            FrameMetadata::fixed(86, 4),
            FrameMetadata::variable_byte(4),
            FrameMetadata::variable_short(81),
        ] {
            set.register_inbound(md);
            set.register_outbound(md);
        }
        Arc::new(set)
    }

    fn frame(md: FrameMetadata, payload: &[u8]) -> Frame {
        Frame::new(md, payload.to_vec()).unwrap()
    }

    fn roundtrip(frames: &[Frame]) {
        let mut encoder = FrameEncoder::new();
        let mut decoder = FrameDecoder::new(metadata());
        let mut wire = BytesMut::new();
        for f in frames {
            encoder.encode(f, &mut wire).unwrap();
        }
        for f in frames {
            assert_eq!(decoder.decode(&mut wire).unwrap().as_ref(), Some(f));
        }
        assert!(decoder.decode(&mut wire).unwrap().is_none());
    }

    #[test]
    fn roundtrip_each_length_class() {
        roundtrip(&[
            frame(FrameMetadata::fixed(0, 0), &[]),
            frame(FrameMetadata::fixed(86, 4), &[1, 2, 3, 4]),
            frame(FrameMetadata::variable_byte(4), &[9; 200]),
            frame(FrameMetadata::variable_short(81), &vec![7; 3_000]),
            frame(FrameMetadata::fixed(3, 1), &[1]),
        ]);
    }

    #[test]
    fn variable_byte_wire_layout() {
        let mut wire = BytesMut::new();
        FrameEncoder::new()
            .encode(&frame(FrameMetadata::variable_byte(4), &[1, 2]), &mut wire)
            .unwrap();
        assert_eq!(&wire[..], &[4, 2, 1, 2]);
    }

    #[test]
    fn variable_short_length_is_big_endian() {
        let mut wire = BytesMut::new();
        FrameEncoder::new()
            .encode(&frame(FrameMetadata::variable_short(81), &[0; 258]), &mut wire)
            .unwrap();
        assert_eq!(&wire[..3], &[81, 1, 2]);
    }

    #[test]
    fn empty_input_waits() {
        let mut decoder = FrameDecoder::new(metadata());
        let mut wire = BytesMut::new();
        assert!(decoder.decode(&mut wire).unwrap().is_none());
    }

    #[test]
    fn unknown_opcode_is_fatal() {
        let mut decoder = FrameDecoder::new(metadata());
        let mut wire = BytesMut::from(&[200u8][..]);
        assert!(matches!(
            decoder.decode(&mut wire),
            Err(ProtocolError::UnknownOpcode(200))
        ));
    }

    #[test]
    fn missing_payload_after_opcode_is_fatal() {
        let mut decoder = FrameDecoder::new(metadata());
        let mut wire = BytesMut::from(&[86u8, 1, 2][..]);
        assert!(matches!(
            decoder.decode(&mut wire),
            Err(ProtocolError::Truncated {
                opcode: 86,
                needed: 4,
                available: 2
            })
        ));
    }

    #[test]
    fn missing_length_after_opcode_is_fatal() {
        let mut decoder = FrameDecoder::new(metadata());
        let mut wire = BytesMut::from(&[81u8, 0][..]);
        assert!(matches!(
            decoder.decode(&mut wire),
            Err(ProtocolError::Truncated { opcode: 81, .. })
        ));
    }

    #[test]
    fn oversized_variable_byte_payload_fails_to_encode() {
        let md = FrameMetadata::variable_byte(4);
        let oversized = Frame::from_parts(md, vec![0u8; 300].into());
        let mut wire = BytesMut::new();
        assert!(matches!(
            FrameEncoder::new().encode(&oversized, &mut wire),
            Err(ProtocolError::PayloadTooLarge { len: 300, .. })
        ));
        assert!(wire.is_empty());
    }

    #[test]
    fn headless_frames_are_bare_payload() {
        let md = FrameMetadata::fixed(2, 3).headless();
        let mut wire = BytesMut::new();
        FrameEncoder::with_cipher(IsaacRandom::new(&[1, 2, 3, 4]))
            .encode(&frame(md, &[2, 0, 0]), &mut wire)
            .unwrap();
        assert_eq!(&wire[..], &[2, 0, 0]);
    }

    #[test]
    fn ciphered_link_recovers_a_thousand_opcodes() {
        let seed = [0x1234_5678, 0x0BAD_F00D, 42, 7];
        let client = IsaacPair::mirrored(seed);
        let server = IsaacPair::from_seed(seed);

        let mut client_encoder = FrameEncoder::with_cipher(client.encoding);
        let mut server_decoder = FrameDecoder::with_cipher(metadata(), server.decoding);
        let opcodes = [0u8, 3, 4, 81, 86];

        let mut wire = BytesMut::new();
        let mut sent = Vec::new();
        for i in 0..1_000usize {
            let opcode = opcodes[i % opcodes.len()];
            let md = metadata().outbound(opcode).unwrap();
            let payload = match md.length {
                FrameLength::Fixed(n) => vec![i as u8; n],
                _ => vec![i as u8; i % 17],
            };
            let f = frame(md, &payload);
            client_encoder.encode(&f, &mut wire).unwrap();
            sent.push(f);
        }
        for expected in &sent {
            let decoded = server_decoder.decode(&mut wire).unwrap().unwrap();
            assert_eq!(&decoded, expected);
        }
    }

    #[test]
    fn omitting_the_encode_offset_desynchronizes() {
        let seed = [5, 6, 7, 8];
        let mut with_offset = IsaacPair::from_seed(seed).encoding;
        let mut without_offset = IsaacRandom::new(&seed);

        let mismatches = (0..256u32)
            .filter(|&x| {
                let wire = (x as u8).wrapping_add(with_offset.next_u32() as u8);
                wire.wrapping_sub(without_offset.next_u32() as u8) != x as u8
            })
            .count();
        assert!(mismatches > 200);
    }

    #[test]
    fn upgrade_switches_tables_and_enables_cipher() {
        let mut login = FrameMetadataSet::new();
        login.register_inbound(FrameMetadata::fixed(14, 1));
        let mut codec = FrameCodec::new(Arc::new(login));
        assert!(!codec.decoder.is_ciphered());

        codec.upgrade(metadata(), IsaacPair::from_seed([1, 1, 1, 1]));
        assert!(codec.decoder.is_ciphered());

        let mut client = FrameEncoder::with_cipher(IsaacPair::mirrored([1, 1, 1, 1]).encoding);
        let mut wire = BytesMut::new();
        let ping = frame(FrameMetadata::fixed(0, 0), &[]);
        client.encode(&ping, &mut wire).unwrap();
        assert_eq!(codec.decode(&mut wire).unwrap(), Some(ping));
    }
}

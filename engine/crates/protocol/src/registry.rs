use std::sync::Arc;

use crate::error::ProtocolError;
use crate::frame::Frame;
use crate::metadata::{FrameMetadata, FrameMetadataSet};

/// Turns a complete inbound frame into a typed message.
pub type MessageDecoder<M> = fn(&Frame) -> Result<M, ProtocolError>;

#[derive(Debug, PartialEq)]
pub enum Decoded<M> {
    Message(M),
    /// The opcode has metadata but no decoder; the frame is dropped.
    Unhandled(u8),
}

/// Static opcode table mapping inbound frames to decoders and holding the
/// metadata both directions of a connection phase are framed with.
pub struct MessageRegistry<M> {
    metadata: Arc<FrameMetadataSet>,
    decoders: Vec<Option<MessageDecoder<M>>>,
}

impl<M> MessageRegistry<M> {
    pub fn builder() -> RegistryBuilder<M> {
        RegistryBuilder {
            metadata: FrameMetadataSet::new(),
            decoders: vec![None; 256],
        }
    }

    pub fn metadata(&self) -> Arc<FrameMetadataSet> {
        Arc::clone(&self.metadata)
    }

    pub fn decode(&self, frame: &Frame) -> Result<Decoded<M>, ProtocolError> {
        match self.decoders[frame.opcode() as usize] {
            Some(decoder) => decoder(frame).map(Decoded::Message),
            None => Ok(Decoded::Unhandled(frame.opcode())),
        }
    }
}

pub struct RegistryBuilder<M> {
    metadata: FrameMetadataSet,
    decoders: Vec<Option<MessageDecoder<M>>>,
}

impl<M> RegistryBuilder<M> {
    pub fn inbound(mut self, metadata: FrameMetadata, decoder: MessageDecoder<M>) -> Self {
        self.metadata.register_inbound(metadata);
        self.decoders[metadata.opcode as usize] = Some(decoder);
        self
    }

    /// Registers framing for an opcode whose content is read and discarded.
    pub fn inbound_ignored(mut self, metadata: FrameMetadata) -> Self {
        self.metadata.register_inbound(metadata);
        self.decoders[metadata.opcode as usize] = None;
        self
    }

    pub fn outbound(mut self, metadata: FrameMetadata) -> Self {
        self.metadata.register_outbound(metadata);
        self
    }

    pub fn build(self) -> MessageRegistry<M> {
        tracing::debug!(
            inbound = self.metadata.inbound_count(),
            "message registry built"
        );
        MessageRegistry {
            metadata: Arc::new(self.metadata),
            decoders: self.decoders,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::DataType;

    #[derive(Debug, PartialEq)]
    enum Msg {
        Focus(bool),
    }

    fn decode_focus(frame: &Frame) -> Result<Msg, ProtocolError> {
        Ok(Msg::Focus(frame.reader().get_unsigned(DataType::Byte)? == 1))
    }

    fn registry() -> MessageRegistry<Msg> {
        MessageRegistry::builder()
            .inbound(FrameMetadata::fixed(3, 1), decode_focus)
            .inbound_ignored(FrameMetadata::fixed(0, 0))
            .outbound(FrameMetadata::variable_short(81))
            .build()
    }

    #[test]
    fn decodes_registered_opcode() {
        let frame = Frame::new(FrameMetadata::fixed(3, 1), vec![1u8]).unwrap();
        assert_eq!(registry().decode(&frame).unwrap(), Decoded::Message(Msg::Focus(true)));
    }

    #[test]
    fn ignored_opcode_falls_through() {
        let frame = Frame::new(FrameMetadata::fixed(0, 0), Vec::<u8>::new()).unwrap();
        assert_eq!(registry().decode(&frame).unwrap(), Decoded::Unhandled(0));
    }

    #[test]
    fn metadata_covers_both_directions() {
        let metadata = registry().metadata();
        assert!(metadata.inbound(3).is_some());
        assert!(metadata.inbound(0).is_some());
        assert!(metadata.outbound(81).is_some());
        assert!(metadata.inbound(81).is_none());
    }
}

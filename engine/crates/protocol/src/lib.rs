//! Binary frame protocol: opcode/length framing, the ISAAC opcode cipher,
//! bit and byte level payload builders, and opcode to message lookup.

pub mod builder;
pub mod codec;
pub mod error;
pub mod frame;
pub mod isaac;
pub mod metadata;
pub mod reader;
pub mod registry;
pub mod text;

pub use builder::{AccessMode, DataOrder, DataTransformation, DataType, FrameBuilder};
pub use codec::{FrameCodec, FrameDecoder, FrameEncoder};
pub use error::ProtocolError;
pub use frame::Frame;
pub use isaac::{IsaacPair, IsaacRandom};
pub use metadata::{FrameLength, FrameMetadata, FrameMetadataSet};
pub use reader::FrameReader;
pub use registry::{Decoded, MessageDecoder, MessageRegistry, RegistryBuilder};

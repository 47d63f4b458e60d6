//! Frames exchanged before a session is upgraded to the game protocol.

use std::sync::{Arc, OnceLock};

use protocol::{DataType, Frame, FrameBuilder, FrameMetadata, FrameMetadataSet, MessageRegistry, ProtocolError};
use session::SessionKey;
use world::message::LOGIN_RESPONSE;

pub const HANDSHAKE: FrameMetadata = FrameMetadata::fixed(14, 1);
pub const NEW_LOGIN: FrameMetadata = FrameMetadata::variable_byte(16);
pub const RECONNECT: FrameMetadata = FrameMetadata::variable_byte(18);

pub const HANDSHAKE_RESPONSE: FrameMetadata = FrameMetadata::fixed(14, 17).headless();

pub const ARCHIVE_COUNT: usize = 9;

/// Status byte of a handshake response that lets the client continue.
const EXCHANGE_DATA: i64 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginMessage {
    Handshake { name_hash: u8 },
    Login(LoginBlock),
}

/// Everything the client sends in its login frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginBlock {
    pub reconnecting: bool,
    pub magic: u8,
    pub client_version: u16,
    pub detail: u8,
    pub archive_checksums: [u32; ARCHIVE_COUNT],
    pub block_opcode: u8,
    pub session_keys: [u32; 4],
    pub uid: u32,
    pub username: String,
    pub password: String,
}

impl LoginBlock {
    /// The key the server issued in its handshake, as echoed back by the client.
    pub fn server_key(&self) -> u64 {
        (u64::from(self.session_keys[2]) << 32) | u64::from(self.session_keys[3])
    }
}

pub fn login_registry() -> &'static MessageRegistry<LoginMessage> {
    static REGISTRY: OnceLock<MessageRegistry<LoginMessage>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        MessageRegistry::builder()
            .inbound(HANDSHAKE, decode_handshake)
            .inbound(NEW_LOGIN, decode_login)
            .inbound(RECONNECT, decode_login)
            .outbound(HANDSHAKE_RESPONSE)
            .outbound(LOGIN_RESPONSE)
            .build()
    })
}

pub fn login_metadata() -> Arc<FrameMetadataSet> {
    login_registry().metadata()
}

fn decode_handshake(frame: &Frame) -> Result<LoginMessage, ProtocolError> {
    let name_hash = frame.reader().get_unsigned(DataType::Byte)? as u8;
    Ok(LoginMessage::Handshake { name_hash })
}

fn decode_login(frame: &Frame) -> Result<LoginMessage, ProtocolError> {
    let mut reader = frame.reader();
    let magic = reader.get_unsigned(DataType::Byte)? as u8;
    let client_version = reader.get_unsigned(DataType::Short)? as u16;
    let detail = reader.get_unsigned(DataType::Byte)? as u8;

    let mut archive_checksums = [0; ARCHIVE_COUNT];
    for checksum in &mut archive_checksums {
        *checksum = reader.get_unsigned(DataType::Int)? as u32;
    }

    let block_length = reader.get_unsigned(DataType::Byte)? as usize;
    if block_length != reader.remaining() {
        return Err(ProtocolError::malformed(
            "login",
            format!("block length {block_length}, {} bytes available", reader.remaining()),
        ));
    }

    let block_opcode = reader.get_unsigned(DataType::Byte)? as u8;
    let mut session_keys = [0; 4];
    for key in &mut session_keys {
        *key = reader.get_unsigned(DataType::Int)? as u32;
    }
    let uid = reader.get_unsigned(DataType::Int)? as u32;
    let username = reader.get_string()?;
    let password = reader.get_string()?;

    Ok(LoginMessage::Login(LoginBlock {
        reconnecting: frame.opcode() == RECONNECT.opcode,
        magic,
        client_version,
        detail,
        archive_checksums,
        block_opcode,
        session_keys,
        uid,
        username,
        password,
    }))
}

/// Eight zero bytes, the exchange status and the session key.
pub fn handshake_response(key: SessionKey) -> Result<Frame, ProtocolError> {
    let mut builder = FrameBuilder::with_capacity(17);
    builder.put_bytes(&[0; 8]);
    builder.put(DataType::Byte, EXCHANGE_DATA);
    builder.put(DataType::Long, key.as_i64());
    builder.build(HANDSHAKE_RESPONSE)
}

/// Writes a login frame the way the client does.
pub fn encode_login(block: &LoginBlock) -> Result<Frame, ProtocolError> {
    let mut secure = FrameBuilder::new();
    secure.put(DataType::Byte, i64::from(block.block_opcode));
    for key in block.session_keys {
        secure.put(DataType::Int, i64::from(key));
    }
    secure.put(DataType::Int, i64::from(block.uid));
    secure.put_string(&block.username);
    secure.put_string(&block.password);

    let mut builder = FrameBuilder::new();
    builder.put(DataType::Byte, i64::from(block.magic));
    builder.put(DataType::Short, i64::from(block.client_version));
    builder.put(DataType::Byte, i64::from(block.detail));
    for checksum in block.archive_checksums {
        builder.put(DataType::Int, i64::from(checksum));
    }
    builder.put(DataType::Byte, secure.len() as i64);
    builder.put_builder(&secure);
    builder.build(if block.reconnecting { RECONNECT } else { NEW_LOGIN })
}

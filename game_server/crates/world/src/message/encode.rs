use protocol::{DataOrder, DataTransformation, DataType, Frame, FrameBuilder, ProtocolError};
use space::Position;

use super::{ResponseCode, INITIALIZE_PLAYER, LOGIN_RESPONSE, REBUILD_REGION, RESET_DESTINATION, SERVER_CHAT};
use crate::model::Privilege;

/// Login status. Privilege and flag bytes follow only an [`ResponseCode::Ok`].
pub fn login_response(code: ResponseCode, privilege: Privilege, flagged: bool) -> Result<Frame, ProtocolError> {
    let mut builder = FrameBuilder::with_capacity(3);
    builder.put(DataType::Byte, code.value() as i64);
    if code == ResponseCode::Ok {
        builder.put(DataType::Byte, privilege.value() as i64);
        builder.put(DataType::Byte, flagged as i64);
    }
    builder.build(LOGIN_RESPONSE)
}

/// A bare status byte, for refusals before a player exists.
pub fn login_status(code: ResponseCode) -> Result<Frame, ProtocolError> {
    login_response(code, Privilege::Player, false)
}

pub fn initialize_player(member: bool, index: usize) -> Result<Frame, ProtocolError> {
    let mut builder = FrameBuilder::with_capacity(3);
    builder.put_transformed(DataType::Byte, DataTransformation::Add, member as i64);
    builder.put_with(DataType::Short, DataOrder::Little, DataTransformation::Add, index as i64);
    builder.build(INITIALIZE_PLAYER)
}

pub fn rebuild_region(position: &Position) -> Result<Frame, ProtocolError> {
    let mut builder = FrameBuilder::with_capacity(4);
    builder.put_transformed(DataType::Short, DataTransformation::Add, position.central_region_x() as i64);
    builder.put(DataType::Short, position.central_region_y() as i64);
    builder.build(REBUILD_REGION)
}

pub fn reset_destination() -> Result<Frame, ProtocolError> {
    FrameBuilder::new().build(RESET_DESTINATION)
}

pub fn server_chat(text: &str) -> Result<Frame, ProtocolError> {
    let mut builder = FrameBuilder::with_capacity(text.len() + 1);
    builder.put_string(text);
    builder.build(SERVER_CHAT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_response_carries_privilege() {
        let frame = login_response(ResponseCode::Ok, Privilege::Administrator, false).unwrap();
        assert!(frame.metadata().headless);
        assert_eq!(&frame.payload()[..], &[2, 2, 0]);
    }

    #[test]
    fn refusal_is_a_single_byte() {
        let frame = login_status(ResponseCode::TooManyConnections).unwrap();
        assert_eq!(&frame.payload()[..], &[9]);
    }

    #[test]
    fn initialize_player_layout() {
        let frame = initialize_player(true, 0x0102).unwrap();
        assert_eq!(frame.opcode(), 249);
        assert_eq!(&frame.payload()[..], &[129, 0x02 + 128, 0x01]);
    }

    #[test]
    fn rebuild_region_layout() {
        let frame = rebuild_region(&Position::ground(3222, 3218)).unwrap();
        // 402 = 0x0192
        assert_eq!(&frame.payload()[..], &[0x01, 0x92u8.wrapping_add(128), 0x01, 0x92]);
    }

    #[test]
    fn server_chat_is_newline_terminated() {
        let frame = server_chat("hi").unwrap();
        assert_eq!(&frame.payload()[..], b"hi\n");
        assert!(reset_destination().unwrap().is_empty());
    }
}

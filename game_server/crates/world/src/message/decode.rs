use protocol::text::{capitalize, compress, decompress, filter_invalid_characters};
use protocol::{DataOrder, DataTransformation, DataType, Frame, FrameReader, ProtocolError};
use space::Position;

use super::{ChatMessage, GameMessage, MouseClick, MovementMessage};

/// Anti-cheat data the minimap variant appends after the path.
const MINIMAP_TRAILER: usize = 14;

/// Fixed part of a movement frame: first x, first y and the run flag.
const MOVEMENT_HEADER: usize = 5;

/// Width of the client's game screen, used to unpack click coordinates.
const SCREEN_WIDTH: u32 = 765;

pub fn ping(_frame: &Frame) -> Result<GameMessage, ProtocolError> {
    Ok(GameMessage::Ping)
}

pub fn close_interface(_frame: &Frame) -> Result<GameMessage, ProtocolError> {
    Ok(GameMessage::CloseInterface)
}

pub fn focus_update(frame: &Frame) -> Result<GameMessage, ProtocolError> {
    let focused = frame.reader().get_unsigned(DataType::Byte)? == 1;
    Ok(GameMessage::FocusUpdate { focused })
}

pub fn arrow_key(frame: &Frame) -> Result<GameMessage, ProtocolError> {
    let mut reader = frame.reader();
    let roll = reader.get_unsigned_with(DataType::Short, DataOrder::Little, DataTransformation::None)? as u16;
    let yaw = reader.get_unsigned_with(DataType::Short, DataOrder::Little, DataTransformation::None)? as u16;
    Ok(GameMessage::ArrowKey { roll, yaw })
}

pub fn mouse_clicked(frame: &Frame) -> Result<GameMessage, ProtocolError> {
    let value = frame.reader().get_unsigned(DataType::Int)? as u32;
    let coordinates = value & 0x3FFFF;
    Ok(GameMessage::MouseClicked(MouseClick {
        delay_ms: (value >> 20) as u64 * 50,
        right: (value >> 19) & 1 == 1,
        x: coordinates % SCREEN_WIDTH,
        y: coordinates / SCREEN_WIDTH,
    }))
}

pub fn command(frame: &Frame) -> Result<GameMessage, ProtocolError> {
    let text = frame.reader().get_string()?;
    Ok(GameMessage::Command { text })
}

pub fn chat(frame: &Frame) -> Result<GameMessage, ProtocolError> {
    let length = frame
        .len()
        .checked_sub(2)
        .ok_or_else(|| ProtocolError::malformed("chat", "frame shorter than its header"))?;
    let mut reader = frame.reader();
    let effects = reader.get_unsigned_with(DataType::Byte, DataOrder::Big, DataTransformation::Subtract)? as u8;
    let colour = reader.get_unsigned_with(DataType::Byte, DataOrder::Big, DataTransformation::Subtract)? as u8;
    let packed = reader.get_bytes_reverse(DataTransformation::Add, length)?;

    let text = capitalize(&filter_invalid_characters(&decompress(&packed)));
    let compressed = compress(&text);
    Ok(GameMessage::Chat(ChatMessage {
        effects,
        colour,
        text,
        compressed,
    }))
}

pub fn movement(frame: &Frame) -> Result<GameMessage, ProtocolError> {
    read_path(frame.reader(), frame.len())
}

pub fn minimap_movement(frame: &Frame) -> Result<GameMessage, ProtocolError> {
    let length = frame
        .len()
        .checked_sub(MINIMAP_TRAILER)
        .ok_or_else(|| ProtocolError::malformed("movement", "minimap frame missing its trailer"))?;
    read_path(frame.reader(), length)
}

fn read_path(mut reader: FrameReader, length: usize) -> Result<GameMessage, ProtocolError> {
    let steps = length
        .checked_sub(MOVEMENT_HEADER)
        .ok_or_else(|| ProtocolError::malformed("movement", format!("{length} bytes is too short")))?
        / 2;

    let x = reader.get_unsigned_with(DataType::Short, DataOrder::Little, DataTransformation::Add)? as i32;
    let mut deltas = Vec::with_capacity(steps);
    for _ in 0..steps {
        let dx = reader.get_signed(DataType::Byte)? as i32;
        let dy = reader.get_signed(DataType::Byte)? as i32;
        deltas.push((dx, dy));
    }
    let y = reader.get_unsigned_with(DataType::Short, DataOrder::Little, DataTransformation::None)? as i32;
    let run = reader.get_unsigned_with(DataType::Byte, DataOrder::Big, DataTransformation::Negate)? == 1;

    let first = Position::ground(x, y);
    let mut path = Vec::with_capacity(steps + 1);
    path.push(first);
    path.extend(deltas.into_iter().map(|(dx, dy)| first.offset(dx, dy)));
    Ok(GameMessage::Movement(MovementMessage { path, run }))
}

#[cfg(test)]
mod tests {
    use protocol::{FrameBuilder, FrameMetadata};

    use super::*;
    use crate::message::{CHAT, GAME_MOVEMENT, MINIMAP_MOVEMENT, MOUSE_CLICKED};

    fn movement_frame(metadata: FrameMetadata, steps: &[(i8, i8)], run: bool, trailer: usize) -> Frame {
        let mut builder = FrameBuilder::new();
        builder.put_with(DataType::Short, DataOrder::Little, DataTransformation::Add, 3200);
        for &(dx, dy) in steps {
            builder.put(DataType::Byte, dx as i64);
            builder.put(DataType::Byte, dy as i64);
        }
        builder.put_ordered(DataType::Short, DataOrder::Little, 3300);
        builder.put_transformed(DataType::Byte, DataTransformation::Negate, run as i64);
        builder.put_bytes(&vec![0; trailer]);
        builder.build(metadata).unwrap()
    }

    #[test]
    fn movement_path_is_relative_to_first_point() {
        let frame = movement_frame(GAME_MOVEMENT, &[(1, 0), (2, -3)], true, 0);
        let GameMessage::Movement(message) = movement(&frame).unwrap() else {
            panic!("expected movement");
        };
        assert!(message.run);
        assert_eq!(
            message.path,
            vec![
                Position::ground(3200, 3300),
                Position::ground(3201, 3300),
                Position::ground(3202, 3297),
            ]
        );
    }

    #[test]
    fn minimap_movement_ignores_trailer() {
        let frame = movement_frame(MINIMAP_MOVEMENT, &[(-1, -1)], false, 14);
        let GameMessage::Movement(message) = minimap_movement(&frame).unwrap() else {
            panic!("expected movement");
        };
        assert!(!message.run);
        assert_eq!(message.path.len(), 2);
        assert_eq!(message.path[1], Position::ground(3199, 3299));
    }

    #[test]
    fn short_movement_frame_is_malformed() {
        let frame = Frame::new(GAME_MOVEMENT, vec![0u8; 3]).unwrap();
        assert!(matches!(movement(&frame), Err(ProtocolError::Malformed { .. })));
    }

    #[test]
    fn chat_is_sanitised() {
        let packed = compress("hi there");
        let mut builder = FrameBuilder::new();
        builder.put_transformed(DataType::Byte, DataTransformation::Subtract, 1);
        builder.put_transformed(DataType::Byte, DataTransformation::Subtract, 2);
        builder.put_bytes_reverse(DataTransformation::Add, &packed);
        let frame = builder.build(CHAT).unwrap();

        let GameMessage::Chat(message) = chat(&frame).unwrap() else {
            panic!("expected chat");
        };
        assert_eq!(message.effects, 1);
        assert_eq!(message.colour, 2);
        assert_eq!(message.text, "Hi there");
        assert_eq!(message.compressed, compress("Hi there"));
    }

    #[test]
    fn mouse_click_unpacks_fields() {
        let value: u32 = (3 << 20) | (1 << 19) | (10 * 765 + 20);
        let mut builder = FrameBuilder::new();
        builder.put(DataType::Int, value as i64);
        let frame = builder.build(MOUSE_CLICKED).unwrap();
        assert_eq!(
            mouse_clicked(&frame).unwrap(),
            GameMessage::MouseClicked(MouseClick {
                delay_ms: 150,
                right: true,
                x: 20,
                y: 10,
            })
        );
    }
}

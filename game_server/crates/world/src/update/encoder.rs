use protocol::{Frame, FrameBuilder, ProtocolError};

use super::descriptor::PlayerDescriptor;
use crate::message::PLAYER_UPDATE;

/// Terminates the list of added players when update blocks follow.
const END_OF_ADDITIONS: u32 = 2047;

/// Builds the player update frame one observer receives each tick.
///
/// `local_count` is the size of the observer's local list before this tick's
/// removals and additions; `others` holds one descriptor per previously local
/// player, in list order, followed by the additions.
pub fn player_update(
    this: &PlayerDescriptor,
    local_count: usize,
    others: &[PlayerDescriptor],
) -> Result<Frame, ProtocolError> {
    let mut builder = FrameBuilder::new();
    let mut blocks = FrameBuilder::new();

    builder.switch_to_bit_access();
    this.encode(&mut builder, &mut blocks);
    builder.put_bits(8, local_count as u32);
    for descriptor in others {
        descriptor.encode(&mut builder, &mut blocks);
    }

    if blocks.is_empty() {
        builder.switch_to_byte_access();
    } else {
        builder.put_bits(11, END_OF_ADDITIONS);
        builder.switch_to_byte_access();
        builder.put_builder(&blocks);
    }
    builder.build(PLAYER_UPDATE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Privilege;
    use crate::update::block::{BlockSet, ChatBlock};
    use crate::update::descriptor::DescriptorKind;

    #[test]
    fn idle_update_with_no_locals() {
        let this = PlayerDescriptor::new(DescriptorKind::Idle, BlockSet::default());
        let frame = player_update(&this, 0, &[]).unwrap();
        assert_eq!(frame.opcode(), 81);
        // 0, 00000000
        assert_eq!(&frame.payload()[..], &[0, 0]);
    }

    #[test]
    fn blocks_follow_terminator() {
        let mut blocks = BlockSet::default();
        blocks.set_chat(ChatBlock::new(3, 4, Privilege::Player, vec![9]));
        let this = PlayerDescriptor::new(DescriptorKind::Idle, BlockSet::default());
        let other = PlayerDescriptor::new(DescriptorKind::Idle, blocks);
        let frame = player_update(&this, 1, &[other]).unwrap();

        // 0 | 00000001 | 1 00 | 11111111111 -> 23 bits, 3 bytes
        let payload = &frame.payload()[..];
        assert_eq!(&payload[..3], &[0b0000_0000, 0b1100_1111, 0b1111_1110]);
        assert_eq!(&payload[3..], &[0x80, 3, 4, 0, 1u8.wrapping_neg(), 9]);
    }
}

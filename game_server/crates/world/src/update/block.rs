use protocol::{DataOrder, DataTransformation, DataType, FrameBuilder};

use crate::model::{Appearance, BodyColour, BodyPart, Privilege};

pub const APPEARANCE_MASK: u16 = 0x10;
pub const CHAT_MASK: u16 = 0x80;

/// Set on a mask that does not fit one byte; the mask is then written as a little-endian short.
const EXTENDED_MASK: u16 = 0x40;

const ANIMATIONS: [i64; 7] = [0x328, 0x337, 0x333, 0x334, 0x335, 0x336, 0x338];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppearanceBlock {
    appearance: Appearance,
    encoded_name: u64,
    combat_level: u8,
    total_level: u16,
}

impl AppearanceBlock {
    pub fn new(appearance: Appearance, encoded_name: u64, combat_level: u8, total_level: u16) -> Self {
        Self {
            appearance,
            encoded_name,
            combat_level,
            total_level,
        }
    }

    pub fn encode(&self, builder: &mut FrameBuilder) {
        let appearance = &self.appearance;
        let mut properties = FrameBuilder::with_capacity(64);
        properties.put(DataType::Byte, appearance.gender().value() as i64);
        properties.put(DataType::Byte, 0); // head icon
        // hat, cape, amulet, weapon
        for _ in 0..4 {
            properties.put(DataType::Byte, 0);
        }
        properties.put(DataType::Short, appearance.masked_style(BodyPart::Chest) as i64);
        properties.put(DataType::Byte, 0); // shield
        for part in [BodyPart::Arms, BodyPart::Legs, BodyPart::Hair, BodyPart::Hands, BodyPart::Feet] {
            properties.put(DataType::Short, appearance.masked_style(part) as i64);
        }
        if appearance.is_female() {
            properties.put(DataType::Byte, 0);
        } else {
            properties.put(DataType::Short, appearance.masked_style(BodyPart::FacialHair) as i64);
        }
        for colour in [
            BodyColour::Hair,
            BodyColour::Torso,
            BodyColour::Legs,
            BodyColour::Feet,
            BodyColour::Skin,
        ] {
            properties.put(DataType::Byte, appearance.colour(colour) as i64);
        }
        for animation in ANIMATIONS {
            properties.put(DataType::Short, animation);
        }
        properties.put(DataType::Long, self.encoded_name as i64);
        properties.put(DataType::Byte, self.combat_level as i64);
        properties.put(DataType::Short, self.total_level as i64);

        builder.put_transformed(DataType::Byte, DataTransformation::Negate, properties.len() as i64);
        builder.put_builder(&properties);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatBlock {
    effects: u8,
    colour: u8,
    privilege: Privilege,
    compressed: Vec<u8>,
}

impl ChatBlock {
    pub fn new(effects: u8, colour: u8, privilege: Privilege, compressed: Vec<u8>) -> Self {
        Self {
            effects,
            colour,
            privilege,
            compressed,
        }
    }

    pub fn compressed(&self) -> &[u8] {
        &self.compressed
    }

    pub fn encode(&self, builder: &mut FrameBuilder) {
        builder.put(DataType::Byte, self.effects as i64);
        builder.put(DataType::Byte, self.colour as i64);
        builder.put(DataType::Byte, self.privilege.value() as i64);
        builder.put_transformed(DataType::Byte, DataTransformation::Negate, self.compressed.len() as i64);
        builder.put_bytes_reverse(DataTransformation::None, &self.compressed);
    }
}

/// The update blocks pending for one mob this tick. A flagged block replaces any earlier one of its kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockSet {
    appearance: Option<AppearanceBlock>,
    chat: Option<ChatBlock>,
}

impl BlockSet {
    pub fn appearance(&self) -> Option<&AppearanceBlock> {
        self.appearance.as_ref()
    }

    pub fn chat(&self) -> Option<&ChatBlock> {
        self.chat.as_ref()
    }

    pub fn set_appearance(&mut self, block: AppearanceBlock) {
        self.appearance = Some(block);
    }

    pub fn set_chat(&mut self, block: ChatBlock) {
        self.chat = Some(block);
    }

    pub fn remove_chat(&mut self) {
        self.chat = None;
    }

    pub fn clear(&mut self) {
        self.appearance = None;
        self.chat = None;
    }

    pub fn is_empty(&self) -> bool {
        self.appearance.is_none() && self.chat.is_none()
    }

    pub fn mask(&self) -> u16 {
        let mut mask = 0;
        if self.appearance.is_some() {
            mask |= APPEARANCE_MASK;
        }
        if self.chat.is_some() {
            mask |= CHAT_MASK;
        }
        mask
    }

    /// Writes the mask followed by each present block, appearance before chat.
    pub fn encode(&self, builder: &mut FrameBuilder) {
        let mask = self.mask();
        if mask > 0xFF {
            builder.put_ordered(DataType::Short, DataOrder::Little, (mask | EXTENDED_MASK) as i64);
        } else {
            builder.put(DataType::Byte, mask as i64);
        }
        if let Some(appearance) = &self.appearance {
            appearance.encode(builder);
        }
        if let Some(chat) = &self.chat {
            chat.encode(builder);
        }
    }
}

use protocol::FrameBuilder;
use space::Direction;

use super::block::BlockSet;
use crate::error::UpdateError;

/// Movement state of one mob as seen by one observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorKind {
    Idle,
    Walk(Direction),
    Run(Direction, Direction),
    /// Local coordinates are relative to the observer's last known region.
    Teleport {
        height: u8,
        region_changed: bool,
        local_x: i32,
        local_y: i32,
    },
    Remove,
    /// Deltas are the added player's position minus the observer's.
    Add { index: usize, dx: i32, dy: i32 },
}

impl DescriptorKind {
    /// Classifies a mob that is not teleporting by the directions it moved this tick.
    pub fn from_directions(first: Direction, second: Direction) -> Result<Self, UpdateError> {
        match (first, second) {
            (Direction::None, Direction::None) => Ok(Self::Idle),
            (first, Direction::None) => Ok(Self::Walk(first)),
            (Direction::None, second) => Err(UpdateError::Unclassifiable {
                first: Direction::None,
                second,
            }),
            (first, second) => Ok(Self::Run(first, second)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerDescriptor {
    kind: DescriptorKind,
    blocks: BlockSet,
}

impl PlayerDescriptor {
    pub fn new(kind: DescriptorKind, blocks: BlockSet) -> Self {
        Self { kind, blocks }
    }

    /// Removals never carry blocks.
    pub fn remove() -> Self {
        Self::new(DescriptorKind::Remove, BlockSet::default())
    }

    pub fn kind(&self) -> DescriptorKind {
        self.kind
    }

    pub fn blocks(&self) -> &BlockSet {
        &self.blocks
    }

    pub fn is_block_update_required(&self) -> bool {
        !self.blocks.is_empty()
    }

    /// Writes the movement bits to `builder` and any blocks to `block_builder`.
    pub fn encode(&self, builder: &mut FrameBuilder, block_builder: &mut FrameBuilder) {
        let update_required = self.is_block_update_required();
        match self.kind {
            DescriptorKind::Idle => {
                if update_required {
                    builder.put_bit(true);
                    builder.put_bits(2, 0);
                } else {
                    builder.put_bit(false);
                }
            }
            DescriptorKind::Walk(direction) => {
                builder.put_bit(true);
                builder.put_bits(2, 1);
                builder.put_bits(3, direction.value() as u32);
                builder.put_bit(update_required);
            }
            DescriptorKind::Run(first, second) => {
                builder.put_bit(true);
                builder.put_bits(2, 2);
                builder.put_bits(3, first.value() as u32);
                builder.put_bits(3, second.value() as u32);
                builder.put_bit(update_required);
            }
            DescriptorKind::Teleport {
                height,
                region_changed,
                local_x,
                local_y,
            } => {
                builder.put_bit(true);
                builder.put_bits(2, 3);
                builder.put_bits(2, height as u32);
                builder.put_bit(!region_changed);
                builder.put_bit(update_required);
                builder.put_bits(7, local_y as u32);
                builder.put_bits(7, local_x as u32);
            }
            DescriptorKind::Remove => {
                builder.put_bit(true);
                builder.put_bits(2, 3);
            }
            DescriptorKind::Add { index, dx, dy } => {
                builder.put_bits(11, index as u32);
                builder.put_bit(update_required);
                builder.put_bit(true);
                builder.put_bits(5, dy as u32);
                builder.put_bits(5, dx as u32);
            }
        }

        if update_required && self.kind != DescriptorKind::Remove {
            self.blocks.encode(block_builder);
        }
    }
}

use repository::Indexed;
use space::Position;

/// A non-player mob. NPCs take slots and region membership but are not synchronised to clients.
#[derive(Debug, Clone)]
pub struct Npc {
    index: usize,
    definition: u16,
    position: Position,
}

impl Npc {
    pub fn new(definition: u16, position: Position) -> Self {
        Self {
            index: 0,
            definition,
            position,
        }
    }

    pub fn definition(&self) -> u16 {
        self.definition
    }

    pub fn position(&self) -> Position {
        self.position
    }
}

impl Indexed for Npc {
    fn index(&self) -> usize {
        self.index
    }

    fn set_index(&mut self, index: usize) {
        self.index = index;
    }
}

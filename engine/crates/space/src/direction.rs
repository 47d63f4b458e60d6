use crate::position::Position;

/// Walking direction, encoded in three bits on the wire. `None` is `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    #[default]
    None,
    NorthWest,
    North,
    NorthEast,
    West,
    East,
    SouthWest,
    South,
    SouthEast,
}

impl Direction {
    pub fn value(self) -> i32 {
        match self {
            Self::None => -1,
            Self::NorthWest => 0,
            Self::North => 1,
            Self::NorthEast => 2,
            Self::West => 3,
            Self::East => 4,
            Self::SouthWest => 5,
            Self::South => 6,
            Self::SouthEast => 7,
        }
    }

    pub fn is_none(self) -> bool {
        self == Self::None
    }

    /// Direction of the step from `current` to `next`, by the sign of each delta.
    pub fn between(current: &Position, next: &Position) -> Self {
        let dx = (next.x - current.x).signum();
        let dy = (next.y - current.y).signum();
        match (dx, dy) {
            (-1, 1) => Self::NorthWest,
            (0, 1) => Self::North,
            (1, 1) => Self::NorthEast,
            (-1, 0) => Self::West,
            (1, 0) => Self::East,
            (-1, -1) => Self::SouthWest,
            (0, -1) => Self::South,
            (1, -1) => Self::SouthEast,
            _ => Self::None,
        }
    }

    pub fn delta(self) -> (i32, i32) {
        match self {
            Self::None => (0, 0),
            Self::NorthWest => (-1, 1),
            Self::North => (0, 1),
            Self::NorthEast => (1, 1),
            Self::West => (-1, 0),
            Self::East => (1, 0),
            Self::SouthWest => (-1, -1),
            Self::South => (0, -1),
            Self::SouthEast => (1, -1),
        }
    }
}

use serde::{Deserialize, Serialize};

use crate::region::{RegionCoordinates, REGION_SIZE};

/// Number of planes a position may occupy.
pub const HEIGHT_LEVELS: u8 = 4;

/// Default distance, in tiles, within which mobs are synchronized.
pub const MAX_DISTANCE: i32 = 15;

/// A tile in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub height: u8,
}

impl Position {
    /// # Panics
    ///
    /// Panics if `height` is not below [`HEIGHT_LEVELS`].
    pub fn new(x: i32, y: i32, height: u8) -> Self {
        assert!(height < HEIGHT_LEVELS, "height {height} out of range");
        Self { x, y, height }
    }

    pub fn ground(x: i32, y: i32) -> Self {
        Self::new(x, y, 0)
    }

    /// The same position shifted by a delta, keeping the plane.
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            height: self.height,
        }
    }

    pub fn central_region_x(&self) -> i32 {
        self.x / REGION_SIZE
    }

    pub fn central_region_y(&self) -> i32 {
        self.y / REGION_SIZE
    }

    pub fn top_left_region_x(&self) -> i32 {
        self.central_region_x() - 6
    }

    pub fn top_left_region_y(&self) -> i32 {
        self.central_region_y() - 6
    }

    /// X coordinate relative to the loaded map area centred on `base`.
    pub fn local_x(&self, base: &Position) -> i32 {
        self.x - base.top_left_region_x() * REGION_SIZE
    }

    pub fn local_y(&self, base: &Position) -> i32 {
        self.y - base.top_left_region_y() * REGION_SIZE
    }

    pub fn region(&self) -> RegionCoordinates {
        RegionCoordinates::new(self.central_region_x(), self.central_region_y())
    }

    pub fn longest_delta(&self, other: &Position) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    /// Whether `other` is on the same plane and at most `distance` tiles away on each axis.
    pub fn is_within_distance(&self, other: &Position, distance: i32) -> bool {
        self.height == other.height
            && (self.x - other.x).abs() <= distance
            && (self.y - other.y).abs() <= distance
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.height)
    }
}

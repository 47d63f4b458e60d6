pub mod direction;
pub mod model;
pub mod position;
pub mod region;

pub use direction::Direction;
pub use model::RegionError;
pub use position::Position;
pub use region::{RegionCoordinates, RegionRepository};

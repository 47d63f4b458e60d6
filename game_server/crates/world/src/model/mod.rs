pub mod appearance;
pub mod credentials;
pub mod movement;
pub mod npc;
pub mod player;

pub use appearance::{Appearance, BodyColour, BodyPart, Gender};
pub use credentials::Credentials;
pub use movement::{MovementQueue, Step};
pub use npc::Npc;
pub use player::{Player, Privilege, DEFAULT_VIEWING_DISTANCE};

//! Game world: players and NPCs, game messages, the update pipeline and the game service.

pub mod error;
pub mod game_service;
pub mod message;
pub mod model;
pub mod registration;
pub mod update;
pub mod world;

pub use error::UpdateError;
pub use game_service::GameService;
pub use message::{MessageDispatcher, ResponseCode};
pub use model::{Credentials, Npc, Player, Privilege};
pub use registration::{AdmissionError, Registrations};
pub use update::{ParallelUpdater, SequentialUpdater, Updater};
pub use world::{MobKey, World, MAXIMUM_NPCS, MAXIMUM_PLAYERS};

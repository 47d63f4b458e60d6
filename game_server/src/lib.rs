//! The game server binary's wiring: configuration, shutdown signalling and the
//! assembly of the network, login and world services.

pub mod config;
pub mod server;
pub mod shutdown;

pub use config::{ConfigError, ServerConfig};
pub use server::{GameServer, ServerError};
pub use shutdown::{shutdown_channel, ShutdownRx, ShutdownTx};

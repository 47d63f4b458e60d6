//! SQLite account store: usernames, argon2 password hashes and privilege.

pub mod account;
pub mod db;
pub mod error;
mod schema;

pub use account::{hash_password, Account, AccountRepo, StoredCredentials};
pub use db::PlayerDb;
pub use error::PlayerDbError;

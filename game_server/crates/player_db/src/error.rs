use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlayerDbError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("failed to prepare database directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("account already exists: {0}")]
    AccountExists(String),

    #[error("account not found: {0}")]
    AccountNotFound(String),

    #[error("invalid password")]
    InvalidPassword,

    #[error("password hashing error: {0}")]
    HashError(String),
}

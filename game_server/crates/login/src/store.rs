use std::sync::{Mutex, MutexGuard, PoisonError};

use player_db::{hash_password, Account, PlayerDb, PlayerDbError, StoredCredentials};
use world::Privilege;

use crate::error::LoginError;

/// What the credential store knows about an authenticated account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountDetails {
    pub privilege: Privilege,
    pub member: bool,
}

impl From<&Account> for AccountDetails {
    fn from(account: &Account) -> Self {
        Self {
            privilege: Privilege::from_value(account.privilege),
            member: account.member,
        }
    }
}

/// Checks a username and password. Implementations may block.
pub trait CredentialStore: Send + Sync {
    fn verify(&self, username: &str, password: &str) -> Result<AccountDetails, LoginError>;
}

/// Credential store backed by the SQLite account database.
///
/// The connection lock covers row reads and writes only. Password hashing
/// and verification run with it released.
pub struct SqlCredentialStore {
    db: Mutex<PlayerDb>,
    register_unknown: bool,
}

impl SqlCredentialStore {
    /// With `register_unknown`, the first login of an unknown name creates the account.
    pub fn new(db: PlayerDb, register_unknown: bool) -> Self {
        Self {
            db: Mutex::new(db),
            register_unknown,
        }
    }

    fn lock(&self) -> MutexGuard<'_, PlayerDb> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SqlCredentialStore {
    fn lookup(&self, username: &str) -> Result<Option<StoredCredentials>, PlayerDbError> {
        self.lock().account().credentials(username)
    }

    fn register(&self, username: &str, password: &str) -> Result<AccountDetails, LoginError> {
        let password_hash = hash_password(password)?;
        let account = self.lock().account().create_hashed(username, &password_hash)?;
        tracing::info!(username, "registered account on first login");
        Ok(AccountDetails::from(&account))
    }
}

impl CredentialStore for SqlCredentialStore {
    fn verify(&self, username: &str, password: &str) -> Result<AccountDetails, LoginError> {
        let Some(stored) = self.lookup(username)? else {
            if self.register_unknown {
                return self.register(username, password);
            }
            return Err(LoginError::InvalidCredentials);
        };

        stored.verify(password)?;
        self.lock().account().record_login(stored.account.id)?;
        Ok(AccountDetails::from(&stored.account))
    }
}

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use password_hash::rand_core::OsRng;
use password_hash::SaltString;
use rusqlite::{Connection, OptionalExtension, Row};

use crate::error::PlayerDbError;

/// An account record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: i64,
    pub username: String,
    /// Raw privilege level as stored (0 player, 1 moderator, 2 administrator).
    pub privilege: u8,
    pub member: bool,
    pub created_at: String,
    pub last_login: Option<String>,
}

impl Account {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            privilege: row.get::<_, i64>(2)?.clamp(0, u8::MAX as i64) as u8,
            member: row.get::<_, i64>(3)? != 0,
            created_at: row.get(4)?,
            last_login: row.get(5)?,
        })
    }
}

/// An account together with its stored password hash.
///
/// Owns everything the password check needs, so callers can release the
/// database before running argon2.
#[derive(Debug, Clone)]
pub struct StoredCredentials {
    pub account: Account,
    password_hash: String,
}

impl StoredCredentials {
    pub fn verify(&self, password: &str) -> Result<(), PlayerDbError> {
        verify_password(password, &self.password_hash)
    }
}

const ACCOUNT_COLUMNS: &str = "id, username, privilege, member, created_at, last_login";

/// Repository for account operations.
pub struct AccountRepo<'a> {
    conn: &'a Connection,
}

impl<'a> AccountRepo<'a> {
    pub(crate) fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a new account with the given username and password.
    pub fn create(&self, username: &str, password: &str) -> Result<Account, PlayerDbError> {
        if self.get_by_username(username)?.is_some() {
            return Err(PlayerDbError::AccountExists(username.to_string()));
        }
        self.create_hashed(username, &hash_password(password)?)
    }

    /// Create an account from a hash produced by [`hash_password`].
    pub fn create_hashed(&self, username: &str, password_hash: &str) -> Result<Account, PlayerDbError> {
        if self.get_by_username(username)?.is_some() {
            return Err(PlayerDbError::AccountExists(username.to_string()));
        }
        self.conn.execute(
            "INSERT INTO accounts (username, password_hash) VALUES (?1, ?2)",
            rusqlite::params![username, password_hash],
        )?;
        tracing::info!(username, "account created");

        self.get_by_username(username)?
            .ok_or_else(|| PlayerDbError::AccountNotFound(username.to_string()))
    }

    /// Authenticate with username and password, stamping the login time on success.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Account, PlayerDbError> {
        let Some(stored) = self.credentials(username)? else {
            return Err(PlayerDbError::AccountNotFound(username.to_string()));
        };
        stored.verify(password)?;

        let mut account = stored.account;
        account.last_login = self.record_login(account.id)?;
        Ok(account)
    }

    /// Fetch an account and its password hash without checking anything.
    pub fn credentials(&self, username: &str) -> Result<Option<StoredCredentials>, PlayerDbError> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {ACCOUNT_COLUMNS}, password_hash FROM accounts WHERE username = ?1"),
                rusqlite::params![username],
                |row| {
                    Ok(StoredCredentials {
                        account: Account::from_row(row)?,
                        password_hash: row.get(6)?,
                    })
                },
            )
            .optional()?)
    }

    /// Stamp the login time and return the stored value.
    pub fn record_login(&self, id: i64) -> Result<Option<String>, PlayerDbError> {
        let rows = self.conn.execute(
            "UPDATE accounts SET last_login = datetime('now') WHERE id = ?1",
            rusqlite::params![id],
        )?;
        if rows == 0 {
            return Err(PlayerDbError::AccountNotFound(id.to_string()));
        }
        Ok(self.conn.query_row(
            "SELECT last_login FROM accounts WHERE id = ?1",
            rusqlite::params![id],
            |row| row.get(0),
        )?)
    }

    /// Get an account by username (case-insensitive).
    pub fn get_by_username(&self, username: &str) -> Result<Option<Account>, PlayerDbError> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE username = ?1"),
                rusqlite::params![username],
                Account::from_row,
            )
            .optional()?)
    }

    pub fn set_privilege(&self, id: i64, privilege: u8) -> Result<(), PlayerDbError> {
        let rows = self.conn.execute(
            "UPDATE accounts SET privilege = ?1 WHERE id = ?2",
            rusqlite::params![privilege, id],
        )?;
        if rows == 0 {
            return Err(PlayerDbError::AccountNotFound(id.to_string()));
        }
        Ok(())
    }

    pub fn set_member(&self, id: i64, member: bool) -> Result<(), PlayerDbError> {
        let rows = self.conn.execute(
            "UPDATE accounts SET member = ?1 WHERE id = ?2",
            rusqlite::params![member as i64, id],
        )?;
        if rows == 0 {
            return Err(PlayerDbError::AccountNotFound(id.to_string()));
        }
        Ok(())
    }
}

/// Salted argon2 hash of `password`, in PHC string form.
pub fn hash_password(password: &str) -> Result<String, PlayerDbError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| PlayerDbError::HashError(e.to_string()))
}

fn verify_password(password: &str, hash: &str) -> Result<(), PlayerDbError> {
    let parsed = PasswordHash::new(hash).map_err(|e| PlayerDbError::HashError(e.to_string()))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| PlayerDbError::InvalidPassword)
}

#[cfg(test)]
mod tests {
    use super::hash_password;
    use crate::{PlayerDb, PlayerDbError};

    #[test]
    fn create_account() {
        let db = PlayerDb::open_memory().unwrap();
        let account = db.account().create("zezima", "password123").unwrap();
        assert_eq!(account.username, "zezima");
        assert_eq!(account.privilege, 0);
        assert!(!account.member);
        assert!(!account.created_at.is_empty());
    }

    #[test]
    fn duplicate_account_rejected() {
        let db = PlayerDb::open_memory().unwrap();
        db.account().create("user1", "pass1").unwrap();
        let result = db.account().create("User1", "pass2");
        assert!(matches!(result, Err(PlayerDbError::AccountExists(_))));
    }

    #[test]
    fn authenticate_success_stamps_login() {
        let db = PlayerDb::open_memory().unwrap();
        db.account().create("hero", "secret123").unwrap();
        let account = db.account().authenticate("HERO", "secret123").unwrap();
        assert_eq!(account.username, "hero");
        assert!(account.last_login.is_some());
    }

    #[test]
    fn authenticate_wrong_password() {
        let db = PlayerDb::open_memory().unwrap();
        db.account().create("hero", "secret123").unwrap();
        let result = db.account().authenticate("hero", "wrongpass");
        assert!(matches!(result, Err(PlayerDbError::InvalidPassword)));
    }

    #[test]
    fn authenticate_nonexistent_account() {
        let db = PlayerDb::open_memory().unwrap();
        let result = db.account().authenticate("ghost", "pass");
        assert!(matches!(result, Err(PlayerDbError::AccountNotFound(_))));
    }

    #[test]
    fn stored_credentials_check_passwords_on_their_own() {
        let db = PlayerDb::open_memory().unwrap();
        db.account().create("hero", "secret123").unwrap();
        let stored = db.account().credentials("Hero").unwrap().unwrap();
        drop(db);

        assert_eq!(stored.account.username, "hero");
        assert!(stored.account.last_login.is_none());
        assert!(stored.verify("secret123").is_ok());
        assert!(matches!(stored.verify("wrongpass"), Err(PlayerDbError::InvalidPassword)));
    }

    #[test]
    fn accounts_created_from_a_hash_accept_the_password() {
        let db = PlayerDb::open_memory().unwrap();
        let hash = hash_password("s3cret").unwrap();
        db.account().create_hashed("hasher", &hash).unwrap();
        assert!(db.account().authenticate("hasher", "s3cret").is_ok());
        assert!(matches!(
            db.account().create_hashed("HASHER", &hash),
            Err(PlayerDbError::AccountExists(_))
        ));
        assert!(matches!(db.account().record_login(99), Err(PlayerDbError::AccountNotFound(_))));
    }

    #[test]
    fn privilege_and_membership_persist() {
        let db = PlayerDb::open_memory().unwrap();
        let account = db.account().create("admin", "pass").unwrap();
        db.account().set_privilege(account.id, 2).unwrap();
        db.account().set_member(account.id, true).unwrap();
        let loaded = db.account().get_by_username("admin").unwrap().unwrap();
        assert_eq!(loaded.privilege, 2);
        assert!(loaded.member);
    }

    #[test]
    fn updating_missing_account_fails() {
        let db = PlayerDb::open_memory().unwrap();
        assert!(matches!(
            db.account().set_privilege(99, 1),
            Err(PlayerDbError::AccountNotFound(_))
        ));
    }
}

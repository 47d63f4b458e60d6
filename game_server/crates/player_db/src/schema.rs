use rusqlite::Connection;

use crate::error::PlayerDbError;

pub fn create_tables(conn: &Connection) -> Result<(), PlayerDbError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS accounts (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            username      TEXT NOT NULL UNIQUE COLLATE NOCASE,
            password_hash TEXT NOT NULL,
            privilege     INTEGER NOT NULL DEFAULT 0,
            member        INTEGER NOT NULL DEFAULT 0,
            created_at    TEXT NOT NULL DEFAULT (datetime('now')),
            last_login    TEXT
        );
        ",
    )?;
    Ok(())
}

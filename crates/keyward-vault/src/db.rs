//! The custody database: one `SQLite` file holding wallets and vaults.
//!
//! Vault rows are AEAD ciphertext already, so the file is plain `SQLite`.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;

use crate::error::VaultError;

struct Migration {
    name: &'static str,
    sql: &'static str,
}

/// Applied in order; migration `i` moves `user_version` to `i + 1`.
const MIGRATIONS: &[Migration] = &[
    Migration {
        name: "initial_schema",
        sql: include_str!("../migrations/001_initial_schema.sql"),
    },
    Migration {
        name: "user_indexes",
        sql: include_str!("../migrations/002_user_indexes.sql"),
    },
];

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// An open custody database at the latest schema.
pub struct VaultDb {
    conn: Connection,
}

impl fmt::Debug for VaultDb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultDb")
            .field("path", &self.conn.path())
            .finish_non_exhaustive()
    }
}

impl VaultDb {
    /// Open or create the database file at `path` in WAL mode.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Database`] if the file cannot be opened.
    /// - [`VaultError::Migration`] if the schema is newer than this build or
    ///   a migration fails.
    pub fn open(path: &Path) -> Result<Self, VaultError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Self::prepare(conn)
    }

    /// A throwaway database that lives as long as the handle.
    ///
    /// # Errors
    ///
    /// See [`VaultDb::open`].
    pub fn open_in_memory() -> Result<Self, VaultError> {
        Self::prepare(Connection::open_in_memory()?)
    }

    fn prepare(conn: Connection) -> Result<Self, VaultError> {
        conn.pragma_update(None, "foreign_keys", true)?;
        let mut db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// The underlying connection, for the store and wallet functions.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }

    /// `PRAGMA user_version`.
    ///
    /// # Errors
    ///
    /// [`VaultError::Database`] if the pragma cannot be read.
    pub fn schema_version(&self) -> Result<i32, VaultError> {
        Ok(self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?)
    }

    /// Number of migrations compiled into this build.
    #[must_use]
    pub const fn latest_schema_version() -> usize {
        MIGRATIONS.len()
    }

    fn migrate(&mut self) -> Result<(), VaultError> {
        let found = usize::try_from(self.schema_version()?)
            .map_err(|_| VaultError::Migration("negative schema version".into()))?;
        if found > MIGRATIONS.len() {
            return Err(VaultError::Migration(format!(
                "database schema {found} is newer than this build ({})",
                MIGRATIONS.len()
            )));
        }

        for (applied, migration) in MIGRATIONS.iter().enumerate().skip(found) {
            let target = applied
                .checked_add(1)
                .and_then(|v| i32::try_from(v).ok())
                .ok_or_else(|| VaultError::Migration("too many migrations".into()))?;
            let fail =
                |e: rusqlite::Error| VaultError::Migration(format!("{}: {e}", migration.name));

            let tx = self.conn.transaction().map_err(fail)?;
            tx.execute_batch(migration.sql).map_err(fail)?;
            tx.pragma_update(None, "user_version", target).map_err(fail)?;
            tx.commit().map_err(fail)?;

            tracing::debug!(version = target, name = migration.name, "schema migrated");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn latest() -> i32 {
        i32::try_from(VaultDb::latest_schema_version()).unwrap()
    }

    #[test]
    fn fresh_database_reaches_latest_schema() {
        let db = VaultDb::open_in_memory().unwrap();
        assert_eq!(db.schema_version().unwrap(), latest());

        let tables: i32 = db
            .connection()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master
                 WHERE type = 'table' AND name IN ('wallets', 'secure_vaults')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 2);
    }

    #[test]
    fn foreign_keys_are_on() {
        let db = VaultDb::open_in_memory().unwrap();
        let on: bool = db
            .connection()
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .unwrap();
        assert!(on);
    }

    #[test]
    fn reopening_a_file_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custody.db");
        drop(VaultDb::open(&path).unwrap());
        let db = VaultDb::open(&path).unwrap();
        assert_eq!(db.schema_version().unwrap(), latest());
    }

    #[test]
    fn newer_schema_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custody.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.pragma_update(None, "user_version", latest() + 1).unwrap();
        }
        assert!(matches!(VaultDb::open(&path), Err(VaultError::Migration(_))));
    }
}

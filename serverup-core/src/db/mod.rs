//! SQLite storage for serverup.
//!
//! Provides persistent storage for:
//! - Settings (user configuration, stored as JSON)
//! - State (acquisition bookkeeping such as the cache record)

mod migrations;

use rusqlite::Connection;
use std::path::{Path, PathBuf};

use crate::server::paths;

/// Database connection wrapper.
///
/// Handles connection setup, migrations and file permissions. Every write is a
/// single statement in autocommit mode, so each one is atomic and durable.
pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl Database {
    /// Open the database at the default location.
    ///
    /// Default path: `~/.local/share/serverup/serverup.db`
    pub fn open() -> anyhow::Result<Self> {
        let path = Self::default_path()?;
        Self::open_at(path)
    }

    /// Open the database at a specific path.
    ///
    /// Creates parent directories if they don't exist.
    pub fn open_at(path: PathBuf) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&path)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) = std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
            {
                tracing::warn!(path = %path.display(), error = %e, "Failed to set database file permissions");
            }
        }

        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        Ok(Self { conn, path })
    }

    /// Open a private in-memory database, already migrated.
    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn,
            path: PathBuf::from(":memory:"),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Get the default database path.
    pub fn default_path() -> anyhow::Result<PathBuf> {
        Ok(paths::data_dir()?.join("serverup.db"))
    }

    /// Run database migrations.
    ///
    /// Safe to call multiple times - migrations are tracked and only run once.
    pub fn migrate(&self) -> anyhow::Result<()> {
        migrations::run_migrations(&self.conn)?;
        Ok(())
    }

    /// Get the database file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    // =========================================================================
    // Settings Storage
    // =========================================================================

    /// Save a setting (upsert).
    pub fn set_setting(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        upsert(&self.conn, "settings", key, value)
    }

    /// Get a setting. Returns `None` if it doesn't exist.
    pub fn get_setting(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        select(&self.conn, "settings", key)
    }

    /// Delete a setting. No-op if it doesn't exist.
    pub fn delete_setting(&self, key: &str) -> Result<(), rusqlite::Error> {
        self.conn
            .execute("DELETE FROM settings WHERE key = ?", [key])?;
        Ok(())
    }

    // =========================================================================
    // State Storage
    // =========================================================================

    /// Save a state value (upsert).
    pub fn set_state(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        upsert(&self.conn, "state", key, value)
    }

    /// Get a state value. Returns `None` if it doesn't exist.
    pub fn get_state(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        select(&self.conn, "state", key)
    }

    /// Delete a state value. No-op if it doesn't exist.
    pub fn delete_state(&self, key: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute("DELETE FROM state WHERE key = ?", [key])?;
        Ok(())
    }
}

// Table names are compile-time constants from this module, never user input.
fn upsert(conn: &Connection, table: &str, key: &str, value: &str) -> Result<(), rusqlite::Error> {
    let sql = format!(
        "INSERT INTO {table} (key, value, updated_at) VALUES (?, ?, unixepoch())
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at"
    );
    conn.execute(&sql, [key, value])?;
    Ok(())
}

fn select(conn: &Connection, table: &str, key: &str) -> Result<Option<String>, rusqlite::Error> {
    let sql = format!("SELECT value FROM {table} WHERE key = ?");
    let mut stmt = conn.prepare(&sql)?;
    match stmt.query_row([key], |row| row.get(0)) {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_db() -> (TempDir, Database) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db = Database::open_at(db_path).unwrap();
        db.migrate().unwrap();
        (temp_dir, db)
    }

    #[test]
    fn test_open_at_creates_parent_directories() {
        let tmp = TempDir::new().unwrap();
        let nested_path = tmp.path().join("deep").join("nested").join("test.db");

        assert!(!nested_path.parent().unwrap().exists());
        let _db = Database::open_at(nested_path.clone()).unwrap();
        assert!(nested_path.exists());
    }

    #[test]
    fn test_open_at_reuses_existing_database() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("test.db");

        {
            let db = Database::open_at(path.clone()).unwrap();
            db.migrate().unwrap();
            db.set_state("server.cache", "{}").unwrap();
        }

        let db = Database::open_at(path).unwrap();
        assert_eq!(db.get_state("server.cache").unwrap().as_deref(), Some("{}"));
    }

    #[cfg(unix)]
    #[test]
    fn test_database_file_is_private() {
        use std::os::unix::fs::PermissionsExt;
        let (_tmp, db) = setup_test_db();
        let mode = std::fs::metadata(db.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_setting_upsert() {
        let (_tmp, db) = setup_test_db();
        assert_eq!(db.get_setting("settings").unwrap(), None);

        db.set_setting("settings", "a").unwrap();
        db.set_setting("settings", "b").unwrap();
        assert_eq!(db.get_setting("settings").unwrap().as_deref(), Some("b"));

        db.delete_setting("settings").unwrap();
        assert_eq!(db.get_setting("settings").unwrap(), None);
    }

    #[test]
    fn test_state_is_separate_from_settings() {
        let db = Database::open_in_memory().unwrap();
        db.set_state("key", "state").unwrap();
        db.set_setting("key", "setting").unwrap();

        assert_eq!(db.get_state("key").unwrap().as_deref(), Some("state"));
        assert_eq!(db.get_setting("key").unwrap().as_deref(), Some("setting"));

        db.delete_state("key").unwrap();
        assert_eq!(db.get_state("key").unwrap(), None);
        assert_eq!(db.get_setting("key").unwrap().as_deref(), Some("setting"));
    }

    #[test]
    fn test_delete_missing_is_noop() {
        let db = Database::open_in_memory().unwrap();
        db.delete_state("never-written").unwrap();
        db.delete_setting("never-written").unwrap();
    }
}

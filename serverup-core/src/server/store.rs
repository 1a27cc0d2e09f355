//! The installed binary and its persisted cache record.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use super::error::AcquisitionError;
use super::types::CacheRecord;
use crate::db::Database;

/// Key of the cache record in the `state` table.
pub const CACHE_KEY: &str = "server.cache";

/// Owns the binary at a fixed path and the cache record describing it.
///
/// Record writes are single upserts, so they are atomic and durable.
pub struct ArtifactStore {
    binary_path: PathBuf,
    db: Mutex<Database>,
}

impl ArtifactStore {
    pub fn new(binary_path: PathBuf, db: Database) -> Self {
        Self {
            binary_path,
            db: Mutex::new(db),
        }
    }

    /// Path the binary is installed at.
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    /// Returns true if the binary is present.
    pub fn exists(&self) -> bool {
        self.binary_path.is_file()
    }

    /// Reads the cache record. A missing or unreadable record reads as the default.
    pub fn read(&self) -> Result<CacheRecord, AcquisitionError> {
        let Some(json) = self.db().get_state(CACHE_KEY)? else {
            return Ok(CacheRecord::default());
        };

        match serde_json::from_str(&json) {
            Ok(record) => Ok(record),
            Err(e) => {
                warn!(error = %e, "Corrupted cache record, starting fresh");
                Ok(CacheRecord::default())
            }
        }
    }

    /// Persists the cache record.
    pub fn write(&self, record: &CacheRecord) -> Result<(), AcquisitionError> {
        let json = serde_json::to_string(record)
            .map_err(|e| AcquisitionError::install(&self.binary_path, e))?;
        self.db().set_state(CACHE_KEY, &json)?;
        Ok(())
    }

    /// Forgets the cache record.
    pub fn clear(&self) -> Result<(), AcquisitionError> {
        self.db().delete_state(CACHE_KEY)?;
        Ok(())
    }

    /// Removes the binary. A missing file is fine; other failures are logged.
    pub fn remove(&self) {
        match std::fs::remove_file(&self.binary_path) {
            Ok(()) => debug!(path = %self.binary_path.display(), "Removed old binary"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %self.binary_path.display(), error = %e, "Failed to remove old binary");
            }
        }
    }

    // The connection holds no invariant a panicking writer could break.
    fn db(&self) -> MutexGuard<'_, Database> {
        self.db.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(temp: &TempDir) -> ArtifactStore {
        ArtifactStore::new(
            temp.path().join("bin").join("ls"),
            Database::open_in_memory().unwrap(),
        )
    }

    #[test]
    fn test_read_without_record_is_default() {
        let temp = TempDir::new().unwrap();
        assert_eq!(store(&temp).read().unwrap(), CacheRecord::default());
    }

    #[test]
    fn test_write_then_read() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let record = CacheRecord {
            last_check_timestamp: 1_700_000_000.25,
            release_id: Some(31337),
        };

        store.write(&record).unwrap();
        assert_eq!(store.read().unwrap(), record);

        store.clear().unwrap();
        assert_eq!(store.read().unwrap(), CacheRecord::default());
    }

    #[test]
    fn test_corrupted_record_reads_as_default() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        store.db().set_state(CACHE_KEY, "{oops").unwrap();
        assert_eq!(store.read().unwrap(), CacheRecord::default());
    }

    #[test]
    fn test_exists_and_remove() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        assert!(!store.exists());

        std::fs::create_dir_all(store.binary_path().parent().unwrap()).unwrap();
        std::fs::write(store.binary_path(), b"bin").unwrap();
        assert!(store.exists());

        store.remove();
        assert!(!store.exists());
        // Removing again is a no-op.
        store.remove();
    }

    #[test]
    fn test_directory_at_binary_path_is_not_a_binary() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        std::fs::create_dir_all(store.binary_path()).unwrap();
        assert!(!store.exists());
        // Removal failure is swallowed.
        store.remove();
    }
}

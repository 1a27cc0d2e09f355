//! Settings persisted to the database as a single JSON document.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::db::Database;

/// Settings key in the `settings` table.
const SETTINGS_KEY: &str = "settings";

/// Default release channel (the release tag that is tracked).
pub const DEFAULT_CHANNEL: &str = "nightly";

/// Default owner of the release repository.
pub const DEFAULT_OWNER: &str = "rune-rs";

/// Default release repository.
pub const DEFAULT_REPO: &str = "rune";

/// Default base name of the language server binary.
pub const DEFAULT_BINARY_NAME: &str = "rune-languageserver";

/// Default freshness window in seconds.
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 3600;

/// Smallest accepted freshness window in seconds.
pub const MIN_CHECK_INTERVAL_SECS: u64 = 60;

// =============================================================================
// Application Settings
// =============================================================================

/// User settings - persisted to database as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Explicit path to a language server binary. Skips acquisition entirely.
    pub server_path: Option<String>,

    /// Release tag to track.
    pub release_channel: String,

    /// Owner of the release repository.
    pub release_owner: String,

    /// Name of the release repository.
    pub release_repo: String,

    /// Base name of the binary; the OS name (`linux`, `macos`, `windows`) is appended.
    pub binary_name: String,

    /// How long a downloaded binary is trusted before checking for updates.
    pub check_interval_secs: u64,

    /// Ask before downloading a new binary.
    pub ask_before_download: bool,

    /// Extra environment for the server process; values may contain `${...}`.
    pub extra_env: serde_json::Map<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_path: None,
            release_channel: DEFAULT_CHANNEL.to_string(),
            release_owner: DEFAULT_OWNER.to_string(),
            release_repo: DEFAULT_REPO.to_string(),
            binary_name: DEFAULT_BINARY_NAME.to_string(),
            check_interval_secs: DEFAULT_CHECK_INTERVAL_SECS,
            ask_before_download: true,
            extra_env: serde_json::Map::new(),
        }
    }
}

impl Settings {
    /// Load settings from database, using defaults for missing values.
    ///
    /// If settings don't exist or can't be parsed, returns defaults.
    pub fn load(db: &Database) -> Self {
        let mut settings = Self::default();

        match db.get_setting(SETTINGS_KEY) {
            Ok(Some(json)) => match serde_json::from_str::<Settings>(&json) {
                Ok(loaded) => settings = loaded,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to parse settings, using defaults");
                }
            },
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read settings, using defaults");
            }
        }

        settings.validate();
        settings
    }

    /// Save settings to database.
    pub fn save(&self, db: &Database) -> anyhow::Result<()> {
        let json = serde_json::to_string(self)?;
        db.set_setting(SETTINGS_KEY, &json)?;
        Ok(())
    }

    /// Parse settings from a JSON document, validating the result.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let mut settings: Settings = serde_json::from_str(json)?;
        settings.validate();
        Ok(settings)
    }

    /// Validate and clamp settings to valid ranges.
    pub fn validate(&mut self) {
        self.check_interval_secs = self.check_interval_secs.max(MIN_CHECK_INTERVAL_SECS);

        restore_if_blank(&mut self.release_channel, DEFAULT_CHANNEL);
        restore_if_blank(&mut self.release_owner, DEFAULT_OWNER);
        restore_if_blank(&mut self.release_repo, DEFAULT_REPO);
        restore_if_blank(&mut self.binary_name, DEFAULT_BINARY_NAME);

        if self
            .server_path
            .as_deref()
            .is_some_and(|p| p.trim().is_empty())
        {
            self.server_path = None;
        }
    }

    /// The freshness window as a duration.
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }
}

fn restore_if_blank(value: &mut String, default: &str) {
    if value.trim().is_empty() {
        *value = default.to_string();
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default() {
        let settings = Settings::default();
        assert_eq!(settings.release_channel, "nightly");
        assert_eq!(settings.binary_name, "rune-languageserver");
        assert_eq!(settings.check_interval(), Duration::from_secs(3600));
        assert!(settings.ask_before_download);
        assert!(settings.server_path.is_none());
        assert!(settings.extra_env.is_empty());
    }

    #[test]
    fn test_settings_save_and_load_roundtrip() {
        let db = Database::open_in_memory().unwrap();

        let mut original = Settings::default();
        original.server_path = Some("/opt/ls".to_string());
        original.release_channel = "0.14.0".to_string();
        original.check_interval_secs = 120;
        original.ask_before_download = false;
        original
            .extra_env
            .insert("RUST_LOG".to_string(), "debug".into());

        original.save(&db).unwrap();
        assert_eq!(Settings::load(&db), original);
    }

    #[test]
    fn test_settings_load_returns_defaults_when_missing() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(Settings::load(&db), Settings::default());
    }

    #[test]
    fn test_settings_load_returns_defaults_on_invalid_json() {
        let db = Database::open_in_memory().unwrap();
        db.set_setting(SETTINGS_KEY, "not valid json {{").unwrap();
        assert_eq!(Settings::load(&db), Settings::default());
    }

    #[test]
    fn test_settings_partial_json_fills_defaults() {
        let settings = Settings::from_json(r#"{"release_channel": "stable"}"#).unwrap();
        assert_eq!(settings.release_channel, "stable");
        assert_eq!(settings.release_repo, DEFAULT_REPO);
        assert!(settings.ask_before_download);
    }

    #[test]
    fn test_settings_validate_clamps_interval() {
        let mut settings = Settings {
            check_interval_secs: 5,
            ..Settings::default()
        };
        settings.validate();
        assert_eq!(settings.check_interval_secs, MIN_CHECK_INTERVAL_SECS);
    }

    #[test]
    fn test_settings_validate_restores_blank_names() {
        let mut settings = Settings {
            release_channel: String::new(),
            binary_name: "  ".to_string(),
            server_path: Some(String::new()),
            ..Settings::default()
        };
        settings.validate();
        assert_eq!(settings.release_channel, DEFAULT_CHANNEL);
        assert_eq!(settings.binary_name, DEFAULT_BINARY_NAME);
        assert!(settings.server_path.is_none());
    }

    #[test]
    fn test_settings_from_json_rejects_garbage() {
        assert!(Settings::from_json("[1, 2]").is_err());
    }
}

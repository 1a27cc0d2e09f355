//! User configuration stored in SQLite.

mod settings;

pub use settings::{
    Settings, DEFAULT_BINARY_NAME, DEFAULT_CHANNEL, DEFAULT_CHECK_INTERVAL_SECS, DEFAULT_OWNER,
    DEFAULT_REPO, MIN_CHECK_INTERVAL_SECS,
};

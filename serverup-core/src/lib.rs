//! serverup core library
//!
//! Provides what an editor integration needs before it can start the language
//! server:
//!
//! - `${...}` expansion of the server environment
//! - Acquisition of the language server binary from the release feed
//! - Settings and acquisition state persisted in SQLite
//! - Per-component logging contexts

pub mod config;
pub mod db;
pub mod logging;
pub mod server;
pub mod variables;

// Re-exports for convenience
pub use config::Settings;
pub use db::Database;
pub use logging::LogContext;

pub use server::{
    Acquisition, AcquisitionError, AcquisitionManager, AcquisitionState, ArtifactStore,
    DownloadPrompt, ManagerConfig, Platform,
};

pub use variables::{ComputedVariable, EnvironmentProvider, HostEnvironment, VariableResolver};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

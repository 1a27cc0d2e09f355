//! Acquisition of the language server binary.
//!
//! This module decides whether the binary installed from the release feed can be
//! reused, must be re-checked against the feed, or has to be downloaded again.
//!
//! # Architecture
//!
//! - [`types`] - platform detection, artifact naming, states, cache record
//! - [`release`] - release metadata and the [`ReleaseClient`] seam
//! - [`downloader`] - streaming HTTPS download with checksum verification
//! - [`extractor`] - decompression and executable permissions
//! - [`store`] - the installed binary plus its persisted cache record
//! - [`manager`] - the ordered acquisition flow
//! - [`paths`] - default on-disk locations
//!
//! # Example
//!
//! ```ignore
//! use serverup_core::server::*;
//!
//! let outcome = manager.resolve().await?;
//! let path = outcome.into_path()?;
//! ```

pub mod downloader;
pub mod error;
pub mod extractor;
pub mod manager;
pub mod paths;
pub mod release;
pub mod store;
pub mod types;

pub use downloader::{ArtifactDownloader, DownloadProgress, HttpDownloader, ProgressFn};
pub use error::AcquisitionError;
pub use manager::{
    binary_path, unix_now, Acquisition, AcquisitionManager, AutoConfirm, DownloadPrompt,
    ManagerConfig,
};
pub use release::{find_asset, Asset, GithubReleaseClient, Release, ReleaseClient};
pub use store::ArtifactStore;
pub use types::{AcquisitionState, ArtifactName, CacheRecord, Platform};

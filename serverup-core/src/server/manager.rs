//! Acquisition manager - decides whether to reuse, re-check or reinstall the
//! language server binary.
//!
//! The decision is an ordered sequence of short-circuiting checks:
//!
//! 1. an explicitly configured path wins
//! 2. no published build for this platform ends in `Unsupported`
//! 3. a present binary checked within the freshness window is reused
//! 4. otherwise the check time is persisted and the release feed is consulted
//! 5. the release must carry the asset for this platform
//! 6. a present binary with the same asset id is current
//! 7. the user may decline the download
//! 8. the new build is downloaded, decompressed, made executable and recorded

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn, Instrument};

use super::downloader::{ArtifactDownloader, DownloadProgress, HttpDownloader, ProgressFn};
use super::error::AcquisitionError;
use super::extractor::{decompress, make_executable, Compression};
use super::paths::{ensure_dir, expand_home};
use super::release::{Asset, GithubReleaseClient, Release, ReleaseClient};
use super::store::ArtifactStore;
use super::types::{AcquisitionState, ArtifactName, CacheRecord, Platform};
use crate::config::Settings;
use crate::db::Database;
use crate::logging::LogContext;

/// Current Unix time in seconds.
pub fn unix_now() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}

// ============================================================================
// Configuration
// ============================================================================

/// The settings the acquisition flow depends on.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagerConfig {
    pub server_path: Option<String>,
    pub channel: String,
    pub binary_name: String,
    pub check_interval: Duration,
    pub ask_before_download: bool,
}

impl ManagerConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            server_path: settings.server_path.clone(),
            channel: settings.release_channel.clone(),
            binary_name: settings.binary_name.clone(),
            check_interval: settings.check_interval(),
            ask_before_download: settings.ask_before_download,
        }
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

// ============================================================================
// Download Confirmation
// ============================================================================

/// Asks whether a new build should be downloaded.
#[async_trait]
pub trait DownloadPrompt: Send + Sync {
    /// Returns true to proceed with the download.
    ///
    /// `replacing` is true when a previously installed binary will be replaced.
    async fn confirm_download(&self, release: &Release, asset: &Asset, replacing: bool) -> bool;
}

/// Answers every confirmation with yes.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoConfirm;

#[async_trait]
impl DownloadPrompt for AutoConfirm {
    async fn confirm_download(&self, _release: &Release, _asset: &Asset, _replacing: bool) -> bool {
        true
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// Where the flow ended and the binary to use, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acquisition {
    pub state: AcquisitionState,
    pub path: Option<PathBuf>,
}

impl Acquisition {
    fn with_path(state: AcquisitionState, path: impl Into<PathBuf>) -> Self {
        debug_assert!(state.is_terminal());
        Self {
            state,
            path: Some(path.into()),
        }
    }

    fn without_path(state: AcquisitionState) -> Self {
        debug_assert!(state.is_terminal());
        Self { state, path: None }
    }

    /// Converts the outcome into a usable path.
    pub fn into_path(self) -> Result<PathBuf, AcquisitionError> {
        match (self.state, self.path) {
            (AcquisitionState::Unsupported, _) => Err(AcquisitionError::UnsupportedPlatform(
                super::types::host_description(),
            )),
            (_, Some(path)) => Ok(path),
            (_, None) => Err(AcquisitionError::NotInstalled),
        }
    }
}

// ============================================================================
// Acquisition Manager
// ============================================================================

/// Produces a usable language server path.
pub struct AcquisitionManager {
    config: ManagerConfig,
    artifact: Option<ArtifactName>,
    store: ArtifactStore,
    releases: Arc<dyn ReleaseClient>,
    downloader: Arc<dyn ArtifactDownloader>,
    prompt: Arc<dyn DownloadPrompt>,
    progress: Option<Arc<ProgressFn>>,
    log: LogContext,
}

impl AcquisitionManager {
    /// Creates a manager for `platform` (`None` if no build is published for it).
    ///
    /// Confirmations are answered with yes until [`with_prompt`](Self::with_prompt)
    /// installs a real prompt.
    pub fn new(
        config: ManagerConfig,
        platform: Option<Platform>,
        store: ArtifactStore,
        releases: Arc<dyn ReleaseClient>,
        downloader: Arc<dyn ArtifactDownloader>,
    ) -> Self {
        let artifact = platform.map(|p| ArtifactName::new(config.binary_name.clone(), p));
        Self {
            config,
            artifact,
            store,
            releases,
            downloader,
            prompt: Arc::new(AutoConfirm),
            progress: None,
            log: LogContext::disabled(),
        }
    }

    /// Creates a manager for the host platform that installs from GitHub releases.
    pub fn for_host(settings: &Settings, db: Database, bin_dir: &Path) -> Self {
        let platform = Platform::detect();
        let config = ManagerConfig::from_settings(settings);
        let store = ArtifactStore::new(binary_path(bin_dir, &config.binary_name, platform), db);
        let releases = GithubReleaseClient::new(&settings.release_owner, &settings.release_repo);
        Self::new(
            config,
            platform,
            store,
            Arc::new(releases),
            Arc::new(HttpDownloader::new()),
        )
    }

    pub fn with_prompt(mut self, prompt: Arc<dyn DownloadPrompt>) -> Self {
        self.prompt = prompt;
        self
    }

    /// Receives progress updates while a build downloads.
    pub fn with_progress(mut self, progress: Arc<ProgressFn>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_log(mut self, log: LogContext) -> Self {
        self.log = log;
        self
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Naming of the artifact for this platform, if one is published.
    pub fn artifact(&self) -> Option<&ArtifactName> {
        self.artifact.as_ref()
    }

    /// Runs the acquisition flow at the current time.
    pub async fn resolve(&self) -> Result<Acquisition, AcquisitionError> {
        self.resolve_at(unix_now()).await
    }

    /// Runs the acquisition flow as if the current time were `now` (Unix seconds).
    pub async fn resolve_at(&self, now: f64) -> Result<Acquisition, AcquisitionError> {
        let span = self.log.span().clone();
        self.run(now).instrument(span).await
    }

    /// Releases the logging context.
    pub fn close(self) {
        self.log.close();
    }

    async fn run(&self, now: f64) -> Result<Acquisition, AcquisitionError> {
        if let Some(configured) = &self.config.server_path {
            let path = expand_home(configured);
            info!(path = %path.display(), "Using configured language server");
            return Ok(Acquisition::with_path(AcquisitionState::Configured, path));
        }

        let Some(artifact) = &self.artifact else {
            warn!(host = %super::types::host_description(), "No language server build for this platform");
            return Ok(Acquisition::without_path(AcquisitionState::Unsupported));
        };

        let binary = self.store.binary_path();
        let record = self.store.read()?;
        let exists = self.store.exists();

        if exists && record.is_fresh(now, self.config.check_interval) {
            debug!(path = %binary.display(), "Language server checked recently, reusing it");
            return Ok(Acquisition::with_path(AcquisitionState::Cached, binary));
        }

        debug!(state = %AcquisitionState::CheckNeeded, channel = %self.config.channel, "Checking for a new build");
        let mut record = CacheRecord {
            last_check_timestamp: now,
            ..record
        };
        self.store.write(&record)?;

        let release = self.releases.fetch_release(&self.config.channel).await?;

        let asset_name = artifact.asset_name();
        let asset = release
            .asset_named(&asset_name)
            .ok_or_else(|| AcquisitionError::BadRelease {
                tag: release.tag.clone(),
                asset: asset_name.clone(),
            })?;

        if exists && record.release_id == Some(asset.id) {
            info!(release = %release.tag, asset_id = asset.id, "Language server is up to date");
            return Ok(Acquisition::with_path(AcquisitionState::UpToDate, binary));
        }

        info!(
            state = %AcquisitionState::UpdateAvailable,
            release = %release.tag,
            asset_id = asset.id,
            installed = ?record.release_id,
            "New language server build available"
        );

        if self.config.ask_before_download
            && !self.prompt.confirm_download(&release, asset, exists).await
        {
            info!("Download declined");
            return Ok(if exists {
                Acquisition::with_path(AcquisitionState::Declined, binary)
            } else {
                Acquisition::without_path(AcquisitionState::Missing)
            });
        }

        debug!(state = %AcquisitionState::Downloading, asset = %asset.name, "Installing language server");
        let bytes = self.install(asset).await?;

        record.release_id = Some(asset.id);
        self.store.write(&record)?;

        info!(
            path = %binary.display(),
            release = %release.tag,
            bytes,
            "Language server installed"
        );
        Ok(Acquisition::with_path(AcquisitionState::Installed, binary))
    }

    /// Replaces the binary with `asset`, returning the installed size.
    ///
    /// The old binary stays in place until the new one is staged next to it.
    async fn install(&self, asset: &Asset) -> Result<u64, AcquisitionError> {
        let binary = self.store.binary_path();
        let download = sibling(binary, "download");
        let partial = sibling(binary, "partial");

        if let Some(dir) = binary.parent() {
            ensure_dir(dir).map_err(|e| AcquisitionError::install(dir, format!("{e:#}")))?;
        }

        let last_decile = AtomicU8::new(u8::MAX);
        let report = |progress: DownloadProgress| {
            // Unknown totals share one bucket so they are logged once.
            let decile = progress.percent.map_or(u8::MAX - 1, |p| (p / 10.0) as u8);
            if last_decile.swap(decile, Ordering::Relaxed) != decile {
                debug!(
                    bytes = progress.bytes_downloaded,
                    percent = ?progress.percent,
                    "Download progress"
                );
            }
            if let Some(cb) = &self.progress {
                cb(progress);
            }
        };

        let result = match self.downloader.download(asset, &download, &report).await {
            Ok(_) => stage(&download, &partial, binary, Compression::from_name(&asset.name))
                .and_then(|bytes| {
                    self.store.remove();
                    std::fs::rename(&partial, binary)
                        .map_err(|e| AcquisitionError::install(binary, e))?;
                    Ok(bytes)
                }),
            Err(e) => Err(e),
        };

        remove_quietly(&download);
        if result.is_err() {
            remove_quietly(&partial);
        }
        result
    }
}

/// Decompresses the download next to the binary and marks it executable.
fn stage(
    download: &Path,
    partial: &Path,
    binary: &Path,
    compression: Compression,
) -> Result<u64, AcquisitionError> {
    let bytes = decompress(download, partial, compression)
        .map_err(|e| AcquisitionError::install(binary, format!("{e:#}")))?;
    make_executable(partial).map_err(|e| AcquisitionError::install(binary, format!("{e:#}")))?;
    Ok(bytes)
}

/// Where the binary for `platform` is installed inside `bin_dir`.
pub fn binary_path(bin_dir: &Path, binary_name: &str, platform: Option<Platform>) -> PathBuf {
    match platform {
        Some(platform) => bin_dir.join(ArtifactName::new(binary_name, platform).file_name()),
        None => bin_dir.join(binary_name),
    }
}

fn sibling(path: &Path, extension: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(extension);
    path.with_file_name(name)
}

fn remove_quietly(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Failed to clean up");
        }
    }
}

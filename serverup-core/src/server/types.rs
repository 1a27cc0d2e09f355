//! Core types for language server acquisition.
//!
//! Platform detection, artifact naming, acquisition states and the persisted
//! cache record.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

// ============================================================================
// Platform Detection
// ============================================================================

/// An operating system with published language server builds.
///
/// Builds are published per OS, not per architecture: `macos` covers both
/// Intel and Apple Silicon, and Linux builds are x86_64 only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Linux,
    Macos,
    Windows,
}

impl Platform {
    /// Returns all platforms with published builds.
    pub fn all() -> &'static [Platform] {
        &[Self::Linux, Self::Macos, Self::Windows]
    }

    /// Detects the current platform at compile time.
    ///
    /// Returns `None` if no build is published for this platform.
    pub fn detect() -> Option<Self> {
        #[cfg(all(target_os = "linux", target_arch = "x86_64"))]
        {
            Some(Platform::Linux)
        }
        #[cfg(target_os = "macos")]
        {
            Some(Platform::Macos)
        }
        #[cfg(all(target_os = "windows", target_arch = "x86_64"))]
        {
            Some(Platform::Windows)
        }
        #[cfg(not(any(
            all(target_os = "linux", target_arch = "x86_64"),
            target_os = "macos",
            all(target_os = "windows", target_arch = "x86_64"),
        )))]
        {
            None
        }
    }

    /// OS name used as the artifact name suffix (`std::env::consts::OS` spelling).
    pub fn os(&self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Macos => "macos",
            Self::Windows => "windows",
        }
    }

    /// Executable file extension, including the dot.
    pub fn exe_suffix(&self) -> &'static str {
        match self {
            Self::Windows => ".exe",
            _ => "",
        }
    }

    /// Returns a human-readable description of the platform.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Linux => "Linux (x86_64)",
            Self::Macos => "macOS",
            Self::Windows => "Windows (x86_64)",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Description of the host, for error messages when no platform matches.
pub fn host_description() -> String {
    format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH)
}

// ============================================================================
// Artifact Naming
// ============================================================================

/// Naming of the language server artifact for one platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactName {
    binary_name: String,
    platform: Platform,
}

impl ArtifactName {
    pub fn new(binary_name: impl Into<String>, platform: Platform) -> Self {
        Self {
            binary_name: binary_name.into(),
            platform,
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Name of the release asset, e.g. `rune-languageserver-linux.gz`.
    pub fn asset_name(&self) -> String {
        format!("{}-{}.gz", self.binary_name, self.platform.os())
    }

    /// File name of the installed binary.
    pub fn file_name(&self) -> String {
        format!(
            "{}-{}{}",
            self.binary_name,
            self.platform.os(),
            self.platform.exe_suffix()
        )
    }
}

// ============================================================================
// Acquisition State
// ============================================================================

/// States of the acquisition flow.
///
/// `CheckNeeded`, `UpdateAvailable` and `Downloading` are transient; every other
/// state is terminal and is reported in an [`Acquisition`](super::Acquisition).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AcquisitionState {
    /// An explicit path was configured; nothing else was consulted.
    Configured,
    /// Local binary present and within the freshness window.
    Cached,
    /// The remote release feed is being consulted.
    CheckNeeded,
    /// Remote release checked; the local binary is current.
    UpToDate,
    /// The release carries a build other than the installed one.
    UpdateAvailable,
    /// The new build is being downloaded and installed.
    Downloading,
    /// A newer build was installed.
    Installed,
    /// No build is published for this platform.
    Unsupported,
    /// The user declined the download and no local binary exists.
    Missing,
    /// The user declined the download; the old binary is still used.
    Declined,
}

impl AcquisitionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configured => "configured",
            Self::Cached => "cached",
            Self::CheckNeeded => "check-needed",
            Self::UpToDate => "up-to-date",
            Self::UpdateAvailable => "update-available",
            Self::Downloading => "downloading",
            Self::Installed => "installed",
            Self::Unsupported => "unsupported",
            Self::Missing => "missing",
            Self::Declined => "declined",
        }
    }
}

impl AcquisitionState {
    /// Returns true for states that end the flow.
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            Self::CheckNeeded | Self::UpdateAvailable | Self::Downloading
        )
    }
}

impl fmt::Display for AcquisitionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Cache Record
// ============================================================================

/// Persisted bookkeeping for the installed binary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheRecord {
    /// Unix time (seconds) of the last release check.
    #[serde(default)]
    pub last_check_timestamp: f64,
    /// Asset id of the installed build.
    #[serde(default)]
    pub release_id: Option<u64>,
}

impl CacheRecord {
    /// Returns true if the last check happened no longer than `window` before `now`.
    pub fn is_fresh(&self, now: f64, window: Duration) -> bool {
        now - self.last_check_timestamp <= window.as_secs_f64()
    }
}

use std::path::PathBuf;
use thiserror::Error;

/// Failures of the acquisition flow.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("no language server build is published for {0}")]
    UnsupportedPlatform(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed release metadata: {0}")]
    MalformedRelease(String),

    #[error("release {tag} has no asset named {asset}")]
    BadRelease { tag: String, asset: String },

    #[error("failed to install {}: {message}", .path.display())]
    Install { path: PathBuf, message: String },

    #[error("language server is not installed")]
    NotInstalled,

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl AcquisitionError {
    pub(crate) fn install(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::Install {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Returns true for transport failures, after which a previously installed
    /// binary is still usable.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<reqwest::Error> for AcquisitionError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = AcquisitionError::BadRelease {
            tag: "nightly".into(),
            asset: "ls-linux.gz".into(),
        };
        assert_eq!(
            err.to_string(),
            "release nightly has no asset named ls-linux.gz"
        );

        let err = AcquisitionError::install("/tmp/ls", "disk full");
        assert!(err.to_string().ends_with("disk full"));
        assert!(!err.is_network());
        assert!(AcquisitionError::Network("timeout".into()).is_network());
    }
}

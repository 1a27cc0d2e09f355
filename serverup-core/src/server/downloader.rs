//! Streaming download of release assets with progress reporting and
//! checksum verification.

use async_trait::async_trait;
use futures::StreamExt;
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

use super::error::AcquisitionError;
use super::release::Asset;

// ============================================================================
// URL Validation
// ============================================================================

/// Checks that a download URL is well formed and uses HTTPS.
pub fn validate_url(url_str: &str) -> Result<Url, AcquisitionError> {
    let url = Url::parse(url_str)
        .map_err(|e| AcquisitionError::MalformedRelease(format!("invalid URL {url_str}: {e}")))?;

    if url.scheme() != "https" {
        return Err(AcquisitionError::MalformedRelease(format!(
            "download URL must use HTTPS: {url_str}"
        )));
    }
    if url.host_str().is_none() {
        return Err(AcquisitionError::MalformedRelease(format!(
            "download URL has no host: {url_str}"
        )));
    }

    Ok(url)
}

// ============================================================================
// Download Progress
// ============================================================================

/// Progress information during a download.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadProgress {
    /// Bytes downloaded so far.
    pub bytes_downloaded: u64,
    /// Total bytes expected (Content-Length or the size published with the asset).
    pub total_bytes: Option<u64>,
    /// Progress percentage (0.0 to 100.0), or None if total is unknown.
    pub percent: Option<f32>,
}

impl DownloadProgress {
    pub fn new(bytes_downloaded: u64, total_bytes: Option<u64>) -> Self {
        let percent = total_bytes.map(|total| {
            if total > 0 {
                (bytes_downloaded as f32 / total as f32) * 100.0
            } else {
                0.0
            }
        });

        Self {
            bytes_downloaded,
            total_bytes,
            percent,
        }
    }
}

/// Callback receiving download progress.
///
/// Owned callbacks are `'static`; [`ArtifactDownloader::download`] borrows any
/// callback for the duration of one download.
pub type ProgressFn = dyn Fn(DownloadProgress) + Send + Sync;

// ============================================================================
// Downloader
// ============================================================================

/// Transport that fetches an asset to a local file.
#[async_trait]
pub trait ArtifactDownloader: Send + Sync {
    /// Downloads `asset` to `dest`, returning the number of bytes written.
    ///
    /// On failure `dest` may be left partially written; the caller owns cleanup.
    async fn download(
        &self,
        asset: &Asset,
        dest: &Path,
        progress: &(dyn Fn(DownloadProgress) + Send + Sync),
    ) -> Result<u64, AcquisitionError>;
}

/// Downloads over HTTPS with `reqwest`, streaming to disk.
#[derive(Debug, Clone, Default)]
pub struct HttpDownloader {
    client: reqwest::Client,
}

impl HttpDownloader {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArtifactDownloader for HttpDownloader {
    async fn download(
        &self,
        asset: &Asset,
        dest: &Path,
        progress: &(dyn Fn(DownloadProgress) + Send + Sync),
    ) -> Result<u64, AcquisitionError> {
        let url = validate_url(&asset.download_url)?;
        info!("Downloading {} to {}", url, dest.display());

        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AcquisitionError::Network(format!(
                "download of {} failed with status {}",
                asset.name, status
            )));
        }

        let total_bytes = response.content_length().or(asset.size);
        debug!("Content-Length: {:?}", total_bytes);

        let mut file = File::create(dest)
            .await
            .map_err(|e| AcquisitionError::install(dest, e))?;

        let mut stream = response.bytes_stream();
        let mut bytes_downloaded: u64 = 0;
        let mut hasher = Sha256::new();

        progress(DownloadProgress::new(0, total_bytes));

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            hasher.update(&chunk);
            file.write_all(&chunk)
                .await
                .map_err(|e| AcquisitionError::install(dest, e))?;

            bytes_downloaded += chunk.len() as u64;
            progress(DownloadProgress::new(bytes_downloaded, total_bytes));
        }

        file.flush()
            .await
            .map_err(|e| AcquisitionError::install(dest, e))?;
        drop(file);

        if let Some(expected) = asset.sha256() {
            let actual = format_sha256_hex(&hasher.finalize());
            verify_sha256(dest, expected, &actual).await?;
            debug!("SHA256 verified: {}", actual);
        }

        info!(
            "Download complete: {} bytes written to {}",
            bytes_downloaded,
            dest.display()
        );
        Ok(bytes_downloaded)
    }
}

/// Compares digests, deleting `dest` on mismatch.
async fn verify_sha256(dest: &Path, expected: &str, actual: &str) -> Result<(), AcquisitionError> {
    if actual == expected.to_lowercase() {
        return Ok(());
    }

    let _ = tokio::fs::remove_file(dest).await;
    Err(AcquisitionError::install(
        dest,
        format!("SHA256 checksum mismatch (expected {expected}, got {actual})"),
    ))
}

/// Formats a SHA256 hash as lowercase hex.
pub fn format_sha256_hex(hash: &[u8]) -> String {
    hash.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_download_progress_calculation() {
        let progress = DownloadProgress::new(50, Some(100));
        assert_eq!(progress.percent, Some(50.0));

        assert_eq!(DownloadProgress::new(50, None).percent, None);
        assert_eq!(DownloadProgress::new(0, Some(0)).percent, Some(0.0));
        assert_eq!(DownloadProgress::new(100, Some(100)).percent, Some(100.0));
    }

    #[test]
    fn test_validate_url_https_required() {
        assert!(validate_url("http://github.com/file.gz").is_err());
        assert!(validate_url("https://github.com/file.gz").is_ok());
        assert!(validate_url("https://mirror.example.org/ls.gz").is_ok());
    }

    #[test]
    fn test_validate_url_invalid() {
        assert!(validate_url("not-a-url").is_err());
        assert!(validate_url("").is_err());
        assert!(validate_url("file:///etc/passwd").is_err());
    }

    #[test]
    fn test_format_sha256_hex() {
        let empty_hash = Sha256::digest(b"");
        assert_eq!(
            format_sha256_hex(&empty_hash),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[tokio::test]
    async fn test_verify_sha256_mismatch_removes_file() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("ls.download");
        std::fs::write(&dest, b"tampered").unwrap();

        let err = verify_sha256(&dest, "00ff", "abcd").await.unwrap_err();
        assert!(matches!(err, AcquisitionError::Install { .. }));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_verify_sha256_is_case_insensitive() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("ls.download");
        std::fs::write(&dest, b"ok").unwrap();

        verify_sha256(&dest, "ABCD", "abcd").await.unwrap();
        assert!(dest.exists());
    }

    #[tokio::test]
    async fn test_http_downloader_rejects_plain_http() {
        let temp = TempDir::new().unwrap();
        let asset = Asset {
            id: 1,
            name: "ls.gz".into(),
            download_url: "http://github.com/ls.gz".into(),
            digest: None,
            size: None,
        };

        let err = HttpDownloader::new()
            .download(&asset, &temp.path().join("ls"), &|_: DownloadProgress| {})
            .await
            .unwrap_err();
        assert!(matches!(err, AcquisitionError::MalformedRelease(_)));
    }
}

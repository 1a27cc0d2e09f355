//! Release metadata and the release feed client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::AcquisitionError;

/// Default GitHub REST endpoint.
pub const GITHUB_API: &str = "https://api.github.com";

const USER_AGENT: &str = concat!("serverup/", env!("CARGO_PKG_VERSION"));
const ACCEPT: &str = "application/vnd.github+json";

// ============================================================================
// Release Metadata
// ============================================================================

/// A downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: u64,
    pub name: String,
    #[serde(rename = "browser_download_url")]
    pub download_url: String,
    /// `sha256:<hex>` when the feed publishes it.
    #[serde(default)]
    pub digest: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

impl Asset {
    /// Expected SHA256 of the asset as lowercase hex, if published.
    pub fn sha256(&self) -> Option<&str> {
        self.digest.as_deref()?.strip_prefix("sha256:")
    }
}

/// A published release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub id: u64,
    #[serde(rename = "tag_name")]
    pub tag: String,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

impl Release {
    /// Finds an asset by exact name.
    pub fn asset_named(&self, name: &str) -> Option<&Asset> {
        find_asset(self, |asset| asset.name == name)
    }
}

/// Returns the first asset, in release order, matching `predicate`.
pub fn find_asset<P>(release: &Release, mut predicate: P) -> Option<&Asset>
where
    P: FnMut(&Asset) -> bool,
{
    release.assets.iter().find(|asset| predicate(asset))
}

// ============================================================================
// Release Client
// ============================================================================

/// Source of release metadata. Pure query, no side effects.
#[async_trait]
pub trait ReleaseClient: Send + Sync {
    /// Fetches the release published under `channel`.
    async fn fetch_release(&self, channel: &str) -> Result<Release, AcquisitionError>;
}

/// Fetches releases from the GitHub REST API.
#[derive(Debug, Clone)]
pub struct GithubReleaseClient {
    http: reqwest::Client,
    api_base: String,
    owner: String,
    repo: String,
}

impl GithubReleaseClient {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: GITHUB_API.to_string(),
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// Uses another API endpoint (GitHub Enterprise or a mirror).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// URL of the release tagged `channel`.
    pub fn release_url(&self, channel: &str) -> String {
        format!(
            "{}/repos/{}/{}/releases/tags/{}",
            self.api_base, self.owner, self.repo, channel
        )
    }
}

#[async_trait]
impl ReleaseClient for GithubReleaseClient {
    async fn fetch_release(&self, channel: &str) -> Result<Release, AcquisitionError> {
        let url = self.release_url(channel);
        debug!(url = %url, "Fetching release metadata");

        let response = self
            .http
            .get(&url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AcquisitionError::Network(format!(
                "{} returned {}",
                url, status
            )));
        }

        let body = response.text().await?;
        parse_release(&body)
    }
}

/// Parses a release feed document.
pub fn parse_release(body: &str) -> Result<Release, AcquisitionError> {
    serde_json::from_str(body).map_err(|e| AcquisitionError::MalformedRelease(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"{
        "id": 99,
        "tag_name": "nightly",
        "draft": false,
        "assets": [
            {
                "id": 1,
                "name": "ls-linux.gz",
                "browser_download_url": "https://github.com/o/r/releases/download/nightly/a.gz",
                "digest": "sha256:abc123",
                "size": 1024
            },
            {
                "id": 2,
                "name": "ls-windows.gz",
                "browser_download_url": "https://github.com/o/r/releases/download/nightly/b.gz"
            }
        ]
    }"#;

    #[test]
    fn test_parse_release_feed() {
        let release = parse_release(FEED).unwrap();
        assert_eq!(release.id, 99);
        assert_eq!(release.tag, "nightly");
        assert_eq!(release.assets.len(), 2);
        assert_eq!(release.assets[0].sha256(), Some("abc123"));
        assert_eq!(release.assets[0].size, Some(1024));
        assert_eq!(release.assets[1].sha256(), None);
    }

    #[test]
    fn test_parse_release_rejects_garbage() {
        let err = parse_release("<html>rate limited</html>").unwrap_err();
        assert!(matches!(err, AcquisitionError::MalformedRelease(_)));

        let err = parse_release(r#"{"id": 1}"#).unwrap_err();
        assert!(matches!(err, AcquisitionError::MalformedRelease(_)));
    }

    #[test]
    fn test_asset_named_is_exact() {
        let release = parse_release(FEED).unwrap();
        assert_eq!(
            release.asset_named("ls-windows.gz").map(|a| a.id),
            Some(2)
        );
        assert!(release.asset_named("ls-windows").is_none());
    }

    #[test]
    fn test_find_asset_returns_first_match() {
        let release = parse_release(FEED).unwrap();
        let first = find_asset(&release, |a| a.name.starts_with("ls-")).unwrap();
        assert_eq!(first.id, 1);
        assert!(find_asset(&release, |a| a.name.ends_with(".zip")).is_none());
    }

    #[test]
    fn test_digest_without_known_prefix_is_ignored() {
        let asset = Asset {
            id: 1,
            name: "x".into(),
            download_url: "https://example.com/x".into(),
            digest: Some("md5:ffff".into()),
            size: None,
        };
        assert_eq!(asset.sha256(), None);
    }

    #[test]
    fn test_release_url() {
        let client = GithubReleaseClient::new("rune-rs", "rune")
            .with_api_base("https://ghe.example.com/api/v3/");
        assert_eq!(
            client.release_url("nightly"),
            "https://ghe.example.com/api/v3/repos/rune-rs/rune/releases/tags/nightly"
        );
    }
}

//! GitHub release index client

use crate::error::{ProvisionError, Result};
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::Once;
use std::time::Duration;
use tracing::debug;

/// Public GitHub REST API
pub const GITHUB_API: &str = "https://api.github.com";

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Latest release descriptor
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    /// Release tag, when present
    #[serde(default)]
    pub tag_name: Option<String>,
    /// Published assets
    #[serde(default)]
    pub assets: Vec<Asset>,
}

/// One downloadable release asset
#[derive(Debug, Clone, Deserialize)]
pub struct Asset {
    /// File name of the asset
    pub name: String,
    /// Direct download URL
    pub browser_download_url: String,
}

impl Release {
    /// First asset whose name ends with `suffix`
    pub fn find_asset(&self, suffix: &str) -> Option<&Asset> {
        self.assets.iter().find(|asset| asset.name.ends_with(suffix))
    }
}

fn ensure_crypto_provider() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Client for the release index and asset downloads
#[derive(Debug, Clone)]
pub struct ReleaseClient {
    client: Client,
    api_base: String,
}

impl ReleaseClient {
    /// Client against the public GitHub API
    pub fn new() -> Result<Self> {
        Self::with_api_base(GITHUB_API)
    }

    /// Client against a custom API base URL
    pub fn with_api_base(api_base: impl Into<String>) -> Result<Self> {
        ensure_crypto_provider();
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the latest release of `owner/repo`.
    pub async fn latest_release(&self, owner: &str, repo: &str) -> Result<Release> {
        let url = format!("{}/repos/{owner}/{repo}/releases/latest", self.api_base);
        debug!("Fetching latest release: {url}");

        let body = self.get(&url).await?;
        serde_json::from_slice(&body).map_err(|source| ProvisionError::InvalidRelease {
            repo: format!("{owner}/{repo}"),
            source,
        })
    }

    /// Download an asset body.
    pub async fn download(&self, url: &str) -> Result<Bytes> {
        self.get(url).await
    }

    async fn get(&self, url: &str) -> Result<Bytes> {
        let response = self.client.get(url).send().await?;

        match response.status() {
            StatusCode::OK => Ok(response.bytes().await?),
            status => Err(ProvisionError::HttpStatus {
                url: url.to_string(),
                status,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RELEASE_JSON: &str = r#"{
        "tag_name": "DepotDownloader_3.4.0",
        "assets": [
            {"name": "DepotDownloader-linux-arm64.zip", "browser_download_url": "https://example.com/arm64.zip"},
            {"name": "DepotDownloader-linux-x64.zip", "browser_download_url": "https://example.com/x64.zip"},
            {"name": "DepotDownloader-windows-x64.zip", "browser_download_url": "https://example.com/win.zip"}
        ]
    }"#;

    #[test]
    fn test_find_asset_by_suffix() {
        let release: Release = serde_json::from_str(RELEASE_JSON).unwrap();
        let asset = release.find_asset("linux-x64.zip").unwrap();
        assert_eq!(asset.browser_download_url, "https://example.com/x64.zip");
        assert!(release.find_asset("macos-x64.zip").is_none());
    }

    #[tokio::test]
    async fn test_latest_release() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/repos/SteamRE/DepotDownloader/releases/latest"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RELEASE_JSON))
            .mount(&mock_server)
            .await;

        let client = ReleaseClient::with_api_base(mock_server.uri()).unwrap();
        let release = client
            .latest_release("SteamRE", "DepotDownloader")
            .await
            .unwrap();

        assert_eq!(release.tag_name.as_deref(), Some("DepotDownloader_3.4.0"));
        assert_eq!(release.assets.len(), 3);
    }

    #[tokio::test]
    async fn test_latest_release_not_found() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/repos/nobody/nothing/releases/latest"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let client = ReleaseClient::with_api_base(mock_server.uri()).unwrap();
        let err = client.latest_release("nobody", "nothing").await.unwrap_err();

        assert!(matches!(
            err,
            ProvisionError::HttpStatus {
                status: StatusCode::NOT_FOUND,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_latest_release_invalid_json() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/repos/a/b/releases/latest"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let client = ReleaseClient::with_api_base(mock_server.uri()).unwrap();
        let err = client.latest_release("a", "b").await.unwrap_err();

        assert!(matches!(err, ProvisionError::InvalidRelease { .. }));
    }
}

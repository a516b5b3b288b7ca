//! Pexels video search client.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use reelminer_shared::{CatalogVideo, DownloadedAsset, ReelMinerError, Result, VideoCatalog};

/// Production API origin.
pub const DEFAULT_BASE_URL: &str = "https://api.pexels.com";

/// Request timeout for search and download calls.
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// User-Agent string for catalog requests.
const USER_AGENT: &str = concat!("ReelMiner/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    videos: Vec<CatalogVideo>,
}

/// HTTP client for the Pexels video API.
#[derive(Debug, Clone)]
pub struct PexelsClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl PexelsClient {
    /// Client against the production API.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Client against another origin (a mock server in tests).
    pub fn with_base_url(api_key: impl Into<String>, base_url: &str) -> Result<Self> {
        let parsed = Url::parse(base_url).map_err(|e| {
            ReelMinerError::config(format!("invalid catalog base URL '{base_url}': {e}"))
        })?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ReelMinerError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl VideoCatalog for PexelsClient {
    #[instrument(skip_all, fields(query = %query, page = page, page_size = page_size))]
    async fn search(&self, query: &str, page: u32, page_size: u32) -> Result<Vec<CatalogVideo>> {
        let url = format!("{}/videos/search", self.base_url);
        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, &self.api_key)
            .query(&[
                ("query", query.to_string()),
                ("page", page.to_string()),
                ("per_page", page_size.to_string()),
            ])
            .send()
            .await
            .map_err(|e| ReelMinerError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReelMinerError::Catalog(format!(
                "search for '{query}' returned HTTP {status}"
            )));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| ReelMinerError::parse(format!("invalid search response: {e}")))?;

        debug!(results = body.videos.len(), "search page received");
        Ok(body.videos)
    }

    async fn download(&self, url: &str) -> Result<DownloadedAsset> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ReelMinerError::Network(format!("{url}: {e}")))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ReelMinerError::Network(format!("{url}: failed to read body: {e}")))?;

        Ok(DownloadedAsset {
            status,
            content_type,
            bytes: bytes.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn load_fixture(name: &str) -> String {
        let path = format!("../../../fixtures/json/{name}");
        std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
    }

    #[tokio::test]
    async fn search_sends_key_and_paging() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/videos/search"))
            .and(header("authorization", "test-key"))
            .and(query_param("query", "PLAYA"))
            .and(query_param("page", "3"))
            .and(query_param("per_page", "4"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(load_fixture("pexels_search.fixture.json"), "application/json"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = PexelsClient::with_base_url("test-key", &server.uri()).unwrap();
        let videos = client.search("PLAYA", 3, 4).await.unwrap();

        assert_eq!(videos.len(), 2);
        assert_eq!(videos[0].id, 1_093_662);
        assert_eq!(videos[0].video_files[0].width, Some(1080));
        assert_eq!(videos[1].video_files[0].width, None);
    }

    #[tokio::test]
    async fn search_with_empty_body_is_empty() {
        let server = MockServer::start().await;
        Mock::given(path("/videos/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"page": 4, "videos": []}"#))
            .mount(&server)
            .await;

        let client = PexelsClient::with_base_url("k", &server.uri()).unwrap();
        assert!(client.search("NADA", 4, 4).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_rejection_is_catalog_error() {
        let server = MockServer::start().await;
        Mock::given(path("/videos/search"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = PexelsClient::with_base_url("bad", &server.uri()).unwrap();
        let err = client.search("SOL", 1, 4).await.unwrap_err();
        assert!(matches!(err, ReelMinerError::Catalog(_)));
    }

    #[tokio::test]
    async fn download_reports_status_and_type() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/ok.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(vec![1u8, 2, 3], "video/mp4"))
            .mount(&server)
            .await;
        Mock::given(path("/files/gone.mp4"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = PexelsClient::with_base_url("k", &server.uri()).unwrap();

        let ok = client
            .download(&format!("{}/files/ok.mp4", server.uri()))
            .await
            .unwrap();
        assert!(ok.is_success());
        assert_eq!(ok.content_type.as_deref(), Some("video/mp4"));
        assert_eq!(ok.bytes, vec![1, 2, 3]);

        let gone = client
            .download(&format!("{}/files/gone.mp4", server.uri()))
            .await
            .unwrap();
        assert_eq!(gone.status, 404);
    }

    #[test]
    fn base_url_is_validated() {
        assert!(PexelsClient::with_base_url("k", "not a url").unwrap_err().is_config());
        let client = PexelsClient::with_base_url("k", "http://localhost:9000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:9000");
    }
}

//! Upstream playlist fetching.

use std::sync::OnceLock;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, instrument};

use crate::config::RelayConfig;
use crate::error::{RelayError, Result};

/// Fetches playlist text from upstream on behalf of a referer.
#[async_trait]
pub trait PlaylistFetcher: Send + Sync {
    async fn fetch_text(&self, url: &str, referer: &str) -> Result<String>;
}

pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            // Another crate installed one first.
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Headers sent with every upstream request, before Origin/Referer are applied.
pub fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();

    headers.insert(reqwest::header::ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(
        reqwest::header::ACCEPT_ENCODING,
        HeaderValue::from_static("gzip, deflate, br, zstd"),
    );
    headers.insert(
        reqwest::header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.9"),
    );
    headers
}

/// `reqwest`-backed fetcher.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &RelayConfig) -> Result<Self> {
        install_rustls_provider();

        let client = Client::builder()
            .timeout(config.fetch_timeout)
            .user_agent(config.user_agent.clone())
            .default_headers(default_headers())
            .build()
            .map_err(|e| RelayError::configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PlaylistFetcher for HttpFetcher {
    #[instrument(skip(self), level = "debug")]
    async fn fetch_text(&self, url: &str, referer: &str) -> Result<String> {
        let referer_value = HeaderValue::from_str(referer)
            .map_err(|e| RelayError::configuration(format!("invalid referer header: {e}")))?;

        let response = self
            .client
            .get(url)
            .header(reqwest::header::ORIGIN, referer_value.clone())
            .header(reqwest::header::REFERER, referer_value)
            .send()
            .await
            .map_err(|e| RelayError::network(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::http_status(status, url));
        }

        let text = response
            .text()
            .await
            .map_err(|e| RelayError::network(url, e))?;

        debug!(bytes = text.len(), "Fetched playlist");
        Ok(text)
    }
}

//! HTTP document fetcher
//!
//! The only network-facing implementation of [`DocumentFetcher`]. Both
//! feeds are plain GET endpoints; a non-success status is a fetch error
//! like any transport failure, so the extractors never see an error
//! page as a document.

use async_trait::async_trait;
use std::time::Duration;

use meteo_core::error::{Error, Result};
use meteo_core::traits::DocumentFetcher;

/// Timeout for feed requests (30 seconds)
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// reqwest-backed fetcher shared by both sources.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(HTTP_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl DocumentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::fetch(format!("request to {url} failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::fetch(format!(
                "{url} returned HTTP {}",
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| Error::fetch(format!("failed to read {url}: {e}")))
    }
}

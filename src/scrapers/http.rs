use crate::error::{Result, ScoutError};
use crate::scrapers::traits::DocumentFetcher;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Plain HTTP fetcher, enough for server-rendered listing pages
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ScoutError::config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl DocumentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        debug!("Fetching URL: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ScoutError::fetch(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!("{} returned status: {}", url, status);
            return Err(ScoutError::fetch(url, format!("status {status}")));
        }

        let html = response
            .text()
            .await
            .map_err(|e| ScoutError::fetch(url, format!("failed to read response body: {e}")))?;

        debug!("Downloaded {} bytes of HTML", html.len());
        Ok(html)
    }

    fn fetcher_name(&self) -> &'static str {
        "http"
    }
}

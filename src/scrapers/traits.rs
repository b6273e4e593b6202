use crate::error::Result;
use async_trait::async_trait;

/// Common trait for anything that can bring back the HTML of a page.
/// Lets the search run against plain HTTP, a headless browser or a test double.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Fetch the body of `url`. Transport failures and non-success statuses
    /// are both reported as `ScoutError::Fetch`.
    async fn fetch(&self, url: &str) -> Result<String>;

    /// Get the name of the fetcher, for logs
    fn fetcher_name(&self) -> &'static str;
}

use crate::error::{Result, ScoutError};
use crate::scrapers::traits::DocumentFetcher;
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

/// Time given to client-side rendering after navigation completes
const SETTLE_TIME: Duration = Duration::from_secs(3);

/// Browser-based fetcher using headless Chrome, for result pages that only
/// fill in their listing cards from script
pub struct BrowserFetcher {
    browser: Browser,
}

impl BrowserFetcher {
    /// Launch a headless browser
    pub fn new() -> Result<Self> {
        info!("Launching headless Chrome...");

        let options = LaunchOptions::default_builder()
            .headless(true)
            .build()
            .map_err(|e| ScoutError::config(format!("failed to build launch options: {e}")))?;

        let browser = Browser::new(options)
            .map_err(|e| ScoutError::config(format!("failed to launch Chrome browser: {e}")))?;

        Ok(Self { browser })
    }

    fn render(browser: &Browser, url: &str) -> anyhow::Result<String> {
        let tab = browser.new_tab()?;

        close_after(
            || {
                tab.navigate_to(url)?;
                tab.wait_until_navigated()?;

                thread::sleep(SETTLE_TIME);

                // Accept cookies if present
                let _ = tab.evaluate(
                    r#"
                    const button = document.querySelector('button[id*="accept"], button[id*="onetrust-accept"]');
                    if (button) button.click();
                    "#,
                    false,
                );

                tab.get_content()
            },
            || {
                let _ = tab.close(true);
            },
        )
    }
}

/// Run `work`, then `close`, whether or not `work` failed. Tabs live as long
/// as the browser unless closed explicitly.
fn close_after<T>(
    work: impl FnOnce() -> anyhow::Result<T>,
    close: impl FnOnce(),
) -> anyhow::Result<T> {
    let result = work();
    close();
    result
}

#[async_trait]
impl DocumentFetcher for BrowserFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        debug!("Rendering URL: {}", url);

        let browser = self.browser.clone();
        let target = url.to_string();
        let html = tokio::task::spawn_blocking(move || Self::render(&browser, &target))
            .await
            .map_err(|e| ScoutError::fetch(url, format!("browser task failed: {e}")))?
            .map_err(|e| ScoutError::fetch(url, e.to_string()))?;

        if html.is_empty() {
            return Err(ScoutError::fetch(url, "browser returned an empty document"));
        }

        debug!("Rendered {} bytes of HTML", html.len());
        Ok(html)
    }

    fn fetcher_name(&self) -> &'static str {
        "browser"
    }
}

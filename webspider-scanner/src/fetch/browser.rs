use super::{FetchedPage, Fetcher};
use crate::cookies::Cookie;
use crate::error::{Result, ScanError};
use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{CookieParam, SetBlockedUrLsParams};
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_BATCH_SIZE: usize = 20;

/// Image, font and stylesheet URLs skipped when resource blocking is on.
const BLOCKED_RESOURCE_PATTERNS: [&str; 15] = [
    "*.png*", "*.jpg*", "*.jpeg*", "*.gif*", "*.webp*", "*.svg*", "*.ico*", "*.bmp*",
    "*.avif*", "*.woff*", "*.woff2*", "*.ttf*", "*.otf*", "*.eot*", "*.css*",
];

const NAVIGATION_STATUS_JS: &str = "(() => { \
    const nav = performance.getEntriesByType('navigation')[0]; \
    return nav && nav.responseStatus ? nav.responseStatus : 0; \
})()";

#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub timeout_secs: u64,
    pub batch_size: usize,
    pub block_resources: bool,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            batch_size: DEFAULT_BATCH_SIZE,
            block_resources: true,
        }
    }
}

/// Headless Chromium back-end. One browser per run, one page per fetch.
pub struct BrowserFetcher {
    browser: Mutex<Browser>,
    handler: Mutex<Option<JoinHandle<()>>>,
    options: BrowserOptions,
}

impl BrowserFetcher {
    /// Launch the browser and inject cookies for `start_url`'s host before any navigation.
    pub async fn launch(start_url: &Url, cookies: &[Cookie], options: BrowserOptions) -> Result<Self> {
        info!("Launching headless browser");
        let config = BrowserConfig::builder()
            .no_sandbox()
            .request_timeout(Duration::from_secs(options.timeout_secs))
            .build()
            .map_err(ScanError::Browser)?;

        let (browser, mut handler) = Browser::launch(config).await?;
        let handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
            debug!("Browser handler finished");
        });

        let fetcher = Self {
            browser: Mutex::new(browser),
            handler: Mutex::new(Some(handle)),
            options,
        };
        if !cookies.is_empty() {
            fetcher.inject_cookies(start_url, cookies).await?;
        }
        Ok(fetcher)
    }

    async fn inject_cookies(&self, start_url: &Url, cookies: &[Cookie]) -> Result<()> {
        let host = start_url
            .host_str()
            .ok_or_else(|| ScanError::InvalidUrl(format!("{} has no host", start_url)))?;

        let params = cookies
            .iter()
            .map(|c| {
                CookieParam::builder()
                    .name(c.name.clone())
                    .value(c.value.clone())
                    .domain(host)
                    .path("/")
                    .build()
                    .map_err(ScanError::Browser)
            })
            .collect::<Result<Vec<_>>>()?;

        let page = self.open_page().await?;
        let outcome = page.set_cookies(params).await.map(|_| ());
        close_page(page, "cookie injection").await;
        outcome?;

        debug!("Injected {} cookies for {}", cookies.len(), host);
        Ok(())
    }

    async fn open_page(&self) -> Result<Page> {
        let browser = self.browser.lock().await;
        Ok(browser.new_page("about:blank").await?)
    }

    async fn render(&self, page: &Page, url: &str) -> Result<FetchedPage> {
        if self.options.block_resources {
            let patterns = BLOCKED_RESOURCE_PATTERNS.iter().map(|p| p.to_string()).collect();
            page.execute(SetBlockedUrLsParams::new(patterns)).await?;
        }

        page.goto(url).await?;

        let status = navigation_status(page).await;
        if let Some(code) = status
            && !(200..300).contains(&code)
        {
            return Err(ScanError::Status(code));
        }

        let html = page.content().await?;
        let final_url = page.url().await?.unwrap_or_else(|| url.to_string());

        Ok(FetchedPage {
            status,
            html,
            final_url,
        })
    }

    /// Close the browser and wait for its event loop to end.
    pub async fn close(&self) -> Result<()> {
        {
            let mut browser = self.browser.lock().await;
            browser.close().await?;
            browser.wait().await?;
        }
        if let Some(handle) = self.handler.lock().await.take()
            && let Err(e) = handle.await
        {
            warn!("Browser handler task failed: {}", e);
        }
        info!("Headless browser closed");
        Ok(())
    }
}

#[async_trait]
impl Fetcher for BrowserFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        debug!("Rendering {}", url);

        let page = self.open_page().await?;
        let outcome = tokio::time::timeout(
            Duration::from_secs(self.options.timeout_secs),
            self.render(&page, url),
        )
        .await;
        // The page is released on every path, including timeouts and navigation errors.
        close_page(page, url).await;

        outcome.unwrap_or(Err(ScanError::Timeout(self.options.timeout_secs)))
    }

    fn batch_size(&self) -> usize {
        self.options.batch_size.max(1)
    }

    fn name(&self) -> &'static str {
        "dynamic"
    }
}

async fn close_page(page: Page, context: &str) {
    if let Err(e) = page.close().await {
        debug!("Failed to close page ({}): {}", context, e);
    }
}

/// Status of the main document as reported by the Navigation Timing API.
async fn navigation_status(page: &Page) -> Option<u16> {
    let result = page.evaluate(NAVIGATION_STATUS_JS).await.ok()?;
    result.into_value::<u16>().ok().filter(|status| *status != 0)
}

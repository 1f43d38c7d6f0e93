//! Fetch back-ends. The crawler only sees the [`Fetcher`] trait; which
//! implementation runs is a configuration choice.

pub mod browser;
pub mod http;

pub use browser::{BrowserFetcher, BrowserOptions};
pub use http::HttpFetcher;

use crate::error::Result;
use async_trait::async_trait;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final HTTP status when the back-end can observe it
    pub status: Option<u16>,
    pub html: String,
    pub final_url: String,
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch one URL. Any error is local to that URL: no retries.
    async fn fetch(&self, url: &str) -> Result<FetchedPage>;

    /// How many fetches may be in flight at once during breadth-first crawls.
    fn batch_size(&self) -> usize {
        1
    }

    fn name(&self) -> &'static str;
}

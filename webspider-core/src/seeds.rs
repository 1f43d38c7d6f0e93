// Seed discovery by directory brute force

use futures::{StreamExt, stream};
use reqwest::Client;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;
use webspider_scanner::cookies::Cookie;
use webspider_scanner::fetch::DEFAULT_USER_AGENT;
use webspider_scanner::fetch::http::cookie_jar;

pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_PROBE_WORKERS: usize = 10;
const MAX_PROBE_REDIRECTS: usize = 3;

/// Options for a brute-force seed discovery pass
pub struct SeedOptions {
    pub base_url: String,
    pub wordlist: Vec<String>,
    pub cookies: Vec<Cookie>,
    pub timeout_secs: u64,
    pub workers: usize,
}

impl SeedOptions {
    pub fn new(base_url: impl Into<String>, wordlist: Vec<String>) -> Self {
        Self {
            base_url: base_url.into(),
            wordlist,
            cookies: Vec::new(),
            timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
            workers: DEFAULT_PROBE_WORKERS,
        }
    }

    pub fn with_cookies(mut self, cookies: Vec<Cookie>) -> Self {
        self.cookies = cookies;
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// Probe every wordlist entry under the base URL. Candidates whose final
/// response (after redirects) is 200-399 become seeds, returned in wordlist order.
pub async fn discover_seeds(options: SeedOptions) -> Result<Vec<String>, String> {
    let SeedOptions {
        base_url,
        wordlist,
        cookies,
        timeout_secs,
        workers,
    } = options;

    if wordlist.is_empty() {
        return Err("Wordlist is empty".to_string());
    }

    let base =
        Url::parse(&base_url).map_err(|e| format!("Invalid base URL '{}': {}", base_url, e))?;
    let candidates = wordlist
        .iter()
        .map(|word| build_candidate_url(&base_url, word))
        .collect::<Result<Vec<_>, _>>()?;

    info!(
        "Probing {} candidate paths with {} workers",
        candidates.len(),
        workers
    );

    // A candidate that redirects to a missing page is not a seed.
    let client = Client::builder()
        .user_agent(DEFAULT_USER_AGENT)
        .timeout(Duration::from_secs(timeout_secs))
        .cookie_provider(cookie_jar(&base, &cookies))
        .redirect(reqwest::redirect::Policy::limited(MAX_PROBE_REDIRECTS))
        .build()
        .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

    let found: Vec<String> = stream::iter(candidates)
        .map(|url| {
            let client = &client;
            async move {
                match probe(client, &url).await {
                    Some(status) if (200..400).contains(&status) => {
                        info!("[+] Found: {} ({})", url, status);
                        Some(url)
                    }
                    Some(status) => {
                        debug!("Probe miss {} ({})", url, status);
                        None
                    }
                    None => None,
                }
            }
        })
        .buffered(workers.max(1))
        .filter_map(|hit| async move { hit })
        .collect()
        .await;

    info!("Seed discovery confirmed {} paths", found.len());
    Ok(found)
}

async fn probe(client: &Client, url: &str) -> Option<u16> {
    match client.get(url).send().await {
        Ok(response) => Some(response.status().as_u16()),
        Err(e) => {
            debug!("Probe failed {}: {}", url, e);
            None
        }
    }
}

/// Build a candidate URL from base URL and wordlist entry
pub fn build_candidate_url(base_url: &str, word: &str) -> Result<String, String> {
    let mut url =
        Url::parse(base_url).map_err(|e| format!("Invalid base URL '{}': {}", base_url, e))?;

    let current_path = url.path().to_string();

    let path_base = if current_path.ends_with('/') {
        current_path
    } else {
        format!("{}/", current_path)
    };

    let new_path = format!("{}{}", path_base, word.trim_start_matches('/'));

    url.set_path(&new_path);
    url.set_query(None);
    url.set_fragment(None);

    Ok(url.to_string())
}

/// Load wordlist from file
pub fn load_wordlist(path: &Path) -> Result<Vec<String>, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read wordlist {}: {}", path.display(), e))?;

    let words: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.starts_with('#'))
        .map(str::to_string)
        .collect();

    if words.is_empty() {
        return Err(format!(
            "Wordlist {} is empty or contains only comments",
            path.display()
        ));
    }

    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_appends_word_to_directory_path() {
        assert_eq!(
            build_candidate_url("http://example.com", "admin").unwrap(),
            "http://example.com/admin"
        );
        assert_eq!(
            build_candidate_url("http://example.com/app/", "/login").unwrap(),
            "http://example.com/app/login"
        );
    }

    #[test]
    fn candidate_drops_query_and_fragment() {
        assert_eq!(
            build_candidate_url("http://example.com/app?x=1#top", "backup").unwrap(),
            "http://example.com/app/backup"
        );
    }

    #[test]
    fn candidate_rejects_relative_base() {
        assert!(build_candidate_url("not a url", "admin").is_err());
    }
}

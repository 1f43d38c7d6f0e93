use crate::data::Database;
use crate::seeds::{SeedOptions, discover_seeds, load_wordlist};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, warn};
use url::Url;
use webspider_scanner::cookies::parse_cookie_string;
use webspider_scanner::crawler::{DEFAULT_MAX_DEPTH, canonicalize};
use webspider_scanner::fetch::browser::DEFAULT_BATCH_SIZE;
use webspider_scanner::fetch::http;
use webspider_scanner::result::{CrawlSummary, LinkRecord};
use webspider_scanner::{
    BrowserFetcher, BrowserOptions, Crawler, Fetcher, HttpFetcher, ProgressCallback, Scope,
    ScopePattern, SiteBoundary, Traversal,
};

/// Which back-end fetches pages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchMode {
    /// Plain HTTP GET, no script execution
    #[default]
    Static,
    /// Headless browser, scripts run before extraction
    Dynamic,
}

impl FetchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchMode::Static => "static",
            FetchMode::Dynamic => "dynamic",
        }
    }
}

impl fmt::Display for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for configuring a crawl operation
pub struct CrawlOptions {
    pub url: String,
    pub extra_seeds: Vec<String>,
    pub wordlist: Option<PathBuf>,
    pub max_depth: usize,
    pub mode: FetchMode,
    pub traversal: Traversal,
    pub include: Option<String>,
    pub exclude: Option<String>,
    pub cookie: Option<String>,
    pub same_site: bool,
    /// Per-fetch timeout override; each back-end has its own default
    pub timeout_secs: Option<u64>,
    pub batch_size: usize,
    pub block_resources: bool,
    pub show_progress_bars: bool,
}

impl CrawlOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            extra_seeds: Vec::new(),
            wordlist: None,
            max_depth: DEFAULT_MAX_DEPTH,
            mode: FetchMode::Static,
            traversal: Traversal::Dfs,
            include: None,
            exclude: None,
            cookie: None,
            same_site: true,
            timeout_secs: None,
            batch_size: DEFAULT_BATCH_SIZE,
            block_resources: true,
            show_progress_bars: false,
        }
    }
}

/// What a finished crawl run left behind
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub run_id: String,
    pub seeds: Vec<String>,
    pub summary: CrawlSummary,
}

/// Primary seed first, then the extra ones, canonicalized and deduplicated.
pub fn merge_seeds(primary: &str, extra: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    std::iter::once(primary)
        .chain(extra.iter().map(String::as_str))
        .map(canonicalize)
        .filter(|seed| seen.insert(seed.clone()))
        .collect()
}

/// Extract the path component from a URL
pub fn extract_url_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}

/// Execute a crawl with the given options, persisting records into `db`.
///
/// Configuration problems (bad URL, bad pattern, browser launch) are returned as errors.
/// Per-URL failures are only counted in the returned summary.
pub async fn execute_crawl(options: CrawlOptions, db: &mut Database) -> Result<CrawlOutcome, String> {
    let CrawlOptions {
        url,
        extra_seeds,
        wordlist,
        max_depth,
        mode,
        traversal,
        include,
        exclude,
        cookie,
        same_site,
        timeout_secs,
        batch_size,
        block_resources,
        show_progress_bars,
    } = options;

    let start_url = Url::parse(&url).map_err(|e| format!("Invalid URL '{}': {}", url, e))?;
    if !matches!(start_url.scheme(), "http" | "https") {
        return Err(format!("Unsupported URL scheme '{}'", start_url.scheme()));
    }

    let patterns = ScopePattern::new(include.as_deref(), exclude.as_deref())
        .map_err(|e| format!("Invalid scope pattern: {}", e))?;
    let boundary = if same_site {
        SiteBoundary::for_seed(&start_url)
    } else {
        SiteBoundary::Unrestricted
    };
    let scope = Scope::new(patterns, boundary);

    let cookies = cookie
        .as_deref()
        .map(parse_cookie_string)
        .unwrap_or_default();

    let mut discovered = extra_seeds;
    if let Some(path) = wordlist {
        // A broken wordlist costs the extra seeds, not the crawl.
        match load_wordlist(&path) {
            Ok(words) => {
                let mut seed_options =
                    SeedOptions::new(url.clone(), words).with_cookies(cookies.clone());
                if let Some(secs) = timeout_secs {
                    seed_options = seed_options.with_timeout(secs);
                }
                match discover_seeds(seed_options).await {
                    Ok(found) => discovered.extend(found),
                    Err(e) => warn!("Seed discovery failed: {}", e),
                }
            }
            Err(e) => warn!("Skipping seed discovery: {}", e),
        }
    }
    let seeds = merge_seeds(&url, &discovered);

    let run_mode = format!("{}/{}", mode, traversal);
    let run_id = db
        .start_run(&run_mode, &seeds)
        .map_err(|e| format!("Failed to record crawl run: {}", e))?;
    info!("Crawl run {} started ({})", run_id, run_mode);

    let (fetcher, browser): (Arc<dyn Fetcher>, Option<Arc<BrowserFetcher>>) = match mode {
        FetchMode::Static => {
            let secs = timeout_secs.unwrap_or(http::DEFAULT_TIMEOUT_SECS);
            match HttpFetcher::with_timeout(&start_url, &cookies, secs) {
                Ok(fetcher) => (Arc::new(fetcher) as Arc<dyn Fetcher>, None),
                Err(e) => return Err(abort_run(db, &run_id, format!("Failed to create HTTP client: {}", e))),
            }
        }
        FetchMode::Dynamic => {
            let mut browser_options = BrowserOptions {
                batch_size,
                block_resources,
                ..BrowserOptions::default()
            };
            if let Some(secs) = timeout_secs {
                browser_options.timeout_secs = secs;
            }
            match BrowserFetcher::launch(&start_url, &cookies, browser_options).await {
                Ok(fetcher) => {
                    let fetcher = Arc::new(fetcher);
                    let shared: Arc<dyn Fetcher> = fetcher.clone();
                    (shared, Some(fetcher))
                }
                Err(e) => return Err(abort_run(db, &run_id, format!("Failed to launch browser: {}", e))),
            }
        }
    };

    // Set up spinner for overall crawl progress (only if enabled)
    let progress_bar = show_progress_bars.then(|| {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message("Starting crawl...");
        Arc::new(pb)
    });

    let processed_count = Arc::new(AtomicUsize::new(0));

    let mut crawler = Crawler::new(fetcher)
        .with_max_depth(max_depth)
        .with_traversal(traversal)
        .with_scope(scope);

    if let Some(pb) = progress_bar.clone() {
        let count = processed_count.clone();
        let callback: ProgressCallback = Arc::new(move |depth: usize, _url: String| {
            let n = count.fetch_add(1, Ordering::Relaxed) + 1;
            pb.set_message(format!("Crawling... {} URLs processed (depth {})", n, depth));
            pb.tick();
        });
        crawler = crawler.with_progress_callback(callback);
    }

    let result = crawler.crawl(&seeds, db).await;

    if let Some(browser) = browser
        && let Err(e) = browser.close().await
    {
        warn!("Failed to close browser cleanly: {}", e);
    }

    if let Some(ref pb) = progress_bar {
        let total = processed_count.load(Ordering::Relaxed);
        pb.finish_with_message(format!("Crawl complete! {} URLs processed", total));
    }

    let summary = match result {
        Ok(summary) => summary,
        Err(e) => return Err(abort_run(db, &run_id, format!("Crawl failed: {}", e))),
    };

    db.complete_run(&run_id, &summary)
        .map_err(|e| format!("Failed to record crawl run: {}", e))?;

    Ok(CrawlOutcome {
        run_id,
        seeds,
        summary,
    })
}

fn abort_run(db: &Database, run_id: &str, message: String) -> String {
    if let Err(e) = db.fail_run(run_id) {
        warn!("Failed to mark run {} as failed: {}", run_id, e);
    }
    message
}

/// Generate a host-grouped text report for a finished crawl
pub fn generate_crawl_report(summary: &CrawlSummary, records: &[LinkRecord]) -> String {
    let mut report = String::new();
    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    report.push_str("# Summary:\n");
    report.push_str(&format!("  Pages fetched: {}\n", summary.fetched));
    report.push_str(&format!("  New records: {}\n", summary.persisted));
    report.push_str(&format!("  Already stored: {}\n", summary.duplicates));
    report.push_str(&format!("  Failures: {}\n", summary.failure_count()));
    report.push_str(&format!("  Out of scope: {}\n", summary.scope_rejected));
    report.push_str(&format!(
        "  Skipped: {} past max depth, {} already visited\n",
        summary.skipped_depth, summary.skipped_visited
    ));

    let total_inputs: usize = records.iter().map(|r| r.input_fields.len()).sum();
    report.push_str(&format!("  Input fields found: {}\n", total_inputs));

    report.push_str("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");

    let mut by_host: BTreeMap<&str, Vec<&LinkRecord>> = BTreeMap::new();
    for record in records {
        by_host.entry(record.host.as_str()).or_default().push(record);
    }

    for (host, host_records) in &by_host {
        report.push_str(&format!("## {}\n", host.bold()));
        report.push_str(&format!("  {} pages found\n\n", host_records.len()));

        for record in host_records {
            let mut line = format!(
                "  {} {}",
                format!("[d{}]", record.depth).cyan(),
                extract_url_path(&record.url)
            );

            if !record.query_params.is_empty() {
                let keys: Vec<&str> = record.query_params.keys().map(String::as_str).collect();
                line.push_str(&format!(" ?{}", keys.join(",")));
            }
            if !record.input_fields.is_empty() {
                line.push_str(&format!(
                    " {}",
                    format!("{} inputs", record.input_fields.len()).green()
                ));
            }

            report.push_str(&line);
            report.push('\n');
        }
        report.push('\n');
    }

    if !summary.failed.is_empty() {
        report.push_str("## Failures\n");
        for failure in &summary.failed {
            report.push_str(&format!(
                "  {} {} {}\n",
                format!("[d{}]", failure.depth).cyan(),
                failure.url,
                failure.reason.red()
            ));
        }
        report.push('\n');
    }

    report
}

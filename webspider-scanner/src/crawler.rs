use crate::error::{Result, ScanError};
use crate::extract::{Extraction, extract};
use crate::fetch::Fetcher;
use crate::frontier::{Frontier, FrontierEntry, Traversal, VisitedSet};
use crate::result::{CrawlSummary, FailedFetch, LinkRecord};
use crate::scope::Scope;
use crate::sink::LinkSink;
use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

pub const DEFAULT_MAX_DEPTH: usize = 1;

/// Called once per dispatched URL with its depth.
pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlState {
    Ready,
    Running,
    Done,
}

/// Outcome of fetching and parsing one frontier entry.
struct Visit {
    entry: FrontierEntry,
    outcome: Result<Extraction>,
}

/// Drives the frontier through fetch, extract and persist until it drains.
pub struct Crawler {
    fetcher: Arc<dyn Fetcher>,
    scope: Scope,
    max_depth: usize,
    traversal: Traversal,
    progress_callback: Option<ProgressCallback>,
    state: CrawlState,
}

impl Crawler {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            scope: Scope::unrestricted(),
            max_depth: DEFAULT_MAX_DEPTH,
            traversal: Traversal::default(),
            progress_callback: None,
            state: CrawlState::Ready,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_traversal(mut self, traversal: Traversal) -> Self {
        self.traversal = traversal;
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn state(&self) -> CrawlState {
        self.state
    }

    /// Crawl from `seeds` (depth 0, no parent), writing one record per fetched page into `sink`.
    ///
    /// Per-URL failures are logged and counted in the summary; they never abort the run.
    /// A crawler runs once.
    pub async fn crawl(&mut self, seeds: &[String], sink: &mut dyn LinkSink) -> Result<CrawlSummary> {
        if self.state != CrawlState::Ready {
            return Err(ScanError::AlreadyRun);
        }
        self.state = CrawlState::Running;

        let summary = self.run(seeds, sink).await;

        self.state = CrawlState::Done;
        info!(
            "Crawl complete. Fetched {} pages, {} new records, {} failures",
            summary.fetched,
            summary.persisted,
            summary.failure_count()
        );
        Ok(summary)
    }

    async fn run(&self, seeds: &[String], sink: &mut dyn LinkSink) -> CrawlSummary {
        let mut frontier = Frontier::new(self.traversal);
        frontier.seed(seeds.iter().map(|s| canonicalize(s)));
        let mut visited = VisitedSet::new();
        let mut summary = CrawlSummary::default();

        let batch_size = self.fetcher.batch_size();
        info!(
            "Starting {} crawl of {} seed(s) with the {} fetcher, max depth {}",
            self.traversal,
            seeds.len(),
            self.fetcher.name(),
            self.max_depth
        );

        if self.traversal == Traversal::Bfs && batch_size > 1 {
            self.drain_batched(batch_size, &mut frontier, &mut visited, &mut summary, sink)
                .await;
        } else {
            self.drain_sequential(&mut frontier, &mut visited, &mut summary, sink)
                .await;
        }
        summary
    }

    /// One fetch in flight at a time.
    async fn drain_sequential(
        &self,
        frontier: &mut Frontier,
        visited: &mut VisitedSet,
        summary: &mut CrawlSummary,
        sink: &mut dyn LinkSink,
    ) {
        while let Some(entry) = frontier.pop() {
            if !self.admit(&entry, visited, summary) {
                continue;
            }
            let visit = visit(self.fetcher.as_ref(), entry).await;
            self.absorb(visit, frontier, visited, summary, sink);
        }
    }

    /// Breadth-first in bounded batches. Batch k+1 is only dequeued once every
    /// page of batch k has been merged back.
    async fn drain_batched(
        &self,
        batch_size: usize,
        frontier: &mut Frontier,
        visited: &mut VisitedSet,
        summary: &mut CrawlSummary,
        sink: &mut dyn LinkSink,
    ) {
        loop {
            let mut batch = Vec::with_capacity(batch_size);
            while batch.len() < batch_size {
                let Some(entry) = frontier.pop() else {
                    break;
                };
                // Admission marks the URL visited, so a repeat inside this batch is dropped here.
                if self.admit(&entry, visited, summary) {
                    batch.push(entry);
                }
            }
            if batch.is_empty() {
                break;
            }

            debug!("Dispatching batch of {} pages", batch.len());
            let fetcher = self.fetcher.as_ref();
            let visits = join_all(batch.into_iter().map(|entry| visit(fetcher, entry))).await;
            for visit in visits {
                self.absorb(visit, frontier, visited, summary, sink);
            }
        }
    }

    /// Depth and visited checks on dequeue. Marks the entry visited when it is admitted.
    fn admit(&self, entry: &FrontierEntry, visited: &mut VisitedSet, summary: &mut CrawlSummary) -> bool {
        if entry.depth > self.max_depth {
            summary.skipped_depth += 1;
            return false;
        }
        if !visited.insert(&entry.url) {
            summary.skipped_visited += 1;
            return false;
        }
        if let Some(ref callback) = self.progress_callback {
            callback(entry.depth, entry.url.clone());
        }
        true
    }

    /// Merge one visit back: persist it and enqueue its in-scope children.
    fn absorb(
        &self,
        visit: Visit,
        frontier: &mut Frontier,
        visited: &VisitedSet,
        summary: &mut CrawlSummary,
        sink: &mut dyn LinkSink,
    ) {
        let Visit { entry, outcome } = visit;
        let extraction = match outcome {
            Ok(extraction) => extraction,
            Err(e) => {
                warn!("Crawl error for {}: {}", entry.url, e);
                summary.failed.push(FailedFetch {
                    url: entry.url,
                    depth: entry.depth,
                    reason: e.to_string(),
                });
                return;
            }
        };
        summary.fetched += 1;
        info!("[Depth {}] Collected {}", entry.depth, entry.url);

        let record = LinkRecord {
            url: entry.url.clone(),
            parent: entry.parent.clone(),
            depth: entry.depth,
            host: netloc(&entry.url),
            query_params: extraction.query_params,
            input_fields: extraction.input_fields,
            collected_at: Utc::now(),
        };
        match sink.insert_if_absent(&record) {
            Ok(true) => summary.persisted += 1,
            Ok(false) => {
                debug!("{} already stored", entry.url);
                summary.duplicates += 1;
            }
            Err(e) => {
                warn!("Failed to store {}: {}", entry.url, e);
                summary.failed.push(FailedFetch {
                    url: entry.url,
                    depth: entry.depth,
                    reason: e.to_string(),
                });
                return;
            }
        }

        // Pages at max depth are recorded but not expanded.
        if entry.depth >= self.max_depth {
            return;
        }
        for link in extraction.links {
            debug!("Found link: {}", link);
            if !self.scope.admits(&link) {
                summary.scope_rejected += 1;
                continue;
            }
            if visited.contains(&link) {
                continue;
            }
            frontier.push(FrontierEntry::child(link, entry.depth + 1, entry.url.as_str()));
        }
    }
}

async fn visit(fetcher: &dyn Fetcher, entry: FrontierEntry) -> Visit {
    let outcome = match fetcher.fetch(&entry.url).await {
        Ok(page) => Ok(extract(&page.html, &entry.url)),
        Err(e) => Err(e),
    };
    Visit { entry, outcome }
}

/// Parsed form of `url` without its fragment; unparseable input is kept verbatim.
pub fn canonicalize(url: &str) -> String {
    match Url::parse(url.trim()) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => url.to_string(),
    }
}

/// `host[:port]` of a URL, empty when there is no host.
pub fn netloc(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return String::new();
    };
    match (parsed.host_str(), parsed.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        _ => String::new(),
    }
}

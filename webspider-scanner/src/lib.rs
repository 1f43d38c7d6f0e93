pub mod cookies;
pub mod crawler;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod frontier;
pub mod params;
pub mod result;
pub mod scope;
pub mod sink;

pub use crawler::{CrawlState, Crawler, ProgressCallback};
pub use error::ScanError;
pub use fetch::{BrowserFetcher, BrowserOptions, Fetcher, HttpFetcher};
pub use frontier::{Frontier, FrontierEntry, Traversal, VisitedSet};
pub use result::{CrawlSummary, FieldDescriptor, LinkRecord, QueryParams, QueryValue};
pub use scope::{Scope, ScopePattern, SiteBoundary};
pub use sink::{LinkSink, MemorySink};

use crate::error::{Result, ScanError};
use regex::{Regex, RegexBuilder};
use tracing::debug;
use url::Url;

/// Include/exclude regex lists compiled once per run.
#[derive(Debug, Clone, Default)]
pub struct ScopePattern {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl ScopePattern {
    /// Build from the raw comma-separated strings given on the command line.
    pub fn new(include: Option<&str>, exclude: Option<&str>) -> Result<Self> {
        Ok(Self {
            include: compile_patterns(include.unwrap_or_default())?,
            exclude: compile_patterns(exclude.unwrap_or_default())?,
        })
    }

    pub fn allowed(&self, url: &str) -> bool {
        if !self.include.is_empty() && !self.include.iter().any(|p| p.is_match(url)) {
            return false;
        }
        if !self.exclude.is_empty() && self.exclude.iter().any(|p| p.is_match(url)) {
            return false;
        }
        true
    }

    pub fn is_unrestricted(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }
}

/// Split a comma-separated pattern string and compile each piece case-insensitively.
/// Blank pieces are ignored.
pub fn compile_patterns(raw: &str) -> Result<Vec<Regex>> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            RegexBuilder::new(p)
                .case_insensitive(true)
                .build()
                .map_err(ScanError::from)
        })
        .collect()
}

/// Same-site restriction anchored on the primary seed's host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteBoundary {
    /// Only the base host and its subdomains.
    SameSite(String),
    /// Any host.
    Unrestricted,
}

impl SiteBoundary {
    pub fn for_seed(seed: &Url) -> Self {
        match seed.host_str() {
            Some(host) => SiteBoundary::SameSite(host.to_ascii_lowercase()),
            None => SiteBoundary::Unrestricted,
        }
    }

    pub fn contains(&self, url: &Url) -> bool {
        match self {
            SiteBoundary::Unrestricted => true,
            SiteBoundary::SameSite(base) => url.host_str().is_some_and(|host| {
                let host = host.to_ascii_lowercase();
                host == *base || host.ends_with(&format!(".{}", base))
            }),
        }
    }
}

/// Combined gate for discovered child links. Seeds never pass through here.
#[derive(Debug, Clone)]
pub struct Scope {
    patterns: ScopePattern,
    boundary: SiteBoundary,
}

impl Scope {
    pub fn new(patterns: ScopePattern, boundary: SiteBoundary) -> Self {
        Self { patterns, boundary }
    }

    pub fn unrestricted() -> Self {
        Self::new(ScopePattern::default(), SiteBoundary::Unrestricted)
    }

    pub fn boundary(&self) -> &SiteBoundary {
        &self.boundary
    }

    pub fn admits(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            debug!("  -> Unparseable link {}, rejecting", url);
            return false;
        };
        if !matches!(parsed.scheme(), "http" | "https") {
            debug!("  -> Non-http scheme {}, rejecting", url);
            return false;
        }
        if !self.boundary.contains(&parsed) {
            debug!("  -> Off-site link {}, rejecting", url);
            return false;
        }
        if !self.patterns.allowed(url) {
            debug!("  -> Pattern rejected {}", url);
            return false;
        }
        true
    }
}

use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::str::FromStr;

/// Traversal discipline for the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Traversal {
    /// Stack: the most recently discovered link is visited first
    #[default]
    Dfs,
    /// Queue: links are visited in discovery order, depth by depth
    Bfs,
}

impl Traversal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Traversal::Dfs => "dfs",
            Traversal::Bfs => "bfs",
        }
    }
}

impl fmt::Display for Traversal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Traversal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dfs" => Ok(Traversal::Dfs),
            "bfs" => Ok(Traversal::Bfs),
            other => Err(format!("unknown traversal mode '{}' (expected dfs or bfs)", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    pub url: String,
    pub depth: usize,
    pub parent: Option<String>,
}

impl FrontierEntry {
    pub fn seed(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            depth: 0,
            parent: None,
        }
    }

    pub fn child(url: impl Into<String>, depth: usize, parent: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            depth,
            parent: Some(parent.into()),
        }
    }
}

/// Work queue of not-yet-fetched entries
#[derive(Debug)]
pub struct Frontier {
    traversal: Traversal,
    entries: VecDeque<FrontierEntry>,
}

impl Frontier {
    pub fn new(traversal: Traversal) -> Self {
        Self {
            traversal,
            entries: VecDeque::new(),
        }
    }

    pub fn traversal(&self) -> Traversal {
        self.traversal
    }

    pub fn push(&mut self, entry: FrontierEntry) {
        self.entries.push_back(entry);
    }

    pub fn pop(&mut self) -> Option<FrontierEntry> {
        match self.traversal {
            Traversal::Dfs => self.entries.pop_back(),
            Traversal::Bfs => self.entries.pop_front(),
        }
    }

    /// Seed at depth 0 so that seeds come out in the order given, whatever the discipline.
    pub fn seed<I, S>(&mut self, urls: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let seeds: Vec<FrontierEntry> = urls.into_iter().map(FrontierEntry::seed).collect();
        match self.traversal {
            Traversal::Dfs => seeds.into_iter().rev().for_each(|e| self.push(e)),
            Traversal::Bfs => seeds.into_iter().for_each(|e| self.push(e)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Canonical URLs already dispatched during this run. Append-only.
#[derive(Debug, Default)]
pub struct VisitedSet {
    urls: HashSet<String>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    /// Returns false if the URL was already present.
    pub fn insert(&mut self, url: &str) -> bool {
        if self.urls.contains(url) {
            return false;
        }
        self.urls.insert(url.to_string())
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A query parameter value: one occurrence is a scalar, repeated keys keep every value in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
    Single(String),
    Multiple(Vec<String>),
}

pub type QueryParams = BTreeMap<String, QueryValue>;

/// Attribute set describing one `input`, `textarea` or `select` element.
/// Attributes keep their source order, followed by `form_method`/`form_action`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldDescriptor(IndexMap<String, String>);

impl FieldDescriptor {
    pub fn new(attrs: IndexMap<String, String>) -> Self {
        Self(attrs)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn attributes(&self) -> &IndexMap<String, String> {
        &self.0
    }
}

impl FromIterator<(String, String)> for FieldDescriptor {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One fetched page, as handed to the sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub url: String,
    pub parent: Option<String>,
    pub depth: usize,
    pub host: String,
    pub query_params: QueryParams,
    pub input_fields: Vec<FieldDescriptor>,
    pub collected_at: DateTime<Utc>,
}

impl LinkRecord {
    pub fn query_params_json(&self) -> String {
        serde_json::to_string(&self.query_params).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn input_fields_json(&self) -> String {
        serde_json::to_string(&self.input_fields).unwrap_or_else(|_| "[]".to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedFetch {
    pub url: String,
    pub depth: usize,
    pub reason: String,
}

/// Counters for one crawl run. Failures are reported here rather than raised.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlSummary {
    pub fetched: usize,
    pub persisted: usize,
    pub duplicates: usize,
    pub failed: Vec<FailedFetch>,
    pub scope_rejected: usize,
    pub skipped_depth: usize,
    pub skipped_visited: usize,
}

impl CrawlSummary {
    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }
}

use crate::error::Result;
use crate::result::LinkRecord;

/// Persistent store for crawl records, keyed uniquely on `url`.
pub trait LinkSink {
    /// Store the record unless its URL is already present.
    /// Returns `true` when a new row was written.
    fn insert_if_absent(&mut self, record: &LinkRecord) -> Result<bool>;
}

/// In-memory sink, mostly useful for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Vec<LinkRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[LinkRecord] {
        &self.records
    }

    pub fn get(&self, url: &str) -> Option<&LinkRecord> {
        self.records.iter().find(|r| r.url == url)
    }

    pub fn into_records(self) -> Vec<LinkRecord> {
        self.records
    }
}

impl LinkSink for MemorySink {
    fn insert_if_absent(&mut self, record: &LinkRecord) -> Result<bool> {
        if self.records.iter().any(|r| r.url == record.url) {
            return Ok(false);
        }
        self.records.push(record.clone());
        Ok(true)
    }
}

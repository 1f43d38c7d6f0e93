use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Result, Row, params};
use std::fs;
use std::path::Path;
use webspider_scanner::result::{CrawlSummary, LinkRecord};
use webspider_scanner::{LinkSink, ScanError};

pub struct Database {
    conn: Connection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "running" => Some(RunStatus::Running),
            "completed" => Some(RunStatus::Completed),
            "failed" => Some(RunStatus::Failed),
            _ => None,
        }
    }
}

/// One row of `crawl_runs`
#[derive(Debug, Clone)]
pub struct CrawlRun {
    pub id: String,
    pub start_time: i64,
    pub end_time: Option<i64>,
    pub status: RunStatus,
    pub mode: String,
    pub seed_urls: Vec<String>,
    pub fetched: i64,
    pub persisted: i64,
    pub failed: i64,
}

const LINK_COLUMNS: &str =
    "link, parent, depth, host, query_params, input_fields, collected_time";

fn current_timestamp() -> i64 {
    Utc::now().timestamp()
}

fn json_column<T: serde::de::DeserializeOwned>(row: &Row<'_>, idx: usize) -> Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn link_from_row(row: &Row<'_>) -> Result<LinkRecord> {
    let collected: String = row.get(6)?;
    let collected_at = DateTime::parse_from_rfc3339(&collected)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?;
    let depth: i64 = row.get(2)?;

    Ok(LinkRecord {
        url: row.get(0)?,
        parent: row.get(1)?,
        depth: depth.max(0) as usize,
        host: row.get(3)?,
        query_params: json_column(row, 4)?,
        input_fields: json_column(row, 5)?,
        collected_at,
    })
}

impl Database {
    pub fn drop(path: &Path) -> std::io::Result<()> {
        fs::remove_file(path)
    }

    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA cache_size = -64000;  -- 64MB cache
            PRAGMA temp_store = MEMORY;
            ",
        )?;

        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    pub fn in_memory() -> Result<Self> {
        let db = Database {
            conn: Connection::open_in_memory()?,
        };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            -- One row per fetched page, unique on the URL
            CREATE TABLE IF NOT EXISTS crawl_links (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    link TEXT UNIQUE NOT NULL,
    parent TEXT,
    depth INTEGER NOT NULL,
    host TEXT NOT NULL,
    query_params TEXT NOT NULL DEFAULT '{}',   -- JSON object
    input_fields TEXT NOT NULL DEFAULT '[]',   -- JSON array of objects
    collected_time TEXT NOT NULL               -- RFC 3339, UTC
);

CREATE INDEX IF NOT EXISTS idx_crawl_links_parent ON crawl_links(parent);
CREATE INDEX IF NOT EXISTS idx_crawl_links_host ON crawl_links(host);
CREATE INDEX IF NOT EXISTS idx_crawl_links_depth ON crawl_links(depth);

-- Crawl runs and their outcome counters
CREATE TABLE IF NOT EXISTS crawl_runs (
    id TEXT PRIMARY KEY,
    start_time INTEGER NOT NULL,
    end_time INTEGER,
    status TEXT NOT NULL CHECK(status IN ('running', 'completed', 'failed')),
    mode TEXT NOT NULL,
    seed_urls TEXT NOT NULL,  -- JSON array
    fetched INTEGER NOT NULL DEFAULT 0,
    persisted INTEGER NOT NULL DEFAULT 0,
    failed INTEGER NOT NULL DEFAULT 0
);
            ",
        )?;
        Ok(())
    }

    // Run bookkeeping
    pub fn start_run(&self, mode: &str, seed_urls: &[String]) -> Result<String> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let seeds = serde_json::to_string(seed_urls).unwrap_or_else(|_| "[]".to_string());

        self.conn.execute(
            "INSERT INTO crawl_runs (id, start_time, status, mode, seed_urls) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![&run_id, current_timestamp(), RunStatus::Running.as_str(), mode, seeds],
        )?;

        Ok(run_id)
    }

    pub fn complete_run(&self, run_id: &str, summary: &CrawlSummary) -> Result<()> {
        self.conn.execute(
            "UPDATE crawl_runs SET status = ?1, end_time = ?2, fetched = ?3, persisted = ?4, failed = ?5 WHERE id = ?6",
            params![
                RunStatus::Completed.as_str(),
                current_timestamp(),
                summary.fetched as i64,
                summary.persisted as i64,
                summary.failure_count() as i64,
                run_id
            ],
        )?;
        Ok(())
    }

    pub fn fail_run(&self, run_id: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE crawl_runs SET status = ?1, end_time = ?2 WHERE id = ?3",
            params![RunStatus::Failed.as_str(), current_timestamp(), run_id],
        )?;
        Ok(())
    }

    pub fn get_run(&self, run_id: &str) -> Result<Option<CrawlRun>> {
        self.conn
            .query_row(
                "SELECT id, start_time, end_time, status, mode, seed_urls, fetched, persisted, failed
                 FROM crawl_runs WHERE id = ?1",
                params![run_id],
                |row| {
                    let status: String = row.get(3)?;
                    Ok(CrawlRun {
                        id: row.get(0)?,
                        start_time: row.get(1)?,
                        end_time: row.get(2)?,
                        status: RunStatus::parse(&status).ok_or_else(|| {
                            rusqlite::Error::FromSqlConversionFailure(
                                3,
                                Type::Text,
                                format!("unknown run status '{}'", status).into(),
                            )
                        })?,
                        mode: row.get(4)?,
                        seed_urls: json_column(row, 5)?,
                        fetched: row.get(6)?,
                        persisted: row.get(7)?,
                        failed: row.get(8)?,
                    })
                },
            )
            .optional()
    }

    // Link operations
    /// `INSERT OR IGNORE` on the unique URL. Returns whether a row was written.
    pub fn insert_link(&self, record: &LinkRecord) -> Result<bool> {
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO crawl_links (
                link, parent, depth, host, query_params, input_fields, collected_time
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                &record.url,
                &record.parent,
                record.depth as i64,
                &record.host,
                record.query_params_json(),
                record.input_fields_json(),
                record.collected_at.to_rfc3339(),
            ],
        )?;
        Ok(changed == 1)
    }

    pub fn get_link(&self, url: &str) -> Result<Option<LinkRecord>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM crawl_links WHERE link = ?1", LINK_COLUMNS),
                params![url],
                link_from_row,
            )
            .optional()
    }

    /// All links in insertion order
    pub fn get_links(&self) -> Result<Vec<LinkRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM crawl_links ORDER BY id", LINK_COLUMNS))?;
        let links = stmt.query_map([], link_from_row)?.collect::<Result<Vec<_>>>()?;
        Ok(links)
    }

    pub fn get_children(&self, parent: &str) -> Result<Vec<LinkRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM crawl_links WHERE parent = ?1 ORDER BY id",
            LINK_COLUMNS
        ))?;
        let links = stmt
            .query_map(params![parent], link_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(links)
    }

    pub fn count_links(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM crawl_links", [], |row| row.get(0))
    }

    pub fn get_connection(&self) -> &Connection {
        &self.conn
    }
}

impl LinkSink for Database {
    fn insert_if_absent(&mut self, record: &LinkRecord) -> webspider_scanner::error::Result<bool> {
        self.insert_link(record)
            .map_err(|e| ScanError::Sink(e.to_string()))
    }
}

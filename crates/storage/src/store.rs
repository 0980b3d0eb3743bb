//! SQLite report store implementation.

use crate::{Error, Report, ReportId, Result, TokenCounts};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, Row, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite-backed store of answered prompts.
pub struct ReportStore {
    conn: Mutex<Connection>,
}

impl ReportStore {
    /// Open or create a report store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory report store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| Error::LockPoisoned)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn()?.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS ai_reports (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL,
                prompt TEXT NOT NULL,
                response TEXT NOT NULL,
                model TEXT NOT NULL,
                prompt_tokens INTEGER NOT NULL,
                completion_tokens INTEGER NOT NULL,
                total_tokens INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_ai_reports_created
                ON ai_reports(created_at);
            "#,
        )?;
        Ok(())
    }

    /// Append a report to the store.
    pub fn append(&self, report: &Report) -> Result<()> {
        self.conn()?.execute(
            "INSERT INTO ai_reports
                (id, created_at, prompt, response, model, prompt_tokens, completion_tokens, total_tokens)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                report.id.to_string(),
                report.created_at.to_rfc3339_opts(SecondsFormat::Nanos, true),
                report.prompt,
                report.response,
                report.model,
                report.tokens.prompt,
                report.tokens.completion,
                report.tokens.total,
            ],
        )?;
        Ok(())
    }

    /// The most recent reports, newest first.
    pub fn list_recent(&self, limit: usize) -> Result<Vec<Report>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, created_at, prompt, response, model, prompt_tokens, completion_tokens, total_tokens
             FROM ai_reports ORDER BY created_at DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map([limit as i64], raw_report)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(RawReport::into_report).collect()
    }

    /// Load a single report by id.
    pub fn load(&self, id: ReportId) -> Result<Report> {
        let conn = self.conn()?;
        let raw = conn
            .query_row(
                "SELECT id, created_at, prompt, response, model, prompt_tokens, completion_tokens, total_tokens
                 FROM ai_reports WHERE id = ?1",
                [id.to_string()],
                raw_report,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Error::NotFound(id.to_string()),
                other => Error::Database(other),
            })?;
        raw.into_report()
    }

    /// Ids of every stored report, newest first.
    pub fn list_ids(&self) -> Result<Vec<ReportId>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id FROM ai_reports ORDER BY created_at DESC")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        ids.iter().map(|id| parse_id(id)).collect()
    }
}

struct RawReport {
    id: String,
    created_at: String,
    prompt: String,
    response: String,
    model: String,
    tokens: TokenCounts,
}

fn raw_report(row: &Row<'_>) -> rusqlite::Result<RawReport> {
    Ok(RawReport {
        id: row.get(0)?,
        created_at: row.get(1)?,
        prompt: row.get(2)?,
        response: row.get(3)?,
        model: row.get(4)?,
        tokens: TokenCounts {
            prompt: row.get(5)?,
            completion: row.get(6)?,
            total: row.get(7)?,
        },
    })
}

impl RawReport {
    fn into_report(self) -> Result<Report> {
        Ok(Report {
            id: parse_id(&self.id)?,
            created_at: self
                .created_at
                .parse::<DateTime<Utc>>()
                .map_err(|e| Error::InvalidValue(format!("created_at {}: {e}", self.created_at)))?,
            prompt: self.prompt,
            response: self.response,
            model: self.model,
            tokens: self.tokens,
        })
    }
}

fn parse_id(raw: &str) -> Result<ReportId> {
    raw.parse()
        .map(ReportId)
        .map_err(|e| Error::InvalidValue(format!("report id {raw}: {e}")))
}

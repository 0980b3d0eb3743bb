//! SQLite store for monthly business metrics and knowledge base documents.

use crate::vector::cosine_distance;
use crate::{Error, Result};
use chrono::NaiveDate;
use rusqlite::types::FromSql;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A monthly metric table keyed by `(region, month)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Metric {
    Revenue,
    MarketingSpend,
    ChurnRate,
}

impl Metric {
    fn table(self) -> &'static str {
        match self {
            Self::Revenue => "revenues",
            Self::MarketingSpend => "marketing_spends",
            Self::ChurnRate => "churn_metrics",
        }
    }

    fn column(self) -> &'static str {
        match self {
            Self::Revenue => "total_revenue",
            Self::MarketingSpend => "spend_amount",
            Self::ChurnRate => "churn_rate",
        }
    }
}

/// A knowledge base document matched by a similarity query.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentMatch {
    pub id: i64,
    pub title: String,
    pub content: String,
    /// Cosine distance to the query embedding (lower is closer).
    pub distance: f32,
}

/// SQLite-backed metric and document store.
///
/// The connection sits behind a mutex so the store can be shared between
/// concurrent requests. Every method locks, runs synchronously, and
/// releases before returning.
pub struct MetricStore {
    conn: Mutex<Connection>,
}

impl MetricStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (useful for testing).
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
            CREATE TABLE IF NOT EXISTS revenues (
                region TEXT NOT NULL,
                month TEXT NOT NULL,
                total_revenue INTEGER NOT NULL,
                PRIMARY KEY (region, month)
            );
            CREATE TABLE IF NOT EXISTS marketing_spends (
                region TEXT NOT NULL,
                month TEXT NOT NULL,
                spend_amount INTEGER NOT NULL,
                PRIMARY KEY (region, month)
            );
            CREATE TABLE IF NOT EXISTS churn_metrics (
                region TEXT NOT NULL,
                month TEXT NOT NULL,
                churn_rate REAL NOT NULL,
                PRIMARY KEY (region, month)
            );
            CREATE TABLE IF NOT EXISTS knowledge_base_articles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                embedding TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    /// Total revenue for a region and month, if recorded.
    pub fn revenue(&self, region: &str, month: NaiveDate) -> Result<Option<i64>> {
        self.lookup(Metric::Revenue, region, month)
    }

    /// Marketing spend for a region and month, if recorded.
    pub fn marketing_spend(&self, region: &str, month: NaiveDate) -> Result<Option<i64>> {
        self.lookup(Metric::MarketingSpend, region, month)
    }

    /// Churn rate (percent) for a region and month, if recorded.
    pub fn churn_rate(&self, region: &str, month: NaiveDate) -> Result<Option<f64>> {
        self.lookup(Metric::ChurnRate, region, month)
    }

    fn lookup<T: FromSql>(
        &self,
        metric: Metric,
        region: &str,
        month: NaiveDate,
    ) -> Result<Option<T>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE region = ?1 AND month = ?2",
            metric.column(),
            metric.table()
        );
        let value = self
            .conn()?
            .query_row(&sql, params![region, format_month(month)], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    /// Revenue recorded for the given months, in chronological order.
    ///
    /// Months without a record are omitted.
    pub fn revenue_series(&self, region: &str, months: &[NaiveDate]) -> Result<Vec<(NaiveDate, i64)>> {
        let mut series = Vec::with_capacity(months.len());
        for &month in months {
            if let Some(amount) = self.revenue(region, month)? {
                series.push((month, amount));
            }
        }
        series.sort_by_key(|(month, _)| *month);
        series.dedup_by_key(|(month, _)| *month);
        Ok(series)
    }

    /// Insert or replace the revenue for a region and month.
    pub fn upsert_revenue(&self, region: &str, month: NaiveDate, amount: i64) -> Result<()> {
        self.upsert(Metric::Revenue, region, month, amount)
    }

    /// Insert or replace the marketing spend for a region and month.
    pub fn upsert_marketing_spend(&self, region: &str, month: NaiveDate, amount: i64) -> Result<()> {
        self.upsert(Metric::MarketingSpend, region, month, amount)
    }

    /// Insert or replace the churn rate for a region and month.
    pub fn upsert_churn_rate(&self, region: &str, month: NaiveDate, rate: f64) -> Result<()> {
        self.upsert(Metric::ChurnRate, region, month, rate)
    }

    fn upsert<T: rusqlite::ToSql>(
        &self,
        metric: Metric,
        region: &str,
        month: NaiveDate,
        value: T,
    ) -> Result<()> {
        let sql = format!(
            "INSERT INTO {table} (region, month, {column}) VALUES (?1, ?2, ?3)
             ON CONFLICT (region, month) DO UPDATE SET {column} = excluded.{column}",
            table = metric.table(),
            column = metric.column(),
        );
        self.conn()?
            .execute(&sql, params![region, format_month(month), value])?;
        Ok(())
    }

    /// Remove every metric row.
    pub fn clear_metrics(&self) -> Result<()> {
        self.conn()?.execute_batch(
            "DELETE FROM revenues; DELETE FROM marketing_spends; DELETE FROM churn_metrics;",
        )?;
        Ok(())
    }

    /// Store a knowledge base document with its embedding.
    pub fn insert_document(&self, title: &str, content: &str, embedding: &[f32]) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO knowledge_base_articles (title, content, embedding) VALUES (?1, ?2, ?3)",
            params![title, content, serde_json::to_string(embedding)?],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Remove every knowledge base document.
    pub fn clear_documents(&self) -> Result<()> {
        self.conn()?
            .execute("DELETE FROM knowledge_base_articles", [])?;
        Ok(())
    }

    /// Number of stored knowledge base documents.
    pub fn document_count(&self) -> Result<usize> {
        let count: i64 = self.conn()?.query_row(
            "SELECT COUNT(*) FROM knowledge_base_articles",
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// The `limit` documents closest to `embedding` by cosine distance.
    ///
    /// Documents whose embedding has a different dimensionality than the
    /// query are skipped.
    pub fn nearest_documents(&self, embedding: &[f32], limit: usize) -> Result<Vec<DocumentMatch>> {
        let rows = {
            let conn = self.conn()?;
            let mut stmt =
                conn.prepare("SELECT id, title, content, embedding FROM knowledge_base_articles")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };

        let mut matches = Vec::with_capacity(rows.len());
        for (id, title, content, raw) in rows {
            let stored: Vec<f32> = serde_json::from_str(&raw)?;
            if stored.len() != embedding.len() {
                tracing::warn!(
                    document_id = id,
                    stored = stored.len(),
                    query = embedding.len(),
                    "skipping document with mismatched embedding dimensions"
                );
                continue;
            }
            matches.push(DocumentMatch {
                id,
                title,
                content,
                distance: cosine_distance(&stored, embedding),
            });
        }

        matches.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        matches.truncate(limit);
        Ok(matches)
    }
}

pub(crate) fn format_month(month: NaiveDate) -> String {
    month.format(DATE_FORMAT).to_string()
}

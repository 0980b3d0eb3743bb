//! SQLite-backed storage for the analyst.
//!
//! This crate owns everything the agent reads and writes on disk:
//!
//! 1. **Metrics**: monthly revenue, marketing spend and churn per region,
//!    keyed by `(region, month)` where `month` is the first day of the month.
//!
//! 2. **Knowledge base**: short internal documents with their embeddings,
//!    queried by cosine distance.
//!
//! 3. **Reports**: every answered prompt with the model id and token usage.
//!
//! # Example
//!
//! ```no_run
//! use chrono::NaiveDate;
//! use storage::{MetricStore, Report, ReportStore, TokenCounts};
//!
//! let metrics = MetricStore::open("analyst.db")?;
//! let may = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
//! let revenue = metrics.revenue("EMEA", may)?.unwrap_or(0);
//!
//! let reports = ReportStore::open("analyst.db")?;
//! let report = Report::new(
//!     "What was EMEA revenue in May?",
//!     format!("EMEA revenue in May 2024 was ${revenue}."),
//!     "gemini-2.5-flash-lite",
//!     TokenCounts::default(),
//! );
//! reports.append(&report)?;
//! # Ok::<(), storage::Error>(())
//! ```

mod error;
mod metrics;
mod report;
pub mod seed;
mod store;
pub mod vector;

pub use error::{Error, Result};
pub use metrics::{DocumentMatch, MetricStore};
pub use report::{Report, ReportId, TokenCounts};
pub use store::ReportStore;

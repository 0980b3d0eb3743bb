//! Month-over-month comparison for a region.

use crate::tools::{months_before, round_to, start_of_month};
use chrono::NaiveDate;
use serde::Serialize;
use storage::MetricStore;

/// Percent change from `previous` to `current`, rounded to two decimals.
///
/// A zero baseline yields 0 rather than an infinite or undefined change.
pub fn percent_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    round_to((current - previous) / previous * 100.0, 2)
}

/// One metric in the current and previous month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub current: f64,
    pub previous: f64,
    /// Percent change for amounts, percentage points for rates.
    pub change: f64,
}

/// A region's month compared with the month before it.
///
/// Missing records count as zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyAnalysis {
    pub region: String,
    pub month: NaiveDate,
    pub previous_month: NaiveDate,
    pub revenue: Comparison,
    pub marketing_spend: Comparison,
    pub churn: Comparison,
}

impl MonthlyAnalysis {
    pub fn compute(
        store: &MetricStore,
        region: &str,
        month: NaiveDate,
    ) -> storage::Result<Self> {
        let previous_month = months_before(month, 1).ok_or_else(|| {
            storage::Error::InvalidValue(format!("no month precedes {month}"))
        })?;
        let month = start_of_month(month).unwrap_or(month);

        let amount = |current: Option<i64>, previous: Option<i64>| {
            let (current, previous) = (
                current.unwrap_or(0) as f64,
                previous.unwrap_or(0) as f64,
            );
            Comparison {
                current,
                previous,
                change: percent_change(current, previous),
            }
        };

        let revenue = amount(
            store.revenue(region, month)?,
            store.revenue(region, previous_month)?,
        );
        let marketing_spend = amount(
            store.marketing_spend(region, month)?,
            store.marketing_spend(region, previous_month)?,
        );

        let churn_now = store.churn_rate(region, month)?.unwrap_or(0.0);
        let churn_before = store.churn_rate(region, previous_month)?.unwrap_or(0.0);
        let churn = Comparison {
            current: churn_now,
            previous: churn_before,
            change: round_to(churn_now - churn_before, 2),
        };

        Ok(Self {
            region: region.to_string(),
            month,
            previous_month,
            revenue,
            marketing_spend,
            churn,
        })
    }
}

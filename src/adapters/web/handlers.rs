//! HTTP request handlers for the web adapter.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::domain::comparison::ComparisonResult;
use crate::domain::error::TickerError;
use crate::domain::instrument::Instrument;
use crate::domain::metrics::{AnnotatedBar, SummaryStats};
use crate::domain::service::{MarketService, TopMovers};
use crate::domain::technicals::TechnicalSnapshot;

use super::{AppState, WebError};

pub const DEFAULT_DAYS: i64 = 30;
pub const DEFAULT_COMPARE_DAYS: i64 = 90;
pub const DEFAULT_MOVERS: usize = 5;

/// Run a service call on the blocking pool.
async fn blocking<T, F>(state: &AppState, f: F) -> Result<T, WebError>
where
    F: FnOnce(&MarketService) -> Result<T, TickerError> + Send + 'static,
    T: Send + 'static,
{
    let service = Arc::clone(&state.service);
    tokio::task::spawn_blocking(move || f(&service))
        .await
        .map_err(|e| WebError::internal(format!("worker task failed: {e}")))?
        .map_err(WebError::from)
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": "tickerlens" }))
}

#[derive(Debug, Deserialize)]
pub struct CompaniesQuery {
    pub sector: Option<String>,
}

pub async fn companies(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CompaniesQuery>,
) -> Result<Json<Vec<Instrument>>, WebError> {
    blocking(&state, move |svc| svc.list_companies(query.sector.as_deref()))
        .await
        .map(Json)
}

#[derive(Debug, Deserialize)]
pub struct DaysQuery {
    pub days: Option<i64>,
}

pub async fn bars(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(query): Query<DaysQuery>,
) -> Result<Json<Vec<AnnotatedBar>>, WebError> {
    let days = query.days.unwrap_or(DEFAULT_DAYS);
    blocking(&state, move |svc| svc.get_bars(&symbol, days))
        .await
        .map(Json)
}

pub async fn summary(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<Json<SummaryStats>, WebError> {
    blocking(&state, move |svc| svc.get_summary(&symbol))
        .await
        .map(Json)
}

pub async fn technicals(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<Json<TechnicalSnapshot>, WebError> {
    blocking(&state, move |svc| svc.get_technicals(&symbol))
        .await
        .map(Json)
}

#[derive(Debug, Deserialize)]
pub struct CompareQuery {
    pub symbol1: Option<String>,
    pub symbol2: Option<String>,
    pub days: Option<i64>,
}

pub async fn compare(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CompareQuery>,
) -> Result<Json<ComparisonResult>, WebError> {
    let (Some(symbol1), Some(symbol2)) = (query.symbol1, query.symbol2) else {
        return Err(WebError::bad_request("symbol1 and symbol2 are required"));
    };
    let days = query.days.unwrap_or(DEFAULT_COMPARE_DAYS);
    blocking(&state, move |svc| svc.compare(&symbol1, &symbol2, days))
        .await
        .map(Json)
}

#[derive(Debug, Deserialize)]
pub struct MoversQuery {
    pub limit: Option<usize>,
}

pub async fn movers(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MoversQuery>,
) -> Result<Json<TopMovers>, WebError> {
    let limit = query.limit.unwrap_or(DEFAULT_MOVERS);
    blocking(&state, move |svc| svc.top_movers(limit))
        .await
        .map(Json)
}

pub async fn not_found() -> WebError {
    WebError::not_found("no such endpoint")
}

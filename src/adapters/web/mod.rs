//! JSON HTTP API over the market service.
//!
//! Service calls are blocking (SQLite, HTTP providers), so every handler
//! hands its work to tokio's blocking pool.

mod error;
mod handlers;

pub use error::WebError;
pub use handlers::*;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::domain::service::MarketService;

pub struct AppState {
    pub service: Arc<MarketService>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/companies", get(handlers::companies))
        .route("/api/data/{symbol}", get(handlers::bars))
        .route("/api/summary/{symbol}", get(handlers::summary))
        .route("/api/technicals/{symbol}", get(handlers::technicals))
        .route("/api/compare", get(handlers::compare))
        .route("/api/movers", get(handlers::movers))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

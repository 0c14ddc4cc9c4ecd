#![cfg(feature = "web")]
//! Web handler integration tests: the JSON API driven in-process with
//! `tower::ServiceExt::oneshot`.

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tickerlens::adapters::web::{build_router, AppState};
use tickerlens::ports::catalog_port::CatalogPort;
use tickerlens::ports::store_port::BarStore;
use tower::ServiceExt;

use common::*;

fn create_test_app() -> Router {
    let h = harness(Vec::new());
    h.store
        .upsert_bars("TCS", &generate_bars("TCS", TODAY, 120, 3000.0, 2.0))
        .unwrap();
    h.store
        .upsert_bars("INFY", &generate_bars("INFY", TODAY, 120, 1500.0, -1.0))
        .unwrap();
    h.store
        .upsert_bars("SOLO", &generate_bars("SOLO", TODAY, 1, 10.0, 0.0))
        .unwrap();
    h.store
        .upsert_instrument(&instrument("TCS", "Tata Consultancy Services", "IT"))
        .unwrap();
    h.store
        .upsert_instrument(&instrument("HDFCBANK", "HDFC Bank", "Banking"))
        .unwrap();

    build_router(AppState {
        service: Arc::new(h.service),
    })
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

mod endpoints {
    use super::*;

    #[tokio::test]
    async fn health_reports_service() {
        let (status, body) = get(create_test_app(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "tickerlens");
    }

    #[tokio::test]
    async fn companies_with_sector_filter() {
        let (status, body) = get(create_test_app(), "/api/companies?sector=IT").await;
        assert_eq!(status, StatusCode::OK);
        let list = body.as_array().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["symbol"], "TCS");

        let (_, all) = get(create_test_app(), "/api/companies").await;
        assert_eq!(all.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn bars_default_to_thirty_days() {
        let (status, body) = get(create_test_app(), "/api/data/tcs").await;
        assert_eq!(status, StatusCode::OK);
        let bars = body.as_array().unwrap();
        assert_eq!(bars.len(), 31);
        let last = bars.last().unwrap();
        assert_eq!(last["symbol"], "TCS");
        assert_eq!(last["date"], TODAY);
        assert!(last["ma30"].is_number());
    }

    #[tokio::test]
    async fn bars_with_days_param() {
        let (status, body) = get(create_test_app(), "/api/data/TCS?days=5").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn summary_and_technicals() {
        let (status, summary) = get(create_test_app(), "/api/summary/TCS").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["symbol"], "TCS");
        assert!(summary["week52_high"].is_number());
        assert!(summary["volatility_class"].is_string());

        let (status, tech) = get(create_test_app(), "/api/technicals/TCS").await;
        assert_eq!(status, StatusCode::OK);
        assert!(tech["rsi"].is_number());
        assert_eq!(tech["macd"]["signal_stable"], true);
        assert!(tech["support_resistance"]["support"].is_number());
    }

    #[tokio::test]
    async fn compare_two_symbols() {
        let (status, body) =
            get(create_test_app(), "/api/compare?symbol1=TCS&symbol2=INFY&days=30").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["overlap"], 31);
        assert_eq!(body["better_performer"], "TCS");
    }

    #[tokio::test]
    async fn movers_lists_gainers_and_losers() {
        let (status, body) = get(create_test_app(), "/api/movers?limit=1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["gainers"].as_array().unwrap().len(), 1);
        assert_eq!(body["losers"].as_array().unwrap().len(), 1);
    }
}

mod errors {
    use super::*;

    #[tokio::test]
    async fn unknown_symbol_is_404_with_detail() {
        let (status, body) = get(create_test_app(), "/api/summary/ZZZZ").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["detail"].as_str().unwrap().contains("ZZZZ"));
    }

    #[tokio::test]
    async fn bad_days_is_400() {
        let (status, body) = get(create_test_app(), "/api/data/TCS?days=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn compare_requires_both_symbols() {
        let (status, _) = get(create_test_app(), "/api/compare?symbol1=TCS").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn compare_single_shared_date_is_422() {
        let (status, body) =
            get(create_test_app(), "/api/compare?symbol1=TCS&symbol2=SOLO&days=30").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].as_str().unwrap().contains("insufficient overlap"));
    }

    #[tokio::test]
    async fn compare_with_unknown_symbol_is_404() {
        let (status, _) =
            get(create_test_app(), "/api/compare?symbol1=TCS&symbol2=ZZZZ&days=30").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let (status, body) = get(create_test_app(), "/api/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "no such endpoint");
    }
}

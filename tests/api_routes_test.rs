mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use serde_json::Value;
use tower::ServiceExt;

use btc_price_backend::app::create_app;
use btc_price_backend::services::history_service::MAX_LOOKBACK_DAYS;
use btc_price_backend::store::MemoryPriceStore;

use common::{records, state_with, RecordingProvider};

fn app_with(store: Arc<MemoryPriceStore>, provider: Arc<RecordingProvider>) -> Router {
    create_app(state_with(store, provider))
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_last_days_returns_ascending_records() {
    let today = Utc::now().date_naive();
    let store = Arc::new(MemoryPriceStore::with_records(records(today - Duration::days(2), today)));
    let provider = Arc::new(RecordingProvider::new());

    let (status, body) = get(app_with(store, provider.clone()), "/api/btc-price?days=3").await;

    assert_eq!(status, StatusCode::OK);
    let dates: Vec<String> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["date"].as_str().unwrap().to_string())
        .collect();
    let expected: Vec<String> = (0..3)
        .rev()
        .map(|i| (today - Duration::days(i)).format("%Y-%m-%d").to_string())
        .collect();
    assert_eq!(dates, expected);
    assert!(body[0]["price"].is_number());
    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn test_huge_days_is_capped_instead_of_overflowing() {
    let today = Utc::now().date_naive();
    let store = Arc::new(MemoryPriceStore::new());
    let provider = Arc::new(RecordingProvider::new());

    let (status, body) =
        get(app_with(store, provider.clone()), "/api/btc-price?days=200000000").await;

    assert_eq!(status, StatusCode::OK);
    let prices = body.as_array().unwrap();
    assert_eq!(prices.len(), MAX_LOOKBACK_DAYS as usize);
    assert_eq!(
        prices.last().and_then(|p| p["date"].as_str()),
        Some(today.format("%Y-%m-%d").to_string().as_str())
    );
    assert_eq!(provider.calls().len(), 4);
}

#[tokio::test]
async fn test_range_requires_both_bounds_before_any_access() {
    let store = Arc::new(MemoryPriceStore::new());
    let provider = Arc::new(RecordingProvider::new());

    for uri in [
        "/api/btc-price-range",
        "/api/btc-price-range?start=2024-01-01",
        "/api/btc-price-range?end=2024-01-31",
    ] {
        let (status, body) = get(app_with(store.clone(), provider.clone()), uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert!(body["error"].is_string());
    }

    assert_eq!(store.reads(), 0);
    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn test_range_rejects_malformed_dates() {
    let store = Arc::new(MemoryPriceStore::new());
    let provider = Arc::new(RecordingProvider::new());

    let (status, _) = get(
        app_with(store.clone(), provider),
        "/api/btc-price-range?start=yesterday&end=2024-01-31",
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(store.reads(), 0);
}

#[tokio::test]
async fn test_range_backfills_then_returns_data() {
    let store = Arc::new(MemoryPriceStore::new());
    let provider = Arc::new(RecordingProvider::new());

    let (status, body) = get(
        app_with(store, provider.clone()),
        "/api/btc-price-range?start=2024-01-01&end=2024-01-10",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(10));
    assert_eq!(provider.calls().len(), 1);
}

#[tokio::test]
async fn test_range_without_data_is_404() {
    let store = Arc::new(MemoryPriceStore::new());
    let provider = Arc::new(RecordingProvider::new());
    provider.set_empty(true);

    let (status, body) = get(
        app_with(store, provider),
        "/api/btc-price-range?start=2016-01-01&end=2016-01-31",
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_storage_failure_is_500_with_generic_message() {
    let store = Arc::new(MemoryPriceStore::new());
    store.set_failing(true);
    let provider = Arc::new(RecordingProvider::new());

    let (status, body) = get(app_with(store, provider), "/api/btc-price?days=7").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to retrieve price data");
}

#[tokio::test]
async fn test_cors_allows_only_listed_origins() {
    let today = Utc::now().date_naive();
    let store = Arc::new(MemoryPriceStore::with_records(records(today - Duration::days(6), today)));
    let provider = Arc::new(RecordingProvider::new());
    let app = app_with(store, provider);

    let request = |origin: &str| {
        Request::builder()
            .uri("/api/btc-price")
            .header(header::ORIGIN, origin)
            .body(Body::empty())
            .unwrap()
    };

    let allowed = app.clone().oneshot(request("http://localhost:8080")).await.unwrap();
    assert_eq!(
        allowed.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "http://localhost:8080"
    );

    let denied = app.oneshot(request("http://evil.example")).await.unwrap();
    assert!(denied.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}

#[tokio::test]
async fn test_public_config_and_health() {
    let store = Arc::new(MemoryPriceStore::new());
    let provider = Arc::new(RecordingProvider::new());
    let app = app_with(store, provider);

    let (status, body) = get(app.clone(), "/api/config").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["apiBaseUrl"], "http://localhost:5000");

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::{error, info};

use crate::errors::AppError;
use crate::models::PriceRecord;
use crate::services::price_service::{self, DEFAULT_DAYS};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/btc-price", get(get_btc_price))
        .route("/api/btc-price-range", get(get_btc_price_range))
}

/// Raw query values; bad input falls back to defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuery {
    pub days: Option<String>,
    pub force_refresh: Option<String>,
}

/// Raw query values; bad bounds are rejected by [`parse_range`].
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRangeQuery {
    pub start: Option<String>,
    pub end: Option<String>,
    pub force_refresh: Option<String>,
}

/// Missing, non-numeric and zero values all mean the default window.
pub fn parse_days(raw: Option<&str>) -> u32 {
    raw.and_then(|s| s.trim().parse::<u32>().ok())
        .filter(|days| *days > 0)
        .unwrap_or(DEFAULT_DAYS)
}

pub fn is_force_refresh(raw: Option<&str>) -> bool {
    raw == Some("true")
}

pub fn parse_range(
    start: Option<&str>,
    end: Option<&str>,
) -> Result<(NaiveDate, NaiveDate), AppError> {
    let (start, end) = match (start.map(str::trim), end.map(str::trim)) {
        (Some(s), Some(e)) if !s.is_empty() && !e.is_empty() => (s, e),
        _ => {
            return Err(AppError::Validation(
                "Both start and end dates are required".to_string(),
            ))
        }
    };

    let parse = |value: &str, name: &str| {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
            AppError::Validation(format!("Invalid {} date {:?}, expected YYYY-MM-DD", name, value))
        })
    };
    let start = parse(start, "start")?;
    let end = parse(end, "end")?;

    if start > end {
        return Err(AppError::Validation(format!(
            "start ({}) must not be after end ({})",
            start, end
        )));
    }

    Ok((start, end))
}

/// GET /api/btc-price?days=<int>&forceRefresh=<bool>
pub async fn get_btc_price(
    State(state): State<AppState>,
    Query(query): Query<PriceQuery>,
) -> Result<Json<Arc<Vec<PriceRecord>>>, AppError> {
    let days = parse_days(query.days.as_deref());
    let force_refresh = is_force_refresh(query.force_refresh.as_deref());
    info!("GET /api/btc-price - days={}, forceRefresh={}", days, force_refresh);

    let prices = price_service::get_last_days(&state, days, force_refresh, Utc::now().date_naive())
        .await
        .map_err(|e| {
            error!("Failed to get prices for last {} days: {}", days, e);
            e
        })?;

    Ok(Json(prices))
}

/// GET /api/btc-price-range?start=<date>&end=<date>
pub async fn get_btc_price_range(
    State(state): State<AppState>,
    Query(query): Query<PriceRangeQuery>,
) -> Result<Json<Arc<Vec<PriceRecord>>>, AppError> {
    let (start, end) = parse_range(query.start.as_deref(), query.end.as_deref())?;
    let force_refresh = is_force_refresh(query.force_refresh.as_deref());
    info!("GET /api/btc-price-range - start={}, end={}", start, end);

    let prices = price_service::get_range(&state, start, end, force_refresh, Utc::now().date_naive())
        .await
        .map_err(|e| {
            match &e {
                AppError::NotFound(_) => info!("No prices for {} to {}", start, end),
                _ => error!("Failed to get prices for {} to {}: {}", start, end, e),
            }
            e
        })?;

    Ok(Json(prices))
}

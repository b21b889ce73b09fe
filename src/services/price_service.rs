//! Read paths behind the price endpoints.
//!
//! Both paths share one procedure: look in the response cache, otherwise take the
//! single-flight lock for the query shape, read storage, fetch today's candle or
//! backfill whatever part of the window is missing, re-read, and cache the result.

use std::cmp::{max, min};
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::PriceRecord;
use crate::services::history_service::{self, FetchRange, MAX_LOOKBACK_DAYS};
use crate::services::response_cache::{days_key, range_key};
use crate::state::AppState;

pub const DEFAULT_DAYS: u32 = 7;

/// Prices for the `days` calendar days ending `today`, oldest first.
///
/// `days` is capped at [`MAX_LOOKBACK_DAYS`].
pub async fn get_last_days(
    state: &AppState,
    days: u32,
    force_refresh: bool,
    today: NaiveDate,
) -> Result<Arc<Vec<PriceRecord>>, AppError> {
    let days = days.clamp(1, MAX_LOOKBACK_DAYS);
    let key = days_key(days);

    if let Some(cached) = cached_response(state, &key, force_refresh) {
        return Ok(cached);
    }

    let _flight = state.in_flight.acquire(&key).await;
    if let Some(cached) = cached_response(state, &key, force_refresh) {
        return Ok(cached);
    }

    let (start, end) = FetchRange::LastDays(days).resolve(today);
    let prices = Arc::new(fill_window(state, start, end, today).await?);

    state.response_cache.insert(key, prices.clone());
    Ok(prices)
}

/// Prices within `[start, end]` inclusive, oldest first.
///
/// Fails with [`AppError::NotFound`] when nothing could be stored or fetched.
pub async fn get_range(
    state: &AppState,
    start: NaiveDate,
    end: NaiveDate,
    force_refresh: bool,
    today: NaiveDate,
) -> Result<Arc<Vec<PriceRecord>>, AppError> {
    let key = range_key(&start.to_string(), &end.to_string());

    if let Some(cached) = cached_response(state, &key, force_refresh) {
        return Ok(cached);
    }

    let _flight = state.in_flight.acquire(&key).await;
    if let Some(cached) = cached_response(state, &key, force_refresh) {
        return Ok(cached);
    }

    info!("Looking up prices from {} to {}", start, end);
    let prices = fill_window(state, start, end, today).await?;

    if prices.is_empty() {
        warn!("No price data available for {} to {}", start, end);
        return Err(AppError::NotFound(format!(
            "No price data available for {} to {}",
            start, end
        )));
    }

    let prices = Arc::new(prices);
    state.response_cache.insert(key, prices.clone());
    Ok(prices)
}

fn cached_response(
    state: &AppState,
    key: &str,
    force_refresh: bool,
) -> Option<Arc<Vec<PriceRecord>>> {
    if force_refresh {
        return None;
    }
    let cached = state.response_cache.get(key)?;
    info!("Serving cached prices for {}", key);
    Some(cached)
}

/// Read `[start, end]` from storage, fetching from the exchange what is missing.
///
/// Days after `today`, or more than [`MAX_LOOKBACK_DAYS`] before it, are never fetched.
async fn fill_window(
    state: &AppState,
    start: NaiveDate,
    end: NaiveDate,
    today: NaiveDate,
) -> Result<Vec<PriceRecord>, AppError> {
    let store = state.store.as_ref();
    let provider = state.price_provider.as_ref();

    let mut prices = store.fetch_between(start, end).await?;

    let fetch_start = max(start, history_service::earliest_fetchable(today, MAX_LOOKBACK_DAYS));
    let fetch_end = min(end, today);
    if fetch_end < fetch_start {
        return Ok(prices);
    }

    if prices.is_empty() {
        info!("No stored prices for {} to {}, backfilling from exchange", fetch_start, fetch_end);
        history_service::fetch_historical_data(
            store,
            provider,
            FetchRange::Between(fetch_start, fetch_end),
            today,
        )
        .await?;
        return Ok(store.fetch_between(start, end).await?);
    }

    let today_in_window = start <= today && today <= end;
    if today_in_window && !prices.iter().any(|p| p.date == today) {
        info!("Price for today ({}) is missing, fetching from exchange", today);
        history_service::fetch_historical_data(store, provider, FetchRange::LastDays(1), today)
            .await?;
        prices = store.fetch_between(start, end).await?;
    }

    if let Some((from, to)) = history_service::missing_span(fetch_start, fetch_end, &prices) {
        info!("Prices missing between {} and {}, backfilling from exchange", from, to);
        history_service::fetch_historical_data(
            store,
            provider,
            FetchRange::Between(from, to),
            today,
        )
        .await?;
        prices = store.fetch_between(start, end).await?;
    }

    Ok(prices)
}

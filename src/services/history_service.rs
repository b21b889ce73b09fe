//! Historical price fetching.
//!
//! A requested date range is paged into chunks of at most [`CHUNK_DAYS`] days, one
//! exchange request per chunk. Chunks that fail or come back empty are logged and
//! skipped without retry; everything that did arrive is written with a single bulk
//! upsert keyed on date.

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate, Utc};
use tracing::{error, info, warn};

use crate::errors::AppError;
use crate::external::price_provider::PriceProvider;
use crate::models::PriceRecord;
use crate::store::PriceStore;

/// Maximum number of daily candles the exchange returns per request.
pub const CHUNK_DAYS: u32 = 1000;

/// Storage is topped up to this many days on startup.
pub const REQUIRED_HISTORY_DAYS: u32 = 999;

/// Furthest back, in days ending today, the exchange is ever asked for.
pub const MAX_LOOKBACK_DAYS: u32 = 3650;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchRange {
    /// The `n` calendar days ending today, inclusive.
    LastDays(u32),
    /// Inclusive date bounds.
    Between(NaiveDate, NaiveDate),
}

impl FetchRange {
    /// Concrete `(start, end)` bounds relative to `today`.
    ///
    /// `LastDays` is capped at [`MAX_LOOKBACK_DAYS`].
    pub fn resolve(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match *self {
            FetchRange::LastDays(days) => (earliest_fetchable(today, days), today),
            FetchRange::Between(start, end) => (start, end),
        }
    }
}

/// First day of the `days`-long window ending `today`, capped at [`MAX_LOOKBACK_DAYS`].
pub fn earliest_fetchable(today: NaiveDate, days: u32) -> NaiveDate {
    let days = days.clamp(1, MAX_LOOKBACK_DAYS);
    today
        .checked_sub_signed(Duration::days(i64::from(days) - 1))
        .unwrap_or(NaiveDate::MIN)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateChunk {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Split `[start, end]` into consecutive chunks of at most `chunk_days` days.
///
/// Returns an empty list when `start > end` or `chunk_days` is zero.
pub fn split_into_chunks(start: NaiveDate, end: NaiveDate, chunk_days: u32) -> Vec<DateChunk> {
    if start > end || chunk_days == 0 {
        return Vec::new();
    }

    let step = Duration::days(i64::from(chunk_days));
    let mut chunks = Vec::new();
    let mut chunk_start = start;

    while chunk_start <= end {
        let chunk_end = std::cmp::min(chunk_start + step - Duration::days(1), end);
        chunks.push(DateChunk {
            start: chunk_start,
            end: chunk_end,
        });
        chunk_start = chunk_end + Duration::days(1);
    }

    chunks
}

/// Fetch `range` from the provider and upsert whatever arrives.
///
/// Returns the records received in this call, oldest first. They are not re-read from
/// storage, so callers that need what is actually stored must query again.
pub async fn fetch_historical_data(
    store: &dyn PriceStore,
    provider: &dyn PriceProvider,
    range: FetchRange,
    today: NaiveDate,
) -> Result<Vec<PriceRecord>, AppError> {
    let (start, end) = range.resolve(today);
    let chunks = split_into_chunks(start, end, CHUNK_DAYS);

    info!(
        "Fetching price history {} to {} ({} chunk(s))",
        start,
        end,
        chunks.len()
    );

    let mut all_records: Vec<PriceRecord> = Vec::new();

    for (i, chunk) in chunks.iter().enumerate() {
        let chunk_no = i + 1;
        info!("Requesting chunk {}: {} to {}", chunk_no, chunk.start, chunk.end);

        match provider
            .fetch_daily_closes(chunk.start, chunk.end, CHUNK_DAYS)
            .await
        {
            Ok(points) if points.is_empty() => {
                warn!("Chunk {}: exchange returned no data", chunk_no);
            }
            Ok(points) => {
                info!("Chunk {}: received {} records", chunk_no, points.len());
                all_records.extend(points.into_iter().map(PriceRecord::from));
            }
            Err(e) => {
                error!("Chunk {}: failed to fetch prices: {}", chunk_no, e);
            }
        }
    }

    if all_records.is_empty() {
        warn!("No price data to save for {} to {}", start, end);
        return Ok(Vec::new());
    }

    all_records.sort_by_key(|r| r.date);

    info!("Saving {} price records", all_records.len());
    store.upsert_many(&all_records).await.map_err(|e| {
        error!("Failed to save fetched price history: {}", e);
        AppError::Db(e)
    })?;

    Ok(all_records)
}

/// Dates in `[start, end]` that have no record in `present`.
pub fn missing_dates(start: NaiveDate, end: NaiveDate, present: &[PriceRecord]) -> Vec<NaiveDate> {
    if start > end {
        return Vec::new();
    }

    let have: BTreeSet<NaiveDate> = present.iter().map(|r| r.date).collect();
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| !have.contains(d))
        .collect()
}

/// Smallest range covering every missing date of `[start, end]`, if any are missing.
pub fn missing_span(
    start: NaiveDate,
    end: NaiveDate,
    present: &[PriceRecord],
) -> Option<(NaiveDate, NaiveDate)> {
    let missing = missing_dates(start, end, present);
    match (missing.first(), missing.last()) {
        (Some(first), Some(last)) => Some((*first, *last)),
        _ => None,
    }
}

/// Make sure storage holds at least `required_days` of history before serving.
///
/// Only the span of the last `required_days` days that is actually missing is fetched.
pub async fn ensure_minimum_history(
    store: &dyn PriceStore,
    provider: &dyn PriceProvider,
    required_days: u32,
) -> Result<usize, AppError> {
    let count = store.count().await?;
    info!("Database currently holds {} price records", count);

    if count >= i64::from(required_days) {
        info!("Enough history stored ({} days)", count);
        return Ok(0);
    }

    let today = Utc::now().date_naive();
    let (start, end) = FetchRange::LastDays(required_days).resolve(today);
    let present = store.fetch_between(start, end).await?;

    let Some((from, to)) = missing_span(start, end, &present) else {
        info!("No gaps in the last {} days", required_days);
        return Ok(0);
    };

    warn!(
        "Not enough history ({}/{} days), backfilling {} to {}",
        count, required_days, from, to
    );

    let fetched =
        fetch_historical_data(store, provider, FetchRange::Between(from, to), today).await?;
    Ok(fetched.len())
}

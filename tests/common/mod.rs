#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use parking_lot::Mutex;

use btc_price_backend::config::AppConfig;
use btc_price_backend::external::price_provider::{
    ExternalPricePoint, PriceProvider, PriceProviderError,
};
use btc_price_backend::models::PriceRecord;
use btc_price_backend::state::AppState;
use btc_price_backend::store::MemoryPriceStore;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Deterministic close used by the fake exchange.
pub fn synthetic_price(date: NaiveDate) -> f64 {
    20_000.0 + f64::from(date.num_days_from_ce() % 1000)
}

pub fn records(start: NaiveDate, end: NaiveDate) -> Vec<PriceRecord> {
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .map(|d| PriceRecord::new(d, synthetic_price(d)))
        .collect()
}

/// Fake exchange that serves one candle per requested day and records every call.
#[derive(Default)]
pub struct RecordingProvider {
    calls: Mutex<Vec<(NaiveDate, NaiveDate)>>,
    failing_starts: Mutex<HashSet<NaiveDate>>,
    empty: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl RecordingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<(NaiveDate, NaiveDate)> {
        self.calls.lock().clone()
    }

    /// Requests whose chunk starts on `start` fail with a network error.
    pub fn fail_chunk_starting(&self, start: NaiveDate) {
        self.failing_starts.lock().insert(start);
    }

    pub fn set_empty(&self, empty: bool) {
        self.empty.store(empty, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }
}

#[async_trait]
impl PriceProvider for RecordingProvider {
    async fn fetch_daily_closes(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        limit: u32,
    ) -> Result<Vec<ExternalPricePoint>, PriceProviderError> {
        self.calls.lock().push((start, end));

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing_starts.lock().contains(&start) {
            return Err(PriceProviderError::Network("connection reset".into()));
        }
        if self.empty.load(Ordering::SeqCst) {
            return Ok(Vec::new());
        }

        Ok(records(start, end)
            .into_iter()
            .take(limit as usize)
            .map(|r| ExternalPricePoint { date: r.date, close: r.price })
            .collect())
    }
}

pub fn state_with(store: Arc<MemoryPriceStore>, provider: Arc<RecordingProvider>) -> AppState {
    AppState::new(store, provider, AppConfig::default())
}

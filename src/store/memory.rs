use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::RwLock;

use crate::models::PriceRecord;
use crate::store::PriceStore;

/// Process-local store keyed by date. Used by tests and local experiments.
#[derive(Default)]
pub struct MemoryPriceStore {
    prices: RwLock<BTreeMap<NaiveDate, f64>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryPriceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = PriceRecord>) -> Self {
        let store = Self::new();
        store
            .prices
            .write()
            .extend(records.into_iter().map(|r| (r.date, r.price)));
        store
    }

    /// Number of `fetch_between` and `count` calls served so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of `upsert_many` calls served so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make every subsequent call fail with a pool timeout.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> Vec<PriceRecord> {
        self.prices
            .read()
            .iter()
            .map(|(date, price)| PriceRecord::new(*date, *price))
            .collect()
    }

    fn check(&self) -> Result<(), sqlx::Error> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(sqlx::Error::PoolTimedOut);
        }
        Ok(())
    }
}

#[async_trait]
impl PriceStore for MemoryPriceStore {
    async fn upsert_many(&self, records: &[PriceRecord]) -> Result<u64, sqlx::Error> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.check()?;

        let mut prices = self.prices.write();
        for record in records {
            prices.insert(record.date, record.price);
        }
        Ok(records.len() as u64)
    }

    async fn fetch_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceRecord>, sqlx::Error> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.check()?;

        if start > end {
            return Ok(Vec::new());
        }

        Ok(self
            .prices
            .read()
            .range(start..=end)
            .map(|(date, price)| PriceRecord::new(*date, *price))
            .collect())
    }

    async fn count(&self) -> Result<i64, sqlx::Error> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.check()?;

        Ok(self.prices.read().len() as i64)
    }
}

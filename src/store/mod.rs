//! Storage seam for daily prices.
//!
//! Services talk to [`PriceStore`] rather than a pool so the gap-filling logic can run
//! against Postgres in production and against [`MemoryPriceStore`] in tests.

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::models::PriceRecord;

pub use memory::MemoryPriceStore;
pub use postgres::PgPriceStore;

#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Insert or overwrite the price of each record's date. Returns affected rows.
    async fn upsert_many(&self, records: &[PriceRecord]) -> Result<u64, sqlx::Error>;

    /// Records within `[start, end]` inclusive, ascending by date.
    async fn fetch_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceRecord>, sqlx::Error>;

    async fn count(&self) -> Result<i64, sqlx::Error>;
}

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;

use crate::db::price_queries;
use crate::models::PriceRecord;
use crate::store::PriceStore;

#[derive(Clone)]
pub struct PgPriceStore {
    pool: PgPool,
}

impl PgPriceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl PriceStore for PgPriceStore {
    async fn upsert_many(&self, records: &[PriceRecord]) -> Result<u64, sqlx::Error> {
        price_queries::upsert_many(&self.pool, records).await
    }

    async fn fetch_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceRecord>, sqlx::Error> {
        price_queries::fetch_between(&self.pool, start, end).await
    }

    async fn count(&self) -> Result<i64, sqlx::Error> {
        price_queries::count(&self.pool).await
    }
}

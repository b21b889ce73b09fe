use std::collections::BTreeMap;

use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::error;

use crate::models::PriceRecord;

/// Insert or update daily prices keyed on `date`.
///
/// Duplicate dates in `records` collapse to the last occurrence, since Postgres refuses
/// to touch the same row twice within one `ON CONFLICT` statement.
pub async fn upsert_many(pool: &PgPool, records: &[PriceRecord]) -> Result<u64, sqlx::Error> {
    if records.is_empty() {
        return Ok(0);
    }

    let deduped: BTreeMap<NaiveDate, f64> = records.iter().map(|r| (r.date, r.price)).collect();
    let (dates, prices): (Vec<NaiveDate>, Vec<f64>) = deduped.into_iter().unzip();

    let result = sqlx::query(
        r#"
        INSERT INTO btc_prices (date, price)
        SELECT * FROM UNNEST($1::date[], $2::float8[])
        ON CONFLICT (date)
        DO UPDATE SET price = EXCLUDED.price, updated_at = NOW()
        "#,
    )
    .bind(&dates)
    .bind(&prices)
    .execute(pool)
    .await
    .map_err(|e| {
        error!("Failed to upsert {} price records: {}", dates.len(), e);
        e
    })?;

    Ok(result.rows_affected())
}

/// Prices within `[start, end]` inclusive, oldest first.
pub async fn fetch_between(
    pool: &PgPool,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<PriceRecord>, sqlx::Error> {
    sqlx::query_as::<_, PriceRecord>(
        r#"
        SELECT date, price
        FROM btc_prices
        WHERE date BETWEEN $1 AND $2
        ORDER BY date ASC
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await
}

pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM btc_prices")
        .fetch_one(pool)
        .await
}

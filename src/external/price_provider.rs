use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::models::PriceRecord;

/// One daily candle as reported by an exchange, reduced to its close.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalPricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl From<ExternalPricePoint> for PriceRecord {
    fn from(point: ExternalPricePoint) -> Self {
        PriceRecord::new(point.date, point.close)
    }
}

#[derive(Debug, Error)]
pub enum PriceProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("parse error: {0}")]
    Parse(String),
}

#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Daily closes for candles opening within `[start, end]` (UTC days), oldest first.
    ///
    /// At most `limit` points are returned; callers page larger ranges themselves.
    async fn fetch_daily_closes(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        limit: u32,
    ) -> Result<Vec<ExternalPricePoint>, PriceProviderError>;
}

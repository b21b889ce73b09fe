use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use serde_json::Value;

use crate::external::price_provider::{ExternalPricePoint, PriceProvider, PriceProviderError};

pub const DEFAULT_BASE_URL: &str = "https://api1.binance.com";
pub const DEFAULT_SYMBOL: &str = "BTCUSDT";
const DAILY_INTERVAL: &str = "1d";

// Positions inside a kline row.
const OPEN_TIME_IDX: usize = 0;
const CLOSE_IDX: usize = 4;

pub struct BinanceProvider {
    client: reqwest::Client,
    base_url: String,
    symbol: String,
}

impl BinanceProvider {
    pub fn new(
        base_url: impl Into<String>,
        symbol: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, PriceProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PriceProviderError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            symbol: symbol.into(),
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}

/// Epoch millis of 00:00 UTC on `date`.
fn day_start_millis(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp_millis())
        .unwrap_or_default()
}

/// Convert the kline array-of-arrays payload into daily closes.
pub fn parse_klines(rows: &[Vec<Value>]) -> Result<Vec<ExternalPricePoint>, PriceProviderError> {
    rows.iter()
        .map(|row| {
            let open_time = row
                .get(OPEN_TIME_IDX)
                .and_then(Value::as_i64)
                .ok_or_else(|| PriceProviderError::Parse("kline missing open time".into()))?;

            // Binance sends prices as decimal strings; accept bare numbers too.
            let close = match row.get(CLOSE_IDX) {
                Some(Value::String(s)) => s
                    .parse::<f64>()
                    .map_err(|e| PriceProviderError::Parse(format!("close price {s:?}: {e}")))?,
                Some(Value::Number(n)) => n
                    .as_f64()
                    .ok_or_else(|| PriceProviderError::Parse("close price out of range".into()))?,
                _ => return Err(PriceProviderError::Parse("kline missing close price".into())),
            };

            let date = DateTime::from_timestamp_millis(open_time)
                .ok_or_else(|| PriceProviderError::Parse(format!("invalid open time {open_time}")))?
                .date_naive();

            Ok(ExternalPricePoint { date, close })
        })
        .collect()
}

#[async_trait]
impl PriceProvider for BinanceProvider {
    async fn fetch_daily_closes(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        limit: u32,
    ) -> Result<Vec<ExternalPricePoint>, PriceProviderError> {
        let url = format!("{}/api/v3/klines", self.base_url);

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("symbol", self.symbol.clone()),
                ("interval", DAILY_INTERVAL.to_string()),
                ("startTime", day_start_millis(start).to_string()),
                ("endTime", day_start_millis(end).to_string()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await
            .map_err(|e| PriceProviderError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PriceProviderError::BadResponse(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        let rows: Vec<Vec<Value>> = resp
            .json()
            .await
            .map_err(|e| PriceProviderError::Parse(e.to_string()))?;

        parse_klines(&rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn kline(open_time: i64, close: &str) -> Value {
        json!([
            open_time, "60000.00", "61000.00", "59000.00", close, "1234.5",
            open_time + 86_399_999, "74000000.0", 100000, "600.0", "37000000.0", "0"
        ])
    }

    fn provider(base_url: &str) -> BinanceProvider {
        BinanceProvider::new(base_url, DEFAULT_SYMBOL, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_parse_klines_uses_open_time_and_close() {
        // 2024-03-01T00:00:00Z
        let rows: Vec<Vec<Value>> =
            serde_json::from_value(json!([kline(1_709_251_200_000, "62431.65")])).unwrap();

        let points = parse_klines(&rows).unwrap();

        assert_eq!(
            points,
            vec![ExternalPricePoint {
                date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                close: 62431.65,
            }]
        );
    }

    #[test]
    fn test_parse_klines_rejects_malformed_rows() {
        let rows: Vec<Vec<Value>> = serde_json::from_value(json!([[1_709_251_200_000_i64]])).unwrap();
        assert!(matches!(parse_klines(&rows), Err(PriceProviderError::Parse(_))));

        let rows: Vec<Vec<Value>> =
            serde_json::from_value(json!([kline(1_709_251_200_000, "n/a")])).unwrap();
        assert!(matches!(parse_klines(&rows), Err(PriceProviderError::Parse(_))));
    }

    #[test]
    fn test_day_start_millis() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(day_start_millis(date), 1_709_251_200_000);
    }

    #[tokio::test]
    async fn test_fetch_sends_kline_query() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v3/klines"))
            .and(query_param("symbol", "BTCUSDT"))
            .and(query_param("interval", "1d"))
            .and(query_param("startTime", "1709251200000"))
            .and(query_param("endTime", "1709337600000"))
            .and(query_param("limit", "1000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                kline(1_709_251_200_000, "62431.65"),
                kline(1_709_337_600_000, "62029.84"),
            ])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let points = provider(&mock_server.uri())
            .fetch_daily_closes(
                NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
                1000,
            )
            .await
            .unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[1].date, NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
        assert_eq!(points[1].close, 62029.84);
    }

    #[tokio::test]
    async fn test_fetch_maps_http_errors() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v3/klines"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({ "code": -1121, "msg": "Invalid symbol." })),
            )
            .mount(&mock_server)
            .await;

        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let err = provider(&mock_server.uri())
            .fetch_daily_closes(day, day, 1000)
            .await
            .unwrap_err();

        assert!(matches!(err, PriceProviderError::BadResponse(msg) if msg.contains("Invalid symbol")));
    }

    #[tokio::test]
    async fn test_fetch_returns_empty_for_empty_array() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v3/klines"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&mock_server)
            .await;

        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let points = provider(&mock_server.uri())
            .fetch_daily_closes(day, day, 1000)
            .await
            .unwrap();

        assert!(points.is_empty());
    }
}

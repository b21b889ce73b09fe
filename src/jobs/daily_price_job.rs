//! Daily price collection.
//!
//! Fetches the most recent daily candle so storage stays current even when nobody
//! queries the API. Runs once a day on the schedule configured in `AppConfig`.

use chrono::Utc;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::services::history_service::{self, FetchRange};
use crate::services::job_scheduler_service::{JobContext, JobResult};

pub async fn fetch_daily_price(ctx: JobContext) -> Result<JobResult, AppError> {
    info!("💰 Collecting daily BTC price...");

    let today = Utc::now().date_naive();
    let records = history_service::fetch_historical_data(
        ctx.store.as_ref(),
        ctx.price_provider.as_ref(),
        FetchRange::LastDays(1),
        today,
    )
    .await?;

    if records.is_empty() {
        warn!("No price received for {}", today);
        return Ok(JobResult { items_processed: 0, items_failed: 1 });
    }

    Ok(JobResult {
        items_processed: records.len() as i32,
        items_failed: 0,
    })
}

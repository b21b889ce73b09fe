//! Response cache housekeeping.

use tracing::info;

use crate::errors::AppError;
use crate::services::job_scheduler_service::{JobContext, JobResult};

/// Evict expired response cache entries, including keys nobody asks for again.
pub async fn cleanup_response_cache(ctx: JobContext) -> Result<JobResult, AppError> {
    let removed = ctx.response_cache.cleanup_expired();
    info!(
        "🧹 Removed {} expired cache entries ({} remaining)",
        removed,
        ctx.response_cache.len()
    );

    Ok(JobResult {
        items_processed: removed as i32,
        items_failed: 0,
    })
}

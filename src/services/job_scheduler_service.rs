use crate::errors::AppError;
use crate::external::price_provider::PriceProvider;
use crate::jobs::{cache_cleanup_job, daily_price_job};
use crate::services::response_cache::ResponseCache;
use crate::store::PriceStore;
use chrono::Utc;
use chrono_tz::Tz;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

// Context passed to job functions
#[derive(Clone)]
pub struct JobContext {
    pub store: Arc<dyn PriceStore>,
    pub price_provider: Arc<dyn PriceProvider>,
    pub response_cache: ResponseCache,
}

/// Expired response cache entries are swept every ten minutes.
pub const CACHE_CLEANUP_CRON: &str = "0 */10 * * * *";

#[derive(Debug, Clone)]
pub struct JobSchedule {
    /// Six-field cron expression (sec min hour day month weekday).
    pub cron: String,
    pub timezone: Tz,
}

pub struct JobSchedulerService {
    scheduler: JobScheduler,
    context: JobContext,
    daily_fetch: JobSchedule,
}

#[derive(Debug, PartialEq, Eq)]
pub struct JobResult {
    pub items_processed: i32,
    pub items_failed: i32,
}

impl JobSchedulerService {
    pub async fn new(context: JobContext, daily_fetch: JobSchedule) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create scheduler: {}", e)))?;

        Ok(Self {
            scheduler,
            context,
            daily_fetch,
        })
    }

    /// Start all scheduled jobs
    pub async fn start(&mut self) -> Result<(), AppError> {
        info!("🚀 Starting job scheduler...");

        let schedule = self.daily_fetch.clone();
        self.schedule_job(
            &schedule,
            "fetch_daily_price",
            daily_price_job::fetch_daily_price,
        )
        .await?;

        let cleanup = JobSchedule {
            cron: CACHE_CLEANUP_CRON.to_string(),
            timezone: chrono_tz::UTC,
        };
        self.schedule_job(
            &cleanup,
            "cleanup_response_cache",
            cache_cleanup_job::cleanup_response_cache,
        )
        .await?;

        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to start scheduler: {}", e)))?;

        info!("✅ Job scheduler started");
        Ok(())
    }

    /// Stop the scheduler gracefully
    pub async fn stop(&mut self) -> Result<(), AppError> {
        info!("🛑 Stopping job scheduler...");
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to stop scheduler: {}", e)))?;
        info!("Job scheduler stopped");
        Ok(())
    }

    async fn schedule_job<F, Fut>(
        &mut self,
        schedule: &JobSchedule,
        job_name: &'static str,
        job_fn: F,
    ) -> Result<(), AppError>
    where
        F: Fn(JobContext) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<JobResult, AppError>> + Send + 'static,
    {
        let context = self.context.clone();
        let job_fn = Arc::new(job_fn);

        let job = Job::new_async_tz(schedule.cron.as_str(), schedule.timezone, move |_uuid, _l| {
            let context = context.clone();
            let job_fn = job_fn.clone();
            Box::pin(async move {
                execute_job_with_tracking(job_name, context, job_fn).await;
            })
        })
        .map_err(|e| AppError::Internal(format!("Failed to create job {}: {}", job_name, e)))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to add job {}: {}", job_name, e)))?;

        info!(
            "📅 Scheduled: {} [cron: {}, timezone: {}]",
            job_name,
            schedule.cron,
            schedule.timezone.name()
        );
        Ok(())
    }
}

/// Run a job, logging its outcome and duration. Failures never propagate.
pub async fn execute_job_with_tracking<F, Fut>(
    job_name: &str,
    context: JobContext,
    job_fn: Arc<F>,
) -> Option<JobResult>
where
    F: Fn(JobContext) -> Fut,
    Fut: std::future::Future<Output = Result<JobResult, AppError>>,
{
    info!("🏃 Starting job: {}", job_name);
    let started_at = Utc::now();

    let result = job_fn(context).await;
    let duration_ms = (Utc::now() - started_at).num_milliseconds();

    match result {
        Ok(job_result) => {
            info!(
                "✅ Job completed: {} (processed: {}, failed: {}, duration: {}ms)",
                job_name, job_result.items_processed, job_result.items_failed, duration_ms
            );
            Some(job_result)
        }
        Err(e) => {
            error!("❌ Job failed: {} - {} (duration: {}ms)", job_name, e, duration_ms);
            None
        }
    }
}

//! Background jobs run by the job scheduler service.

pub mod cache_cleanup_job;
pub mod daily_price_job;

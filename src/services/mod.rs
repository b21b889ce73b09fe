pub mod history_service;
pub mod job_scheduler_service;
pub mod price_service;
pub mod response_cache;
pub mod single_flight;

use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;

use crate::external::binance;
use crate::services::history_service::REQUIRED_HISTORY_DAYS;
use crate::services::response_cache::DEFAULT_TTL;

pub const DEFAULT_CORS_ORIGINS: [&str; 3] = [
    "http://localhost:8080",
    "http://frontend:3000",
    "http://backend:5000",
];

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    /// Base URL the companion frontend uses to reach this API.
    pub public_api_base_url: String,
    pub cors_allowed_origins: Vec<String>,
    pub binance_base_url: String,
    pub symbol: String,
    pub http_timeout: Duration,
    pub cache_ttl: Duration,
    pub required_history_days: u32,
    /// Six-field cron expression (sec min hour day month weekday).
    pub daily_fetch_cron: String,
    pub daily_fetch_timezone: Tz,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl AppConfig {
    pub fn from_env() -> Self {
        let public_api_base_url = std::env::var("NUXT_PUBLIC_API_BASE_URL")
            .or_else(|_| std::env::var("PUBLIC_API_BASE_URL"))
            .unwrap_or_else(|_| "http://localhost:5000".to_string());

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .map(|raw| parse_origins(&raw))
            .unwrap_or_else(|_| DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect());

        Self {
            port: env_parse("PORT", 5000),
            database_url: env_or("DATABASE_URL", ""),
            database_max_connections: env_parse("DATABASE_MAX_CONNECTIONS", 10),
            public_api_base_url,
            cors_allowed_origins,
            binance_base_url: env_or("BINANCE_API_URL", binance::DEFAULT_BASE_URL),
            symbol: env_or("PRICE_SYMBOL", binance::DEFAULT_SYMBOL),
            http_timeout: Duration::from_secs(env_parse("HTTP_TIMEOUT_SECS", 30)),
            cache_ttl: Duration::from_secs(env_parse("CACHE_TTL_SECS", DEFAULT_TTL.as_secs())),
            required_history_days: env_parse("REQUIRED_HISTORY_DAYS", REQUIRED_HISTORY_DAYS),
            daily_fetch_cron: env_or("DAILY_FETCH_CRON", "0 0 10 * * *"),
            daily_fetch_timezone: env_parse("DAILY_FETCH_TIMEZONE", chrono_tz::Europe::Moscow),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.database_url.is_empty() {
            return Err("DATABASE_URL is not set".to_string());
        }
        if self.cors_allowed_origins.is_empty() {
            return Err("CORS_ALLOWED_ORIGINS must name at least one origin".to_string());
        }
        if self.daily_fetch_cron.split_whitespace().count() != 6 {
            return Err(format!(
                "DAILY_FETCH_CRON must have six fields, got {:?}",
                self.daily_fetch_cron
            ));
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            database_url: String::new(),
            database_max_connections: 10,
            public_api_base_url: "http://localhost:5000".to_string(),
            cors_allowed_origins: DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
            binance_base_url: binance::DEFAULT_BASE_URL.to_string(),
            symbol: binance::DEFAULT_SYMBOL.to_string(),
            http_timeout: Duration::from_secs(30),
            cache_ttl: DEFAULT_TTL,
            required_history_days: REQUIRED_HISTORY_DAYS,
            daily_fetch_cron: "0 0 10 * * *".to_string(),
            daily_fetch_timezone: chrono_tz::Europe::Moscow,
        }
    }
}

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

use btc_price_backend::app;
use btc_price_backend::config::AppConfig;
use btc_price_backend::external::binance::BinanceProvider;
use btc_price_backend::logging::{init_logging, LoggingConfig};
use btc_price_backend::services::history_service;
use btc_price_backend::services::job_scheduler_service::{
    JobContext, JobSchedule, JobSchedulerService,
};
use btc_price_backend::state::AppState;
use btc_price_backend::store::PgPriceStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging FIRST
    init_logging(LoggingConfig::from_env())
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    let config = AppConfig::from_env();
    config.validate().map_err(anyhow::Error::msg)?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to database")?;
    tracing::info!("Database connected");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to run database migrations")?;

    let store = Arc::new(PgPriceStore::new(pool));
    let provider = Arc::new(
        BinanceProvider::new(&config.binance_base_url, &config.symbol, config.http_timeout)
            .context("failed to build exchange client")?,
    );
    tracing::info!("📊 Using price provider: Binance {} at {}", provider.symbol(), config.binance_base_url);

    if let Err(e) = history_service::ensure_minimum_history(
        store.as_ref(),
        provider.as_ref(),
        config.required_history_days,
    )
    .await
    {
        tracing::error!("Startup backfill failed: {}", e);
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Frontend API base URL: {}", config.public_api_base_url);

    let schedule = JobSchedule {
        cron: config.daily_fetch_cron.clone(),
        timezone: config.daily_fetch_timezone,
    };
    let state = AppState::new(store.clone(), provider, config);

    let mut scheduler = JobSchedulerService::new(
        JobContext {
            store: state.store.clone(),
            price_provider: state.price_provider.clone(),
            response_cache: state.response_cache.clone(),
        },
        schedule,
    )
    .await?;
    scheduler.start().await?;

    let app = app::create_app(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("🚀 BTC price backend running at http://{}/", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(e) = scheduler.stop().await {
        tracing::warn!("Scheduler did not stop cleanly: {}", e);
    }
    store.pool().close().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

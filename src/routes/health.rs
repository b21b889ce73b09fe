use axum::extract::State;
use axum::http::StatusCode;
use axum::{routing::get, Router};
use tracing::{error, info};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health))
}

async fn health(State(state): State<AppState>) -> (StatusCode, &'static str) {
    info!("GET /health - Health check");
    match state.store.count().await {
        Ok(_) => (StatusCode::OK, "OK"),
        Err(e) => {
            error!("Health check failed, storage unreachable: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "Storage unavailable")
        }
    }
}

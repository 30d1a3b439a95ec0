use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::handlers;
use crate::AppState;

/// Three sources of up to 1 MiB each plus the input spec
const MAX_REQUEST_BODY_BYTES: usize = 4 * 1024 * 1024;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/run", post(handlers::run_comparison))
        .route("/status", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(CorsLayer::permissive())
}

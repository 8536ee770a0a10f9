pub mod health;

use axum::{routing::get, Router};

use crate::review;
use crate::services;
use crate::state::AppState;

/// `max_upload_bytes` caps the multipart body of both ingest routes.
pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Backend API: ingest, generate, save, audit
        .merge(services::handlers::routes(max_upload_bytes))
        // Review sessions
        .merge(review::handlers::routes(max_upload_bytes))
        .with_state(state)
}

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service status plus the note generation provider and model.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let generator = state.backend.generator();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "review-api",
        "provider": generator.provider(),
        "model": generator.model(),
    }))
}

use std::sync::Arc;

use axum::extract::FromRef;

use crate::review::driver::ReviewDriver;
use crate::services::Backend;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<Backend>,
    pub reviews: Arc<ReviewDriver>,
}

impl FromRef<AppState> for Arc<Backend> {
    fn from_ref(state: &AppState) -> Self {
        state.backend.clone()
    }
}

impl FromRef<AppState> for Arc<ReviewDriver> {
    fn from_ref(state: &AppState) -> Self {
        state.reviews.clone()
    }
}

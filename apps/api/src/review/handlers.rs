use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, FromRef, Multipart, Path, State},
    http::StatusCode,
    routing::{get, patch, post, put},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::review::comparison::Comparison;
use crate::review::driver::ReviewDriver;
use crate::review::session::{CompareTarget, ReviewSession};
use crate::services::handlers::read_ingest_form;

#[derive(Deserialize)]
pub struct EditFieldRequest {
    pub text: String,
}

#[derive(Deserialize, Default)]
pub struct SaveSessionRequest {
    #[serde(default)]
    pub patient_id: Option<String>,
}

#[derive(Deserialize)]
pub struct CompareTargetRequest {
    pub target: CompareTarget,
}

pub fn routes<S>(max_upload_bytes: usize) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    Arc<ReviewDriver>: FromRef<S>,
{
    Router::new()
        .route("/api/v1/sessions", post(handle_create))
        .route(
            "/api/v1/sessions/:id",
            get(handle_get).delete(handle_delete),
        )
        .route(
            "/api/v1/sessions/:id/ingest",
            post(handle_ingest).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/api/v1/sessions/:id/generate", post(handle_generate))
        .route("/api/v1/sessions/:id/fields/:field", patch(handle_edit_field))
        .route("/api/v1/sessions/:id/save", post(handle_save))
        .route(
            "/api/v1/sessions/:id/compare-target",
            put(handle_set_compare_target),
        )
        .route("/api/v1/sessions/:id/diff", get(handle_diff))
}

/// POST /api/v1/sessions
pub async fn handle_create(State(driver): State<Arc<ReviewDriver>>) -> Json<ReviewSession> {
    Json(driver.create())
}

/// GET /api/v1/sessions/:id
pub async fn handle_get(
    State(driver): State<Arc<ReviewDriver>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReviewSession>, AppError> {
    Ok(Json(driver.get(id)?))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_delete(
    State(driver): State<Arc<ReviewDriver>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    driver.remove(id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/sessions/:id/ingest
pub async fn handle_ingest(
    State(driver): State<Arc<ReviewDriver>>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<ReviewSession>, AppError> {
    let request = read_ingest_form(multipart).await?;
    Ok(Json(driver.ingest(id, request).await?))
}

/// POST /api/v1/sessions/:id/generate
pub async fn handle_generate(
    State(driver): State<Arc<ReviewDriver>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReviewSession>, AppError> {
    Ok(Json(driver.generate(id).await?))
}

/// PATCH /api/v1/sessions/:id/fields/:field
pub async fn handle_edit_field(
    State(driver): State<Arc<ReviewDriver>>,
    Path((id, field)): Path<(Uuid, String)>,
    Json(req): Json<EditFieldRequest>,
) -> Result<Json<ReviewSession>, AppError> {
    Ok(Json(driver.edit_field(id, &field, req.text)?))
}

/// POST /api/v1/sessions/:id/save
///
/// The body is optional: a request without a JSON content type saves under
/// the configured default patient. A JSON body that does not parse is rejected.
pub async fn handle_save(
    State(driver): State<Arc<ReviewDriver>>,
    Path(id): Path<Uuid>,
    req: Result<Json<SaveSessionRequest>, JsonRejection>,
) -> Result<Json<ReviewSession>, AppError> {
    let req = match req {
        Ok(Json(req)) => req,
        Err(JsonRejection::MissingJsonContentType(_)) => SaveSessionRequest::default(),
        Err(rejection) => return Err(AppError::Validation(rejection.body_text())),
    };
    Ok(Json(driver.save(id, req.patient_id).await?))
}

/// PUT /api/v1/sessions/:id/compare-target
pub async fn handle_set_compare_target(
    State(driver): State<Arc<ReviewDriver>>,
    Path(id): Path<Uuid>,
    Json(req): Json<CompareTargetRequest>,
) -> Result<Json<ReviewSession>, AppError> {
    Ok(Json(driver.set_compare_target(id, req.target)?))
}

/// GET /api/v1/sessions/:id/diff
pub async fn handle_diff(
    State(driver): State<Arc<ReviewDriver>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Comparison>, AppError> {
    Ok(Json(driver.comparison(id)?))
}

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::exam::Exam;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::exam_service::{ExamFilter, ExamService, ExamUpdate, NewExam, EXAM_STAFF};
use crate::state::AppState;
use crate::types::Paginated;

/// GET /api/exams
pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(filter): Query<ExamFilter>,
) -> ApiResult<Paginated<Exam>> {
    Ok(ApiResponse::success(ExamService::new(&state).list(&auth, &filter).await?))
}

/// GET /api/exams/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Exam> {
    Ok(ApiResponse::success(ExamService::new(&state).get(id).await?))
}

/// POST /api/exams
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(input): Json<NewExam>,
) -> ApiResult<Exam> {
    auth.authorize(EXAM_STAFF)?;
    let exam = ExamService::new(&state).create(&auth, input).await?;
    Ok(ApiResponse::created("Exam scheduled", exam))
}

/// PUT /api/exams/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(update): Json<ExamUpdate>,
) -> ApiResult<Exam> {
    auth.authorize(EXAM_STAFF)?;
    let exam = ExamService::new(&state).update(id, &update).await?;
    Ok(ApiResponse::message("Exam updated", exam))
}

/// DELETE /api/exams/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    auth.authorize(EXAM_STAFF)?;
    ExamService::new(&state).delete(id).await?;
    Ok(ApiResponse::message("Exam deleted", json!({ "id": id })))
}

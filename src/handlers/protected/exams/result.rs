use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::database::models::exam::ExamResult;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::exam_service::{ExamService, ResultEntry, Transcript, EXAM_STAFF};
use crate::state::AppState;

/// POST /api/exams/:id/results - bulk upsert of marks
pub async fn publish(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(entries): Json<Vec<ResultEntry>>,
) -> ApiResult<Vec<ExamResult>> {
    auth.authorize(EXAM_STAFF)?;
    let results = ExamService::new(&state).publish_results(id, &entries).await?;
    Ok(ApiResponse::message(format!("Published {} results", results.len()), results))
}

/// GET /api/exams/:id/results
pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<ExamResult>> {
    auth.authorize(EXAM_STAFF)?;
    Ok(ApiResponse::success(ExamService::new(&state).results(id).await?))
}

/// GET /api/exams/results/me - transcript with GPA
pub async fn mine(State(state): State<AppState>, Extension(auth): Extension<AuthUser>) -> ApiResult<Transcript> {
    Ok(ApiResponse::success(ExamService::new(&state).transcript(auth.id).await?))
}

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::database::models::hostel::Complaint;
use crate::database::models::user::Role;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::hostel_service::{
    ComplaintFilter, ComplaintStatusUpdate, HostelService, NewComplaint, HOSTEL_STAFF,
};
use crate::state::AppState;
use crate::types::Paginated;

/// POST /api/hostel/complaints (student)
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(input): Json<NewComplaint>,
) -> ApiResult<Complaint> {
    auth.authorize(&[Role::Student])?;
    let complaint = HostelService::new(&state).file_complaint(&auth, input).await?;
    Ok(ApiResponse::created("Complaint filed", complaint))
}

/// GET /api/hostel/complaints
pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(filter): Query<ComplaintFilter>,
) -> ApiResult<Paginated<Complaint>> {
    Ok(ApiResponse::success(HostelService::new(&state).list_complaints(&auth, &filter).await?))
}

/// PUT /api/hostel/complaints/:id/status
pub async fn status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<ComplaintStatusUpdate>,
) -> ApiResult<Complaint> {
    auth.authorize(HOSTEL_STAFF)?;
    let complaint = HostelService::new(&state).update_complaint_status(id, body.status).await?;
    Ok(ApiResponse::message("Complaint updated", complaint))
}

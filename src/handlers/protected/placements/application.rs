use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::database::models::placement::{Application, ApplicationDetail};
use crate::database::models::user::Role;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::placement_service::{ApplicationStatusUpdate, PlacementService};
use crate::state::AppState;

/// POST /api/placements/drives/:id/apply (student)
pub async fn apply(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Application> {
    auth.authorize(&[Role::Student])?;
    let application = PlacementService::new(&state).apply(&auth, id).await?;
    Ok(ApiResponse::created("Application submitted", application))
}

/// GET /api/placements/applications/me
pub async fn mine(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Vec<ApplicationDetail>> {
    Ok(ApiResponse::success(PlacementService::new(&state).my_applications(auth.id).await?))
}

/// GET /api/placements/drives/:id/applications (admin)
pub async fn for_drive(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<ApplicationDetail>> {
    auth.authorize(&[Role::Admin])?;
    Ok(ApiResponse::success(PlacementService::new(&state).drive_applications(id).await?))
}

/// PUT /api/placements/applications/:id/status (admin)
pub async fn status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<ApplicationStatusUpdate>,
) -> ApiResult<ApplicationDetail> {
    auth.authorize(&[Role::Admin])?;
    let detail = PlacementService::new(&state)
        .update_application_status(id, body.status)
        .await?;
    Ok(ApiResponse::message("Application updated", detail))
}

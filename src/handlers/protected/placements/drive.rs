use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::placement::Drive;
use crate::database::models::user::Role;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::placement_service::{DriveFilter, DriveUpdate, NewDrive, PlacementService};
use crate::state::AppState;
use crate::types::Paginated;

/// GET /api/placements/drives
pub async fn list(State(state): State<AppState>, Query(filter): Query<DriveFilter>) -> ApiResult<Paginated<Drive>> {
    Ok(ApiResponse::success(PlacementService::new(&state).list_drives(&filter).await?))
}

/// GET /api/placements/drives/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Drive> {
    Ok(ApiResponse::success(PlacementService::new(&state).get_drive(id).await?))
}

/// POST /api/placements/drives (admin)
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(input): Json<NewDrive>,
) -> ApiResult<Drive> {
    auth.authorize(&[Role::Admin])?;
    let drive = PlacementService::new(&state).create_drive(input).await?;
    Ok(ApiResponse::created("Placement drive created", drive))
}

/// PUT /api/placements/drives/:id (admin)
pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(update): Json<DriveUpdate>,
) -> ApiResult<Drive> {
    auth.authorize(&[Role::Admin])?;
    let drive = PlacementService::new(&state).update_drive(id, &update).await?;
    Ok(ApiResponse::message("Placement drive updated", drive))
}

/// DELETE /api/placements/drives/:id (admin)
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    auth.authorize(&[Role::Admin])?;
    PlacementService::new(&state).delete_drive(id).await?;
    Ok(ApiResponse::message("Placement drive deleted", json!({ "id": id })))
}

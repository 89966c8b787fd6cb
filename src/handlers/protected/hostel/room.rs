use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::database::models::hostel::Room;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::hostel_service::{HostelService, NewRoom, RoomFilter, RoomUpdate, HOSTEL_STAFF};
use crate::state::AppState;
use crate::types::Paginated;

/// GET /api/hostel/rooms
pub async fn list(State(state): State<AppState>, Query(filter): Query<RoomFilter>) -> ApiResult<Paginated<Room>> {
    Ok(ApiResponse::success(HostelService::new(&state).list_rooms(&filter).await?))
}

/// GET /api/hostel/rooms/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Room> {
    Ok(ApiResponse::success(HostelService::new(&state).get_room(id).await?))
}

/// POST /api/hostel/rooms
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(input): Json<NewRoom>,
) -> ApiResult<Room> {
    auth.authorize(HOSTEL_STAFF)?;
    let room = HostelService::new(&state).create_room(input).await?;
    Ok(ApiResponse::created("Room created", room))
}

/// PUT /api/hostel/rooms/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(update): Json<RoomUpdate>,
) -> ApiResult<Room> {
    auth.authorize(HOSTEL_STAFF)?;
    let room = HostelService::new(&state).update_room(id, &update).await?;
    Ok(ApiResponse::message("Room updated", room))
}

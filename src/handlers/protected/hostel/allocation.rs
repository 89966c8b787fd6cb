use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::models::hostel::{Allocation, AllocationDetail};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::hostel_service::{AllocationRequest, HostelService, HOSTEL_STAFF};
use crate::state::AppState;
use crate::types::{Page, Paginated};

#[derive(Debug, Default, Deserialize)]
pub struct AllocationQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// GET /api/hostel/allocations - active allocations (warden/admin)
pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<AllocationQuery>,
) -> ApiResult<Paginated<Allocation>> {
    auth.authorize(HOSTEL_STAFF)?;
    let page = Page::new(query.page, query.limit, &state.config.api);
    Ok(ApiResponse::success(HostelService::new(&state).list_allocations(page).await?))
}

/// POST /api/hostel/allocations
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(request): Json<AllocationRequest>,
) -> ApiResult<AllocationDetail> {
    auth.authorize(HOSTEL_STAFF)?;
    let detail = HostelService::new(&state).allocate(&request).await?;
    Ok(ApiResponse::created("Room allocated", detail))
}

/// POST /api/hostel/allocations/:id/vacate
pub async fn vacate(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Allocation> {
    auth.authorize(HOSTEL_STAFF)?;
    let allocation = HostelService::new(&state).vacate(id).await?;
    Ok(ApiResponse::message("Room vacated", allocation))
}

/// GET /api/hostel/allocations/me - `data` is null without an active allocation
pub async fn mine(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Option<AllocationDetail>> {
    let detail = HostelService::new(&state).active_allocation(auth.id).await?;
    let message = if detail.is_some() { "OK" } else { "No active allocation" };
    Ok(ApiResponse::message(message, detail))
}

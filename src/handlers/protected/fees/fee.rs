use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::fee::{Fee, FeeSummary};
use crate::database::models::user::Role;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::fee_service::{BulkFee, FeeFilter, FeeService, FeeUpdate, NewFee};
use crate::state::AppState;
use crate::types::Paginated;

/// GET /api/fees
pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(filter): Query<FeeFilter>,
) -> ApiResult<Paginated<Fee>> {
    Ok(ApiResponse::success(FeeService::new(&state).list(&auth, &filter).await?))
}

/// GET /api/fees/summary - totals for the caller
pub async fn summary(State(state): State<AppState>, Extension(auth): Extension<AuthUser>) -> ApiResult<FeeSummary> {
    Ok(ApiResponse::success(FeeService::new(&state).summary(auth.id).await?))
}

/// GET /api/fees/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Fee> {
    Ok(ApiResponse::success(FeeService::new(&state).get(&auth, id).await?))
}

/// POST /api/fees (admin)
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(input): Json<NewFee>,
) -> ApiResult<Fee> {
    auth.authorize(&[Role::Admin])?;
    let fee = FeeService::new(&state).create(input).await?;
    Ok(ApiResponse::created("Fee assigned", fee))
}

/// POST /api/fees/bulk (admin)
pub async fn bulk(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(input): Json<BulkFee>,
) -> ApiResult<Value> {
    auth.authorize(&[Role::Admin])?;
    let created = FeeService::new(&state).assign_bulk(input).await?;
    Ok(ApiResponse::created(format!("Fee assigned to {} students", created), json!({ "created": created })))
}

/// PUT /api/fees/:id (admin)
pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(update): Json<FeeUpdate>,
) -> ApiResult<Fee> {
    auth.authorize(&[Role::Admin])?;
    let fee = FeeService::new(&state).update(id, &update).await?;
    Ok(ApiResponse::message("Fee updated", fee))
}

/// DELETE /api/fees/:id (admin)
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    auth.authorize(&[Role::Admin])?;
    FeeService::new(&state).delete(id).await?;
    Ok(ApiResponse::message("Fee deleted", json!({ "id": id })))
}

use axum::{extract::State, Extension};

use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::dashboard_service::{dashboard_for, Dashboard};
use crate::state::AppState;

/// GET /api/dashboard - student or staff view depending on role
pub async fn get(State(state): State<AppState>, Extension(auth): Extension<AuthUser>) -> ApiResult<Dashboard> {
    Ok(ApiResponse::success(dashboard_for(&state, &auth).await?))
}

// handlers/protected/gamification.rs - points, levels and the leaderboard

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::gamification::LeaderboardEntry;
use crate::database::models::user::Role;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::gamification_service::{GamificationProfile, GamificationService};
use crate::state::AppState;

const DEFAULT_LEADERBOARD: i64 = 10;
const MAX_LEADERBOARD: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct AwardRequest {
    pub user_id: Uuid,
    pub points: i32,
    pub reason: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<i64>,
}

/// POST /api/gamification/award (faculty/admin)
pub async fn award(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<AwardRequest>,
) -> ApiResult<Value> {
    auth.authorize(&[Role::Faculty, Role::Admin])?;
    let total = GamificationService::new(state.pool())
        .award(body.user_id, body.points, &body.reason)
        .await?;
    tracing::info!("{} awarded {} points to {}", auth.email, body.points, body.user_id);
    Ok(ApiResponse::message(
        "Points awarded",
        json!({ "user_id": body.user_id, "points": body.points, "total": total }),
    ))
}

/// GET /api/gamification/profile
pub async fn profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<GamificationProfile> {
    Ok(ApiResponse::success(GamificationService::new(state.pool()).profile(auth.id).await?))
}

/// GET /api/gamification/leaderboard?limit=
pub async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> ApiResult<Vec<LeaderboardEntry>> {
    let limit = query.limit.unwrap_or(DEFAULT_LEADERBOARD).clamp(1, MAX_LEADERBOARD);
    Ok(ApiResponse::success(GamificationService::new(state.pool()).leaderboard(limit).await?))
}

// handlers/public/auth/refresh.rs - POST /auth/refresh handler

use axum::{extract::State, Json};
use serde::Deserialize;

use super::AuthPayload;
use crate::auth::{verify_token, TokenKind, TokenPair};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::user_service::UserService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Trade a refresh token for a fresh pair; access tokens are refused here
pub async fn refresh_post(State(state): State<AppState>, Json(body): Json<RefreshRequest>) -> ApiResult<AuthPayload> {
    let claims = verify_token(&body.refresh_token, TokenKind::Refresh, &state.config.security)?;

    let user = UserService::new(&state)
        .find_by_id(claims.sub)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| ApiError::unauthorized("Account is no longer active"))?;

    let tokens = TokenPair::issue(&user, &state.config.security)?;
    Ok(ApiResponse::message("Token refreshed", AuthPayload { user, tokens }))
}

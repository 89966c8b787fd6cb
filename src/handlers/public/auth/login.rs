// handlers/public/auth/login.rs - POST /auth/login handler

use axum::{extract::State, Json};
use serde::Deserialize;

use super::AuthPayload;
use crate::auth::TokenPair;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::user_service::UserService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Unknown email and wrong password share one 401 so accounts cannot be enumerated
pub async fn login_post(State(state): State<AppState>, Json(body): Json<LoginRequest>) -> ApiResult<AuthPayload> {
    let users = UserService::new(&state);
    let mut user = users.authenticate(&body.email, &body.password).await?;
    users.touch_login(user.id).await?;
    user.last_login_at = Some(chrono::Utc::now());

    let tokens = TokenPair::issue(&user, &state.config.security)?;
    tracing::info!("User {} logged in", user.email);

    Ok(ApiResponse::message("Login successful", AuthPayload { user, tokens }))
}

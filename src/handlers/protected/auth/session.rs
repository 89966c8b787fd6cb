use axum::{extract::State, Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::models::user::User;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::user_service::UserService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

/// GET /api/auth/me
pub async fn me(State(state): State<AppState>, Extension(auth): Extension<AuthUser>) -> ApiResult<User> {
    let user = UserService::new(&state).get(auth.id).await?;
    Ok(ApiResponse::success(user))
}

/// PUT /api/auth/password
pub async fn password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<PasswordChange>,
) -> ApiResult<Value> {
    UserService::new(&state)
        .change_password(auth.id, &body.current_password, &body.new_password)
        .await?;
    tracing::info!("User {} changed their password", auth.email);
    Ok(ApiResponse::message("Password updated", Value::Null))
}

/// POST /api/auth/logout - tokens are stateless, so the client just drops them
pub async fn logout(Extension(auth): Extension<AuthUser>) -> ApiResult<Value> {
    tracing::debug!("User {} logged out", auth.email);
    Ok(ApiResponse::message("Logged out", json!({ "user_id": auth.id })))
}

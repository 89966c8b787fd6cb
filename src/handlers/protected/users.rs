// handlers/protected/users.rs - /api/users account administration

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::database::models::user::{Role, User};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::user_service::{NewUser, UserFilter, UserService, UserUpdate};
use crate::state::AppState;
use crate::types::Paginated;

/// GET /api/users (admin)
pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(filter): Query<UserFilter>,
) -> ApiResult<Paginated<User>> {
    auth.authorize(&[Role::Admin])?;
    Ok(ApiResponse::success(UserService::new(&state).list(&filter).await?))
}

/// POST /api/users (admin) - any role, student when omitted
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(input): Json<NewUser>,
) -> ApiResult<User> {
    auth.authorize(&[Role::Admin])?;
    let role = input.role.unwrap_or(Role::Student);
    let user = UserService::new(&state).create(input, role).await?;
    tracing::info!("Admin {} created {} account {}", auth.email, user.role, user.email);
    Ok(ApiResponse::created("User created", user))
}

/// GET /api/users/:id (admin or self)
pub async fn get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<User> {
    auth.authorize_owner_or(id, &[Role::Admin])?;
    Ok(ApiResponse::success(UserService::new(&state).get(id).await?))
}

/// PUT /api/users/:id - admins edit anything, users only their own profile fields
pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(update): Json<UserUpdate>,
) -> ApiResult<User> {
    check_update(&auth, id, &update)?;
    let user = UserService::new(&state).update(id, &update).await?;
    Ok(ApiResponse::message("User updated", user))
}

/// DELETE /api/users/:id (admin) - soft deactivation
pub async fn deactivate(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<User> {
    auth.authorize(&[Role::Admin])?;
    if id == auth.id {
        return Err(ApiError::bad_request("You cannot deactivate your own account"));
    }
    let user = UserService::new(&state).deactivate(id).await?;
    Ok(ApiResponse::message("User deactivated", user))
}

fn check_update(auth: &AuthUser, id: Uuid, update: &UserUpdate) -> Result<(), ApiError> {
    if !auth.is(Role::Admin) {
        auth.authorize_owner_or(id, &[Role::Admin])?;
        if update.touches_privileged_fields() {
            return Err(ApiError::forbidden("Only administrators can change role, status, CGPA or student id"));
        }
        return Ok(());
    }

    let demotes_self = update.role.is_some_and(|role| role != Role::Admin);
    if id == auth.id && (demotes_self || update.is_active == Some(false)) {
        return Err(ApiError::bad_request("You cannot deactivate or demote your own account"));
    }
    Ok(())
}

// handlers/public/auth/register.rs - POST /auth/register handler

use axum::{extract::State, Json};
use serde::Deserialize;

use super::AuthPayload;
use crate::auth::TokenPair;
use crate::database::models::user::Role;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::user_service::{NewUser, UserService};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub student_id: Option<String>,
    pub department: Option<String>,
    pub semester: Option<i32>,
    pub phone: Option<String>,
}

/// Self-registration always yields a student account
pub async fn register_post(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> ApiResult<AuthPayload> {
    let input = NewUser {
        name: body.name,
        email: body.email,
        password: body.password,
        role: None,
        student_id: body.student_id,
        department: body.department,
        semester: body.semester,
        phone: body.phone,
        cgpa: None,
    };

    let user = UserService::new(&state).create(input, Role::Student).await?;
    let tokens = TokenPair::issue(&user, &state.config.security)?;

    Ok(ApiResponse::created("Registration successful", AuthPayload { user, tokens }))
}

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::{verify_token, TokenKind};
use crate::database::models::user::{Role, User};
use crate::error::ApiError;
use crate::services::user_service::UserService;
use crate::state::AppState;

/// Authenticated user context, loaded fresh from the users table on every request
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub department: Option<String>,
    pub semester: Option<i32>,
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            department: user.department.clone(),
            semester: user.semester,
        }
    }
}

impl AuthUser {
    /// 403 unless the caller holds one of `roles`
    pub fn authorize(&self, roles: &[Role]) -> Result<(), ApiError> {
        if roles.contains(&self.role) {
            return Ok(());
        }
        tracing::warn!(
            "Role check failed: user {} ({}) is '{}', needs one of {:?}",
            self.email, self.id, self.role, roles
        );
        Err(ApiError::forbidden(format!(
            "Role '{}' is not allowed to perform this action",
            self.role
        )))
    }

    /// 403 unless the caller is `owner` or holds one of `roles`
    pub fn authorize_owner_or(&self, owner: Uuid, roles: &[Role]) -> Result<(), ApiError> {
        if self.id == owner {
            return Ok(());
        }
        self.authorize(roles)
    }

    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }

    pub fn is(&self, role: Role) -> bool {
        self.role == role
    }
}

/// JWT authentication middleware that validates tokens and attaches the user
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_jwt_from_headers(&headers).map_err(ApiError::unauthorized)?;

    let claims = verify_token(&token, TokenKind::Access, &state.config.security).map_err(|e| {
        tracing::warn!("Rejected access token: {}", e);
        ApiError::from(e)
    })?;

    let user = UserService::new(&state)
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| {
            tracing::warn!("Token subject {} no longer exists", claims.sub);
            ApiError::unauthorized("User no longer exists")
        })?;

    if !user.is_active {
        tracing::warn!("Inactive user {} attempted access", user.email);
        return Err(ApiError::unauthorized("Account is inactive"));
    }

    request.extensions_mut().insert(AuthUser::from(&user));

    Ok(next.run(request).await)
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        let token = token.trim();
        if token.is_empty() {
            return Err("Empty JWT token".to_string());
        }
        Ok(token.to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, StatusCode};

    fn auth_user(role: Role) -> AuthUser {
        AuthUser::from(&User::fixture("grace@example.edu", role))
    }

    #[test]
    fn authorize_allows_listed_roles() {
        let librarian = auth_user(Role::Librarian);
        assert!(librarian.authorize(&[Role::Librarian, Role::Admin]).is_ok());
        let err = librarian.authorize(&[Role::Admin]).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn owner_passes_without_role() {
        let student = auth_user(Role::Student);
        assert!(student.authorize_owner_or(student.id, &[Role::Admin]).is_ok());
        assert!(student.authorize_owner_or(Uuid::new_v4(), &[Role::Admin]).is_err());
    }

    #[test]
    fn bearer_extraction() {
        let mut headers = HeaderMap::new();
        assert!(extract_jwt_from_headers(&headers).is_err());

        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert!(extract_jwt_from_headers(&headers).is_err());

        headers.insert("authorization", HeaderValue::from_static("Bearer   "));
        assert_eq!(extract_jwt_from_headers(&headers).unwrap_err(), "Empty JWT token");

        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(extract_jwt_from_headers(&headers).unwrap(), "abc.def.ghi");
    }
}

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::auth::{hash_password, validate_password_strength, verify_password};
use crate::config::AppConfig;
use crate::database::models::user::{Role, User, USER_COLUMNS};
use crate::error::ApiError;
use crate::state::AppState;
use crate::types::{Page, Paginated};

/// Input for creating an account, from self-registration or an admin
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
    pub student_id: Option<String>,
    pub department: Option<String>,
    pub semester: Option<i32>,
    pub phone: Option<String>,
    pub cgpa: Option<Decimal>,
}

/// Partial update; `None` leaves the column unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub semester: Option<i32>,
    pub cgpa: Option<Decimal>,
    pub student_id: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

impl UserUpdate {
    /// Fields a user may not change on their own profile
    pub fn touches_privileged_fields(&self) -> bool {
        self.role.is_some() || self.is_active.is_some() || self.cgpa.is_some() || self.student_id.is_some()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub department: Option<String>,
    pub search: Option<String>,
    pub is_active: Option<bool>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

pub struct UserService<'a> {
    pool: &'a PgPool,
    config: &'a AppConfig,
}

impl<'a> UserService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self {
            pool: state.pool(),
            config: &state.config,
        }
    }

    pub fn from_parts(pool: &'a PgPool, config: &'a AppConfig) -> Self {
        Self { pool, config }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, ApiError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(user)
    }

    pub async fn get(&self, id: Uuid) -> Result<User, ApiError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(normalize_email(email))
            .fetch_optional(self.pool)
            .await?;
        Ok(user)
    }

    pub async fn create(&self, input: NewUser, role: Role) -> Result<User, ApiError> {
        let mut field_errors = HashMap::new();
        if let Err(e) = validate_name(&input.name) {
            field_errors.insert("name".to_string(), e);
        }
        if let Err(e) = validate_email_format(&input.email) {
            field_errors.insert("email".to_string(), e);
        }
        if let Err(e) = validate_password_strength(&input.password, self.config.security.password_min_length) {
            field_errors.insert("password".to_string(), e);
        }
        if let Some(semester) = input.semester {
            if let Err(e) = validate_semester(semester) {
                field_errors.insert("semester".to_string(), e);
            }
        }
        if !field_errors.is_empty() {
            return Err(ApiError::validation_error("Invalid registration details", Some(field_errors)));
        }

        let email = normalize_email(&input.email);
        if self.find_by_email(&email).await?.is_some() {
            return Err(ApiError::conflict("An account with this email already exists"));
        }

        let password_hash = hash_password(&input.password)?;

        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, name, email, password_hash, role, student_id, department, semester, phone, cgpa) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(input.name.trim())
        .bind(&email)
        .bind(&password_hash)
        .bind(role.as_str())
        .bind(input.student_id.as_deref().map(str::trim))
        .bind(input.department.as_deref().map(str::trim))
        .bind(input.semester)
        .bind(&input.phone)
        .bind(input.cgpa)
        .fetch_one(self.pool)
        .await?;

        tracing::info!("Created {} account {} ({})", user.role, user.email, user.id);
        Ok(user)
    }

    /// Look up by email and check the password; unknown email and wrong password look the same
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let invalid = || ApiError::unauthorized("Invalid email or password");

        let user = self.find_by_email(email).await?.ok_or_else(|| {
            tracing::warn!("Login attempt for unknown email");
            invalid()
        })?;

        if !verify_password(password, &user.password_hash)? {
            tracing::warn!("Failed login for {}", user.email);
            return Err(invalid());
        }

        if !user.is_active {
            return Err(ApiError::forbidden("Account is inactive"));
        }

        Ok(user)
    }

    pub async fn touch_login(&self, id: Uuid) -> Result<(), ApiError> {
        sqlx::query("UPDATE users SET last_login_at = now() WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    pub async fn change_password(&self, id: Uuid, current: &str, new_password: &str) -> Result<(), ApiError> {
        let user = self.get(id).await?;
        if !verify_password(current, &user.password_hash)? {
            return Err(ApiError::unauthorized("Current password is incorrect"));
        }
        validate_password_strength(new_password, self.config.security.password_min_length)
            .map_err(|e| ApiError::invalid_field("new_password", e))?;

        let password_hash = hash_password(new_password)?;
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(&password_hash)
            .execute(self.pool)
            .await?;

        tracing::info!("Password changed for {}", user.email);
        Ok(())
    }

    pub async fn list(&self, filter: &UserFilter) -> Result<Paginated<User>, ApiError> {
        let page = Page::new(filter.page, filter.limit, &self.config.api);
        let search = filter.search.as_deref().map(|s| format!("%{}%", s.trim()));

        const WHERE: &str = "($1::text IS NULL OR role = $1) \
             AND ($2::text IS NULL OR department = $2) \
             AND ($3::text IS NULL OR name ILIKE $3 OR email ILIKE $3) \
             AND ($4::bool IS NULL OR is_active = $4)";

        let items = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {WHERE} ORDER BY created_at DESC LIMIT $5 OFFSET $6"
        ))
        .bind(filter.role.map(|r| r.as_str()))
        .bind(&filter.department)
        .bind(&search)
        .bind(filter.is_active)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM users WHERE {WHERE}"))
            .bind(filter.role.map(|r| r.as_str()))
            .bind(&filter.department)
            .bind(&search)
            .bind(filter.is_active)
            .fetch_one(self.pool)
            .await?;

        Ok(Paginated::new(items, total, page))
    }

    pub async fn update(&self, id: Uuid, update: &UserUpdate) -> Result<User, ApiError> {
        if let Some(name) = &update.name {
            validate_name(name).map_err(|e| ApiError::invalid_field("name", e))?;
        }
        if let Some(semester) = update.semester {
            validate_semester(semester).map_err(|e| ApiError::invalid_field("semester", e))?;
        }

        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET \
                name = COALESCE($2, name), \
                phone = COALESCE($3, phone), \
                department = COALESCE($4, department), \
                semester = COALESCE($5, semester), \
                cgpa = COALESCE($6, cgpa), \
                student_id = COALESCE($7, student_id), \
                role = COALESCE($8, role), \
                is_active = COALESCE($9, is_active), \
                updated_at = now() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(update.name.as_deref().map(str::trim))
        .bind(&update.phone)
        .bind(&update.department)
        .bind(update.semester)
        .bind(update.cgpa)
        .bind(&update.student_id)
        .bind(update.role.map(|r| r.as_str()))
        .bind(update.is_active)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))
    }

    pub async fn deactivate(&self, id: Uuid) -> Result<User, ApiError> {
        let update = UserUpdate {
            is_active: Some(false),
            ..Default::default()
        };
        let user = self.update(id, &update).await?;
        tracing::info!("Deactivated account {}", user.email);
        Ok(user)
    }

    pub async fn count(&self) -> Result<i64, ApiError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE is_active")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_email_format(email: &str) -> Result<(), String> {
    let email = email.trim();
    if email.is_empty() {
        return Err("Email cannot be empty".to_string());
    }

    let mut parts = email.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => (local, domain),
        _ => return Err("Invalid email format".to_string()),
    };

    if local.is_empty() || domain.is_empty() || !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err("Invalid email format".to_string());
    }

    if email.chars().any(char::is_whitespace) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

pub fn validate_name(name: &str) -> Result<(), String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("Name cannot be empty".to_string());
    }
    if name.chars().count() > 100 {
        return Err("Name must be at most 100 characters".to_string());
    }
    Ok(())
}

pub fn validate_semester(semester: i32) -> Result<(), String> {
    if !(1..=12).contains(&semester) {
        return Err("Semester must be between 1 and 12".to_string());
    }
    Ok(())
}

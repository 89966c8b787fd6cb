// handlers/protected/notifications.rs - /api/notifications inbox and admin sends

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::notification::{NewNotification, Notification};
use crate::database::models::user::Role;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::notification_service::{Audience, NotificationService};
use crate::state::AppState;
use crate::types::{Page, Paginated};

#[derive(Debug, Default, Deserialize)]
pub struct InboxQuery {
    pub unread: Option<bool>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub user_id: Uuid,
    #[serde(flatten)]
    pub notification: NewNotification,
}

#[derive(Debug, Deserialize)]
pub struct BulkSendRequest {
    #[serde(flatten)]
    pub audience: Audience,
    #[serde(flatten)]
    pub notification: NewNotification,
}

/// GET /api/notifications
pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<InboxQuery>,
) -> ApiResult<Paginated<Notification>> {
    let page = Page::new(query.page, query.limit, &state.config.api);
    let inbox = NotificationService::new(state.pool())
        .list(auth.id, query.unread.unwrap_or(false), page)
        .await?;
    Ok(ApiResponse::success(inbox))
}

/// GET /api/notifications/unread-count
pub async fn unread_count(State(state): State<AppState>, Extension(auth): Extension<AuthUser>) -> ApiResult<Value> {
    let count = NotificationService::new(state.pool()).unread_count(auth.id).await?;
    Ok(ApiResponse::success(json!({ "count": count })))
}

/// PUT /api/notifications/:id/read
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Notification> {
    let notification = NotificationService::new(state.pool()).mark_read(auth.id, id).await?;
    Ok(ApiResponse::success(notification))
}

/// PUT /api/notifications/read-all
pub async fn mark_all_read(State(state): State<AppState>, Extension(auth): Extension<AuthUser>) -> ApiResult<Value> {
    let updated = NotificationService::new(state.pool()).mark_all_read(auth.id).await?;
    Ok(ApiResponse::message("All notifications marked as read", json!({ "updated": updated })))
}

/// DELETE /api/notifications/:id - another user's notification reads as 404
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    NotificationService::new(state.pool()).delete(auth.id, id).await?;
    Ok(ApiResponse::message("Notification deleted", json!({ "id": id })))
}

/// POST /api/notifications (admin)
pub async fn send(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<SendRequest>,
) -> ApiResult<Notification> {
    auth.authorize(&[Role::Admin])?;
    validate_content(&body.notification)?;
    let notification = NotificationService::new(state.pool())
        .send(body.user_id, &body.notification)
        .await?;
    Ok(ApiResponse::created("Notification sent", notification))
}

/// POST /api/notifications/bulk (admin)
pub async fn send_bulk(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<BulkSendRequest>,
) -> ApiResult<Value> {
    auth.authorize(&[Role::Admin])?;
    validate_content(&body.notification)?;
    let sent = NotificationService::new(state.pool())
        .send_bulk(&body.audience, &body.notification)
        .await?;
    Ok(ApiResponse::created(format!("Notification sent to {} users", sent), json!({ "sent": sent })))
}

fn validate_content(notification: &NewNotification) -> Result<(), ApiError> {
    if notification.title.trim().is_empty() {
        return Err(ApiError::invalid_field("title", "Title is required"));
    }
    if notification.message.trim().is_empty() {
        return Err(ApiError::invalid_field("message", "Message is required"));
    }
    Ok(())
}

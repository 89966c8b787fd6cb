use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::notification::{NewNotification, Notification};
use crate::database::models::user::Role;
use crate::error::ApiError;
use crate::types::{Page, Paginated};

const NOTIFICATION_COLUMNS: &str = "id, user_id, title, message, kind, link, is_read, created_at";

/// Recipient selector for bulk sends; explicit ids win over the filters
#[derive(Debug, Default, Clone, Deserialize)]
pub struct Audience {
    pub user_ids: Option<Vec<Uuid>>,
    pub role: Option<Role>,
    pub department: Option<String>,
    pub semester: Option<i32>,
}

pub struct NotificationService<'a> {
    pool: &'a PgPool,
}

impl<'a> NotificationService<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, user_id: Uuid, unread_only: bool, page: Page) -> Result<Paginated<Notification>, ApiError> {
        let items = sqlx::query_as::<_, Notification>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
             WHERE user_id = $1 AND (NOT $2 OR is_read = FALSE) \
             ORDER BY created_at DESC LIMIT $3 OFFSET $4"
        ))
        .bind(user_id)
        .bind(unread_only)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND (NOT $2 OR is_read = FALSE)",
        )
        .bind(user_id)
        .bind(unread_only)
        .fetch_one(self.pool)
        .await?;

        Ok(Paginated::new(items, total, page))
    }

    pub async fn unread_count(&self, user_id: Uuid) -> Result<i64, ApiError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = FALSE")
            .bind(user_id)
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    pub async fn mark_read(&self, user_id: Uuid, id: Uuid) -> Result<Notification, ApiError> {
        sqlx::query_as::<_, Notification>(&format!(
            "UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2 RETURNING {NOTIFICATION_COLUMNS}"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Notification not found"))
    }

    pub async fn mark_all_read(&self, user_id: Uuid) -> Result<u64, ApiError> {
        let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND is_read = FALSE")
            .bind(user_id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Only the recipient may delete; other users' ids look like missing rows
    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), ApiError> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("Notification not found"));
        }
        Ok(())
    }

    pub async fn send(&self, user_id: Uuid, notification: &NewNotification) -> Result<Notification, ApiError> {
        let sent = sqlx::query_as::<_, Notification>(&format!(
            "INSERT INTO notifications (id, user_id, title, message, kind, link) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {NOTIFICATION_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.kind.as_str())
        .bind(&notification.link)
        .fetch_one(self.pool)
        .await?;
        Ok(sent)
    }

    /// Fan out one notification to many users with a single multi-row insert
    pub async fn send_many(&self, user_ids: &[Uuid], notification: &NewNotification) -> Result<u64, ApiError> {
        if user_ids.is_empty() {
            return Ok(0);
        }

        let ids: Vec<Uuid> = user_ids.iter().map(|_| Uuid::new_v4()).collect();
        let result = sqlx::query(
            "INSERT INTO notifications (id, user_id, title, message, kind, link) \
             SELECT t.id, t.user_id, $3, $4, $5, $6 FROM UNNEST($1::uuid[], $2::uuid[]) AS t(id, user_id)",
        )
        .bind(&ids)
        .bind(user_ids)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.kind.as_str())
        .bind(&notification.link)
        .execute(self.pool)
        .await?;

        tracing::info!("Sent '{}' notification to {} users", notification.title, result.rows_affected());
        Ok(result.rows_affected())
    }

    /// Resolve a bulk audience into active user ids
    pub async fn resolve_audience(&self, audience: &Audience) -> Result<Vec<Uuid>, ApiError> {
        if let Some(user_ids) = &audience.user_ids {
            let ids = sqlx::query_scalar("SELECT id FROM users WHERE id = ANY($1) AND is_active")
                .bind(user_ids)
                .fetch_all(self.pool)
                .await?;
            return Ok(ids);
        }

        let ids = sqlx::query_scalar(
            "SELECT id FROM users WHERE is_active \
             AND ($1::text IS NULL OR role = $1) \
             AND ($2::text IS NULL OR department = $2) \
             AND ($3::int IS NULL OR semester = $3)",
        )
        .bind(audience.role.map(|r| r.as_str()))
        .bind(&audience.department)
        .bind(audience.semester)
        .fetch_all(self.pool)
        .await?;
        Ok(ids)
    }

    /// Resolve the audience and fan out in one insert
    pub async fn send_bulk(&self, audience: &Audience, notification: &NewNotification) -> Result<u64, ApiError> {
        let recipients = self.resolve_audience(audience).await?;
        self.send_many(&recipients, notification).await
    }
}

/// Notify without failing the caller; delivery problems are only logged
pub async fn notify_quietly(pool: &PgPool, user_id: Uuid, notification: NewNotification) {
    if let Err(e) = NotificationService::new(pool).send(user_id, &notification).await {
        tracing::error!("Failed to notify user {}: {}", user_id, e);
    }
}

pub async fn notify_many_quietly(pool: &PgPool, user_ids: &[Uuid], notification: NewNotification) {
    if let Err(e) = NotificationService::new(pool).send_many(user_ids, &notification).await {
        tracing::error!("Failed to notify {} users: {}", user_ids.len(), e);
    }
}

use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::database::models::gamification::{
    badges_for, level_for, points_to_next_level, Badge, LeaderboardEntry, PointEvent,
};
use crate::error::ApiError;

const RECENT_EVENTS: i64 = 10;

#[derive(Debug, Serialize)]
pub struct GamificationProfile {
    pub user_id: Uuid,
    pub points: i32,
    pub level: i32,
    pub points_to_next_level: i32,
    pub badges: Vec<Badge>,
    pub recent: Vec<PointEvent>,
}

/// Append to the ledger and bump the running total on the same connection
///
/// Callers pass a transaction so the award commits or rolls back with the
/// operation that earned it.
pub async fn award_points(
    conn: &mut PgConnection,
    user_id: Uuid,
    points: i32,
    reason: &str,
) -> Result<i32, sqlx::Error> {
    sqlx::query("INSERT INTO point_events (id, user_id, points, reason) VALUES ($1, $2, $3, $4)")
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(points)
        .bind(reason)
        .execute(&mut *conn)
        .await?;

    let total: i32 = sqlx::query_scalar(
        "UPDATE users SET points = points + $2, updated_at = now() WHERE id = $1 RETURNING points",
    )
    .bind(user_id)
    .bind(points)
    .fetch_one(&mut *conn)
    .await?;

    tracing::debug!("Awarded {} points to {} for '{}' (total {})", points, user_id, reason, total);
    Ok(total)
}

pub struct GamificationService<'a> {
    pool: &'a PgPool,
}

impl<'a> GamificationService<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Manual award by staff; negative values are deductions
    pub async fn award(&self, user_id: Uuid, points: i32, reason: &str) -> Result<i32, ApiError> {
        if points == 0 {
            return Err(ApiError::invalid_field("points", "Points must be non-zero"));
        }
        if reason.trim().is_empty() {
            return Err(ApiError::invalid_field("reason", "Reason is required"));
        }

        let mut tx = self.pool.begin().await?;
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;
        if !exists {
            return Err(ApiError::not_found("User not found"));
        }

        let total = award_points(&mut tx, user_id, points, reason.trim()).await?;
        tx.commit().await?;
        Ok(total)
    }

    pub async fn profile(&self, user_id: Uuid) -> Result<GamificationProfile, ApiError> {
        let points: i32 = sqlx::query_scalar("SELECT points FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))?;

        let recent = sqlx::query_as::<_, PointEvent>(
            "SELECT id, user_id, points, reason, created_at FROM point_events \
             WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(user_id)
        .bind(RECENT_EVENTS)
        .fetch_all(self.pool)
        .await?;

        Ok(GamificationProfile {
            user_id,
            points,
            level: level_for(points),
            points_to_next_level: points_to_next_level(points),
            badges: badges_for(points),
            recent,
        })
    }

    pub async fn leaderboard(&self, limit: i64) -> Result<Vec<LeaderboardEntry>, ApiError> {
        let entries = sqlx::query_as::<_, LeaderboardEntry>(
            "SELECT RANK() OVER (ORDER BY points DESC) AS rank, id AS user_id, name, department, points \
             FROM users WHERE role = 'student' AND is_active \
             ORDER BY points DESC, name ASC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(entries)
    }
}

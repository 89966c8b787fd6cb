use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PointEvent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub points: i32,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LeaderboardEntry {
    pub rank: i64,
    pub user_id: Uuid,
    pub name: String,
    pub department: Option<String>,
    pub points: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Badge {
    pub name: &'static str,
    pub min_points: i32,
}

pub const BADGES: &[Badge] = &[
    Badge { name: "Newcomer", min_points: 0 },
    Badge { name: "Bronze", min_points: 100 },
    Badge { name: "Silver", min_points: 500 },
    Badge { name: "Gold", min_points: 1000 },
    Badge { name: "Platinum", min_points: 2500 },
];

/// Points awarded automatically by other modules
pub mod rewards {
    pub const FEE_PAID_ON_TIME: i32 = 50;
    pub const BOOK_RETURNED_ON_TIME: i32 = 10;
    pub const PLACEMENT_APPLIED: i32 = 5;
    pub const PLACEMENT_SELECTED: i32 = 100;
}

/// Level n starts at 100 * (n - 1)^2 points
pub fn level_for(points: i32) -> i32 {
    if points <= 0 {
        return 1;
    }
    let mut level = ((points as f64 / 100.0).sqrt().floor() as i32) + 1;
    // guard against float rounding at exact thresholds
    while threshold_for(level + 1) <= i64::from(points) {
        level += 1;
    }
    while level > 1 && threshold_for(level) > i64::from(points) {
        level -= 1;
    }
    level
}

/// Points needed to reach `level`; wider than i32 because the top levels pass i32::MAX
pub fn threshold_for(level: i32) -> i64 {
    let n = i64::from((level - 1).max(0));
    100 * n * n
}

pub fn points_to_next_level(points: i32) -> i32 {
    let remaining = threshold_for(level_for(points) + 1) - i64::from(points.max(0));
    i32::try_from(remaining).unwrap_or(i32::MAX)
}

pub fn badges_for(points: i32) -> Vec<Badge> {
    BADGES.iter().copied().filter(|b| points >= b.min_points).collect()
}

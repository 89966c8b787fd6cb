use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

crate::text_enum! {
    pub enum RoomType {
        Single => "single",
        Double => "double",
        Triple => "triple",
    }
}

crate::text_enum! {
    pub enum AllocationStatus {
        Active => "active",
        Vacated => "vacated",
    }
}

crate::text_enum! {
    pub enum ComplaintCategory {
        Electrical => "electrical",
        Plumbing => "plumbing",
        Furniture => "furniture",
        Cleaning => "cleaning",
        Other => "other",
    }
}

crate::text_enum! {
    pub enum ComplaintStatus {
        Open => "open",
        InProgress => "in_progress",
        Resolved => "resolved",
    }
}

impl ComplaintStatus {
    pub fn can_transition_to(&self, next: ComplaintStatus) -> bool {
        matches!(
            (self, next),
            (ComplaintStatus::Open, ComplaintStatus::InProgress)
                | (ComplaintStatus::Open, ComplaintStatus::Resolved)
                | (ComplaintStatus::InProgress, ComplaintStatus::Resolved)
        )
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Room {
    pub id: Uuid,
    pub hostel_name: String,
    pub room_number: String,
    #[sqlx(try_from = "String")]
    pub room_type: RoomType,
    pub capacity: i32,
    pub occupied: i32,
    pub fee_per_semester: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Room {
    pub fn has_space(&self) -> bool {
        self.occupied < self.capacity
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Allocation {
    pub id: Uuid,
    pub room_id: Uuid,
    pub student_id: Uuid,
    pub allocated_at: DateTime<Utc>,
    pub vacated_at: Option<DateTime<Utc>>,
    #[sqlx(try_from = "String")]
    pub status: AllocationStatus,
}

/// Allocation together with its room
#[derive(Debug, Clone, Serialize)]
pub struct AllocationDetail {
    #[serde(flatten)]
    pub allocation: Allocation,
    pub room: Room,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Complaint {
    pub id: Uuid,
    pub student_id: Uuid,
    pub room_id: Uuid,
    #[sqlx(try_from = "String")]
    pub category: ComplaintCategory,
    pub description: String,
    #[sqlx(try_from = "String")]
    pub status: ComplaintStatus,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

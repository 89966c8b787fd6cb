use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::database::models::fee::FeeType;
use crate::database::models::hostel::{
    Allocation, AllocationDetail, AllocationStatus, Complaint, ComplaintCategory, ComplaintStatus, Room, RoomType,
};
use crate::database::models::notification::{NewNotification, NotificationKind};
use crate::database::models::user::Role;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::notification_service::notify_quietly;
use crate::state::AppState;
use crate::types::{Page, Paginated};

const ROOM_COLUMNS: &str =
    "id, hostel_name, room_number, room_type, capacity, occupied, fee_per_semester, created_at, updated_at";
const ALLOCATION_COLUMNS: &str = "id, room_id, student_id, allocated_at, vacated_at, status";
const COMPLAINT_COLUMNS: &str =
    "id, student_id, room_id, category, description, status, resolved_at, created_at, updated_at";

/// Days until a hostel fee raised at allocation falls due
const HOSTEL_FEE_DUE_DAYS: i64 = 30;

pub const HOSTEL_STAFF: &[Role] = &[Role::Warden, Role::Admin];

#[derive(Debug, Clone, Deserialize)]
pub struct NewRoom {
    pub hostel_name: String,
    pub room_number: String,
    pub room_type: RoomType,
    pub capacity: i32,
    pub fee_per_semester: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoomUpdate {
    pub room_type: Option<RoomType>,
    pub capacity: Option<i32>,
    pub fee_per_semester: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RoomFilter {
    pub hostel_name: Option<String>,
    pub available: Option<bool>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AllocationRequest {
    pub student_id: Uuid,
    pub room_id: Uuid,
    #[serde(default)]
    pub create_fee: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewComplaint {
    pub category: ComplaintCategory,
    pub description: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ComplaintFilter {
    pub status: Option<ComplaintStatus>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComplaintStatusUpdate {
    pub status: ComplaintStatus,
}

pub struct HostelService<'a> {
    pool: &'a PgPool,
    config: &'a AppConfig,
}

impl<'a> HostelService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self {
            pool: state.pool(),
            config: &state.config,
        }
    }

    pub async fn list_rooms(&self, filter: &RoomFilter) -> Result<Paginated<Room>, ApiError> {
        let page = Page::new(filter.page, filter.limit, &self.config.api);
        let available = filter.available.unwrap_or(false);

        const WHERE: &str = "($1::text IS NULL OR hostel_name = $1) AND (NOT $2 OR occupied < capacity)";

        let items = sqlx::query_as::<_, Room>(&format!(
            "SELECT {ROOM_COLUMNS} FROM hostel_rooms WHERE {WHERE} \
             ORDER BY hostel_name, room_number LIMIT $3 OFFSET $4"
        ))
        .bind(&filter.hostel_name)
        .bind(available)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM hostel_rooms WHERE {WHERE}"))
            .bind(&filter.hostel_name)
            .bind(available)
            .fetch_one(self.pool)
            .await?;

        Ok(Paginated::new(items, total, page))
    }

    pub async fn get_room(&self, id: Uuid) -> Result<Room, ApiError> {
        sqlx::query_as::<_, Room>(&format!("SELECT {ROOM_COLUMNS} FROM hostel_rooms WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Room not found"))
    }

    pub async fn create_room(&self, input: NewRoom) -> Result<Room, ApiError> {
        if input.hostel_name.trim().is_empty() {
            return Err(ApiError::invalid_field("hostel_name", "Hostel name is required"));
        }
        if input.room_number.trim().is_empty() {
            return Err(ApiError::invalid_field("room_number", "Room number is required"));
        }
        if input.capacity < 1 {
            return Err(ApiError::invalid_field("capacity", "Capacity must be at least 1"));
        }
        if input.fee_per_semester < Decimal::ZERO {
            return Err(ApiError::invalid_field("fee_per_semester", "Fee cannot be negative"));
        }

        let room = sqlx::query_as::<_, Room>(&format!(
            "INSERT INTO hostel_rooms (id, hostel_name, room_number, room_type, capacity, fee_per_semester) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {ROOM_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(input.hostel_name.trim())
        .bind(input.room_number.trim())
        .bind(input.room_type.as_str())
        .bind(input.capacity)
        .bind(input.fee_per_semester)
        .fetch_one(self.pool)
        .await?;
        Ok(room)
    }

    pub async fn update_room(&self, id: Uuid, update: &RoomUpdate) -> Result<Room, ApiError> {
        let mut tx = self.pool.begin().await?;
        let room = sqlx::query_as::<_, Room>(&format!("SELECT {ROOM_COLUMNS} FROM hostel_rooms WHERE id = $1 FOR UPDATE"))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ApiError::not_found("Room not found"))?;

        if let Some(capacity) = update.capacity {
            check_capacity(&room, capacity)?;
        }
        if update.fee_per_semester.is_some_and(|f| f < Decimal::ZERO) {
            return Err(ApiError::invalid_field("fee_per_semester", "Fee cannot be negative"));
        }

        let updated = sqlx::query_as::<_, Room>(&format!(
            "UPDATE hostel_rooms SET room_type = COALESCE($2, room_type), capacity = COALESCE($3, capacity), \
             fee_per_semester = COALESCE($4, fee_per_semester), updated_at = now() \
             WHERE id = $1 RETURNING {ROOM_COLUMNS}"
        ))
        .bind(id)
        .bind(update.room_type.map(|t| t.as_str()))
        .bind(update.capacity)
        .bind(update.fee_per_semester)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    pub async fn allocate(&self, request: &AllocationRequest) -> Result<AllocationDetail, ApiError> {
        let mut tx = self.pool.begin().await?;

        let is_student: bool = sqlx::query_scalar("SELECT role = 'student' AND is_active FROM users WHERE id = $1")
            .bind(request.student_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ApiError::not_found("Student not found"))?;
        if !is_student {
            return Err(ApiError::bad_request("Rooms can only be allocated to active students"));
        }

        let has_active: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM hostel_allocations WHERE student_id = $1 AND status = 'active')",
        )
        .bind(request.student_id)
        .fetch_one(&mut *tx)
        .await?;
        if has_active {
            return Err(ApiError::conflict("Student already has an active room allocation"));
        }

        let room = sqlx::query_as::<_, Room>(&format!("SELECT {ROOM_COLUMNS} FROM hostel_rooms WHERE id = $1 FOR UPDATE"))
            .bind(request.room_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ApiError::not_found("Room not found"))?;
        if !room.has_space() {
            return Err(ApiError::conflict("Room is full"));
        }

        let allocation = sqlx::query_as::<_, Allocation>(&format!(
            "INSERT INTO hostel_allocations (id, room_id, student_id) VALUES ($1, $2, $3) RETURNING {ALLOCATION_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(room.id)
        .bind(request.student_id)
        .fetch_one(&mut *tx)
        .await?;

        let room = sqlx::query_as::<_, Room>(&format!(
            "UPDATE hostel_rooms SET occupied = occupied + 1, updated_at = now() WHERE id = $1 RETURNING {ROOM_COLUMNS}"
        ))
        .bind(room.id)
        .fetch_one(&mut *tx)
        .await?;

        if request.create_fee && room.fee_per_semester > Decimal::ZERO {
            sqlx::query(
                "INSERT INTO fees (id, student_id, fee_type, description, amount, due_date) VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(Uuid::new_v4())
            .bind(request.student_id)
            .bind(FeeType::Hostel.as_str())
            .bind(format!("Hostel fee: {} room {}", room.hostel_name, room.room_number))
            .bind(room.fee_per_semester)
            .bind((Utc::now() + Duration::days(HOSTEL_FEE_DUE_DAYS)).date_naive())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::info!(
            "Allocated {} room {} to {} ({}/{})",
            room.hostel_name, room.room_number, request.student_id, room.occupied, room.capacity
        );

        notify_quietly(
            self.pool,
            request.student_id,
            NewNotification::new(
                NotificationKind::Hostel,
                "Room allocated",
                format!("You have been allocated room {} in {}", room.room_number, room.hostel_name),
            )
            .with_link("/hostel/allocation"),
        )
        .await;

        Ok(AllocationDetail { allocation, room })
    }

    pub async fn vacate(&self, allocation_id: Uuid) -> Result<Allocation, ApiError> {
        let mut tx = self.pool.begin().await?;

        let allocation = sqlx::query_as::<_, Allocation>(&format!(
            "SELECT {ALLOCATION_COLUMNS} FROM hostel_allocations WHERE id = $1 FOR UPDATE"
        ))
        .bind(allocation_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ApiError::not_found("Allocation not found"))?;
        if allocation.status != AllocationStatus::Active {
            return Err(ApiError::conflict("Allocation has already been vacated"));
        }

        let vacated = sqlx::query_as::<_, Allocation>(&format!(
            "UPDATE hostel_allocations SET status = 'vacated', vacated_at = now() WHERE id = $1 RETURNING {ALLOCATION_COLUMNS}"
        ))
        .bind(allocation_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE hostel_rooms SET occupied = GREATEST(occupied - 1, 0), updated_at = now() WHERE id = $1")
            .bind(allocation.room_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        notify_quietly(
            self.pool,
            vacated.student_id,
            NewNotification::new(NotificationKind::Hostel, "Room vacated", "Your hostel room allocation has ended"),
        )
        .await;

        Ok(vacated)
    }

    pub async fn active_allocation(&self, student_id: Uuid) -> Result<Option<AllocationDetail>, ApiError> {
        let allocation = sqlx::query_as::<_, Allocation>(&format!(
            "SELECT {ALLOCATION_COLUMNS} FROM hostel_allocations WHERE student_id = $1 AND status = 'active'"
        ))
        .bind(student_id)
        .fetch_optional(self.pool)
        .await?;

        match allocation {
            Some(allocation) => {
                let room = self.get_room(allocation.room_id).await?;
                Ok(Some(AllocationDetail { allocation, room }))
            }
            None => Ok(None),
        }
    }

    pub async fn list_allocations(&self, page: Page) -> Result<Paginated<Allocation>, ApiError> {
        let items = sqlx::query_as::<_, Allocation>(&format!(
            "SELECT {ALLOCATION_COLUMNS} FROM hostel_allocations WHERE status = 'active' \
             ORDER BY allocated_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM hostel_allocations WHERE status = 'active'")
            .fetch_one(self.pool)
            .await?;

        Ok(Paginated::new(items, total, page))
    }

    pub async fn file_complaint(&self, auth: &AuthUser, input: NewComplaint) -> Result<Complaint, ApiError> {
        if input.description.trim().is_empty() {
            return Err(ApiError::invalid_field("description", "Describe the problem"));
        }

        let allocation = self
            .active_allocation(auth.id)
            .await?
            .ok_or_else(|| ApiError::bad_request("You need an active room allocation to file a complaint"))?;

        let complaint = sqlx::query_as::<_, Complaint>(&format!(
            "INSERT INTO hostel_complaints (id, student_id, room_id, category, description) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {COMPLAINT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(auth.id)
        .bind(allocation.room.id)
        .bind(input.category.as_str())
        .bind(input.description.trim())
        .fetch_one(self.pool)
        .await?;

        tracing::info!("Complaint {} ({}) filed for room {}", complaint.id, complaint.category, allocation.room.room_number);
        Ok(complaint)
    }

    pub async fn list_complaints(&self, auth: &AuthUser, filter: &ComplaintFilter) -> Result<Paginated<Complaint>, ApiError> {
        let page = Page::new(filter.page, filter.limit, &self.config.api);
        let student_id = if HOSTEL_STAFF.contains(&auth.role) { None } else { Some(auth.id) };
        let status = filter.status.map(|s| s.as_str());

        let items = sqlx::query_as::<_, Complaint>(&format!(
            "SELECT {COMPLAINT_COLUMNS} FROM hostel_complaints \
             WHERE ($1::uuid IS NULL OR student_id = $1) AND ($2::text IS NULL OR status = $2) \
             ORDER BY created_at DESC LIMIT $3 OFFSET $4"
        ))
        .bind(student_id)
        .bind(status)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM hostel_complaints \
             WHERE ($1::uuid IS NULL OR student_id = $1) AND ($2::text IS NULL OR status = $2)",
        )
        .bind(student_id)
        .bind(status)
        .fetch_one(self.pool)
        .await?;

        Ok(Paginated::new(items, total, page))
    }

    pub async fn update_complaint_status(&self, id: Uuid, next: ComplaintStatus) -> Result<Complaint, ApiError> {
        let mut tx = self.pool.begin().await?;
        let complaint = sqlx::query_as::<_, Complaint>(&format!(
            "SELECT {COMPLAINT_COLUMNS} FROM hostel_complaints WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ApiError::not_found("Complaint not found"))?;

        if !complaint.status.can_transition_to(next) {
            return Err(ApiError::bad_request(format!(
                "Cannot move complaint from '{}' to '{}'",
                complaint.status, next
            )));
        }

        let updated = sqlx::query_as::<_, Complaint>(&format!(
            "UPDATE hostel_complaints SET status = $2, \
             resolved_at = CASE WHEN $2 = 'resolved' THEN now() ELSE resolved_at END, updated_at = now() \
             WHERE id = $1 RETURNING {COMPLAINT_COLUMNS}"
        ))
        .bind(id)
        .bind(next.as_str())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        notify_quietly(
            self.pool,
            updated.student_id,
            NewNotification::new(
                NotificationKind::Hostel,
                "Complaint updated",
                format!("Your {} complaint is now {}", updated.category, updated.status.as_str().replace('_', " ")),
            )
            .with_link("/hostel/complaints"),
        )
        .await;

        Ok(updated)
    }

    pub async fn count_open_complaints(&self) -> Result<i64, ApiError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM hostel_complaints WHERE status <> 'resolved'")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}

/// Capacity may shrink only down to current occupancy
pub fn check_capacity(room: &Room, capacity: i32) -> Result<(), ApiError> {
    if capacity < 1 {
        return Err(ApiError::invalid_field("capacity", "Capacity must be at least 1"));
    }
    if capacity < room.occupied {
        return Err(ApiError::invalid_field(
            "capacity",
            format!("Room currently has {} occupants", room.occupied),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(capacity: i32, occupied: i32) -> Room {
        let now = Utc::now();
        Room {
            id: Uuid::new_v4(),
            hostel_name: "North".to_string(),
            room_number: "101".to_string(),
            room_type: RoomType::Triple,
            capacity,
            occupied,
            fee_per_semester: Decimal::from(15000),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn capacity_cannot_drop_below_occupancy() {
        let r = room(3, 2);
        assert!(check_capacity(&r, 2).is_ok());
        assert!(check_capacity(&r, 4).is_ok());
        let err = check_capacity(&r, 1).unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
        assert!(check_capacity(&room(2, 0), 0).is_err());
    }

    #[test]
    fn allocation_request_fee_defaults_off() {
        let req: AllocationRequest = serde_json::from_value(serde_json::json!({
            "student_id": Uuid::nil(),
            "room_id": Uuid::nil(),
        }))
        .unwrap();
        assert!(!req.create_fee);
    }
}

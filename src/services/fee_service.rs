use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::database::models::fee::{late_fee_for, Fee, FeeStatus, FeeSummary, FeeType, Payment, PaymentStatus};
use crate::database::models::gamification::rewards;
use crate::database::models::notification::{NewNotification, NotificationKind};
use crate::database::models::user::Role;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::gamification_service::award_points;
use crate::services::notification_service::{notify_many_quietly, notify_quietly};
use crate::services::payment::{ChargeOutcome, ChargeRequest};
use crate::state::AppState;
use crate::types::{Page, Paginated};

const FEE_COLUMNS: &str = "id, student_id, fee_type, description, amount, amount_paid, late_fee, due_date, \
     status, last_reminded_at, created_at, updated_at";
const PAYMENT_COLUMNS: &str =
    "id, fee_id, student_id, amount, method, transaction_id, status, failure_reason, created_at";

#[derive(Debug, Clone, Deserialize)]
pub struct NewFee {
    pub student_id: Uuid,
    pub fee_type: FeeType,
    pub description: String,
    pub amount: Decimal,
    pub due_date: NaiveDate,
}

/// Assign the same fee to explicit students or to an active cohort
#[derive(Debug, Clone, Deserialize)]
pub struct BulkFee {
    pub student_ids: Option<Vec<Uuid>>,
    pub department: Option<String>,
    pub semester: Option<i32>,
    pub fee_type: FeeType,
    pub description: String,
    pub amount: Decimal,
    pub due_date: NaiveDate,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeeUpdate {
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub due_date: Option<NaiveDate>,
    pub late_fee: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FeeFilter {
    pub student_id: Option<Uuid>,
    pub status: Option<FeeStatus>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PayRequest {
    pub amount: Decimal,
    #[serde(default = "default_method")]
    pub method: String,
}

fn default_method() -> String {
    "card".to_string()
}

#[derive(Debug, Serialize)]
pub struct Receipt {
    pub payment: Payment,
    pub fee: Fee,
}

pub struct FeeService<'a> {
    state: &'a AppState,
    pool: &'a PgPool,
    config: &'a AppConfig,
}

impl<'a> FeeService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self {
            state,
            pool: state.pool(),
            config: &state.config,
        }
    }

    pub async fn list(&self, auth: &AuthUser, filter: &FeeFilter) -> Result<Paginated<Fee>, ApiError> {
        let page = Page::new(filter.page, filter.limit, &self.config.api);
        let student_id = fee_scope(auth, filter.student_id);
        let status = filter.status.map(|s| s.as_str());

        let items = sqlx::query_as::<_, Fee>(&format!(
            "SELECT {FEE_COLUMNS} FROM fees \
             WHERE ($1::uuid IS NULL OR student_id = $1) AND ($2::text IS NULL OR status = $2) \
             ORDER BY due_date ASC LIMIT $3 OFFSET $4"
        ))
        .bind(student_id)
        .bind(status)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM fees WHERE ($1::uuid IS NULL OR student_id = $1) AND ($2::text IS NULL OR status = $2)",
        )
        .bind(student_id)
        .bind(status)
        .fetch_one(self.pool)
        .await?;

        Ok(Paginated::new(items, total, page))
    }

    pub async fn summary(&self, student_id: Uuid) -> Result<FeeSummary, ApiError> {
        let summary = sqlx::query_as::<_, FeeSummary>(
            "SELECT \
                COALESCE(SUM(amount + late_fee), 0) AS total, \
                COALESCE(SUM(amount_paid), 0) AS paid, \
                COALESCE(SUM(GREATEST(amount + late_fee - amount_paid, 0)), 0) AS outstanding, \
                COUNT(*) FILTER (WHERE status = 'overdue') AS overdue_count \
             FROM fees WHERE student_id = $1",
        )
        .bind(student_id)
        .fetch_one(self.pool)
        .await?;
        Ok(summary)
    }

    async fn find(&self, id: Uuid) -> Result<Fee, ApiError> {
        sqlx::query_as::<_, Fee>(&format!("SELECT {FEE_COLUMNS} FROM fees WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Fee not found"))
    }

    pub async fn get(&self, auth: &AuthUser, id: Uuid) -> Result<Fee, ApiError> {
        let fee = self.find(id).await?;
        auth.authorize_owner_or(fee.student_id, &[Role::Admin])?;
        Ok(fee)
    }

    pub async fn create(&self, input: NewFee) -> Result<Fee, ApiError> {
        validate_fee_fields(&input.description, input.amount)?;
        self.ensure_student(input.student_id).await?;

        let fee = sqlx::query_as::<_, Fee>(&format!(
            "INSERT INTO fees (id, student_id, fee_type, description, amount, due_date) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {FEE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(input.student_id)
        .bind(input.fee_type.as_str())
        .bind(input.description.trim())
        .bind(input.amount)
        .bind(input.due_date)
        .fetch_one(self.pool)
        .await?;

        notify_quietly(
            self.pool,
            fee.student_id,
            NewNotification::new(
                NotificationKind::Fee,
                "New fee assigned",
                format!("{} of {} is due on {}", fee.description, fee.amount, fee.due_date),
            )
            .with_link(format!("/fees/{}", fee.id)),
        )
        .await;

        Ok(fee)
    }

    /// Returns the number of fees created
    pub async fn assign_bulk(&self, input: BulkFee) -> Result<u64, ApiError> {
        validate_fee_fields(&input.description, input.amount)?;

        let student_ids: Vec<Uuid> = match &input.student_ids {
            Some(ids) => sqlx::query_scalar("SELECT id FROM users WHERE id = ANY($1) AND role = 'student' AND is_active")
                .bind(ids)
                .fetch_all(self.pool)
                .await?,
            None => {
                if input.department.is_none() && input.semester.is_none() {
                    return Err(ApiError::bad_request(
                        "Provide student_ids or at least one of department/semester",
                    ));
                }
                sqlx::query_scalar(
                    "SELECT id FROM users WHERE role = 'student' AND is_active \
                     AND ($1::text IS NULL OR department = $1) AND ($2::int IS NULL OR semester = $2)",
                )
                .bind(&input.department)
                .bind(input.semester)
                .fetch_all(self.pool)
                .await?
            }
        };

        if student_ids.is_empty() {
            return Ok(0);
        }

        let fee_ids: Vec<Uuid> = student_ids.iter().map(|_| Uuid::new_v4()).collect();
        let result = sqlx::query(
            "INSERT INTO fees (id, student_id, fee_type, description, amount, due_date) \
             SELECT t.id, t.student_id, $3, $4, $5, $6 FROM UNNEST($1::uuid[], $2::uuid[]) AS t(id, student_id)",
        )
        .bind(&fee_ids)
        .bind(&student_ids)
        .bind(input.fee_type.as_str())
        .bind(input.description.trim())
        .bind(input.amount)
        .bind(input.due_date)
        .execute(self.pool)
        .await?;

        tracing::info!("Assigned '{}' to {} students", input.description, result.rows_affected());

        notify_many_quietly(
            self.pool,
            &student_ids,
            NewNotification::new(
                NotificationKind::Fee,
                "New fee assigned",
                format!("{} of {} is due on {}", input.description.trim(), input.amount, input.due_date),
            )
            .with_link("/fees"),
        )
        .await;

        Ok(result.rows_affected())
    }

    pub async fn update(&self, id: Uuid, update: &FeeUpdate) -> Result<Fee, ApiError> {
        let current = self.find(id).await?;

        if let Some(amount) = update.amount {
            if amount <= Decimal::ZERO {
                return Err(ApiError::invalid_field("amount", "Amount must be greater than zero"));
            }
        }
        if let Some(late_fee) = update.late_fee {
            if late_fee < Decimal::ZERO {
                return Err(ApiError::invalid_field("late_fee", "Late fee cannot be negative"));
            }
        }
        if let Some(description) = &update.description {
            if description.trim().is_empty() {
                return Err(ApiError::invalid_field("description", "Description is required"));
            }
        }

        // Recompute status against the new totals
        let mut next = current.clone();
        if let Some(amount) = update.amount {
            next.amount = amount;
        }
        if let Some(late_fee) = update.late_fee {
            next.late_fee = late_fee;
        }
        if let Some(due_date) = update.due_date {
            next.due_date = due_date;
        }
        let status = next.status_for(next.amount_paid, Utc::now().date_naive());

        let fee = sqlx::query_as::<_, Fee>(&format!(
            "UPDATE fees SET description = $2, amount = $3, late_fee = $4, due_date = $5, status = $6, updated_at = now() \
             WHERE id = $1 RETURNING {FEE_COLUMNS}"
        ))
        .bind(id)
        .bind(update.description.as_deref().map(str::trim).unwrap_or(&current.description))
        .bind(next.amount)
        .bind(next.late_fee)
        .bind(next.due_date)
        .bind(status.as_str())
        .fetch_one(self.pool)
        .await?;
        Ok(fee)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        let mut tx = self.pool.begin().await?;

        let paid: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM payments WHERE fee_id = $1 AND status = 'success')")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        if paid {
            return Err(ApiError::conflict("Fee has successful payments and cannot be deleted"));
        }

        sqlx::query("DELETE FROM payments WHERE fee_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM fees WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("Fee not found"));
        }

        tx.commit().await?;
        Ok(())
    }

    /// Charge the gateway while holding the fee row lock
    pub async fn pay(&self, auth: &AuthUser, id: Uuid, request: &PayRequest) -> Result<Payment, ApiError> {
        let mut tx = self.pool.begin().await?;

        let fee = sqlx::query_as::<_, Fee>(&format!("SELECT {FEE_COLUMNS} FROM fees WHERE id = $1 FOR UPDATE"))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ApiError::not_found("Fee not found"))?;

        if fee.student_id != auth.id {
            return Err(ApiError::forbidden("Only the student a fee belongs to can pay it"));
        }
        if fee.status == FeeStatus::Paid {
            return Err(ApiError::conflict("Fee is already paid"));
        }
        validate_payment_amount(request.amount, fee.outstanding())?;
        if request.method.trim().is_empty() {
            return Err(ApiError::invalid_field("method", "Payment method is required"));
        }

        let outcome = self
            .state
            .gateway
            .charge(&ChargeRequest {
                fee_id: fee.id,
                student_id: fee.student_id,
                amount: request.amount,
                method: request.method.trim().to_string(),
            })
            .await;

        let (status, failure_reason) = match &outcome {
            ChargeOutcome::Approved { .. } => (PaymentStatus::Success, None),
            ChargeOutcome::Declined { reason, .. } => (PaymentStatus::Failed, Some(reason.clone())),
        };

        let payment = sqlx::query_as::<_, Payment>(&format!(
            "INSERT INTO payments (id, fee_id, student_id, amount, method, transaction_id, status, failure_reason) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {PAYMENT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(fee.id)
        .bind(fee.student_id)
        .bind(request.amount)
        .bind(request.method.trim())
        .bind(outcome.transaction_id())
        .bind(status.as_str())
        .bind(&failure_reason)
        .fetch_one(&mut *tx)
        .await?;

        if status == PaymentStatus::Failed {
            tx.commit().await?;
            tracing::warn!("Payment {} for fee {} declined", payment.transaction_id, fee.id);
            notify_quietly(
                self.pool,
                fee.student_id,
                NewNotification::new(
                    NotificationKind::Fee,
                    "Payment failed",
                    format!("Your payment of {} for {} was declined", payment.amount, fee.description),
                )
                .with_link(format!("/fees/{}", fee.id)),
            )
            .await;
            return Err(ApiError::payment_required("Payment was declined", json!(payment)));
        }

        let today = Utc::now().date_naive();
        let paid_total = fee.amount_paid + request.amount;
        let new_status = fee.status_for(paid_total, today);

        sqlx::query("UPDATE fees SET amount_paid = $2, status = $3, updated_at = now() WHERE id = $1")
            .bind(fee.id)
            .bind(paid_total)
            .bind(new_status.as_str())
            .execute(&mut *tx)
            .await?;

        let on_time = today <= fee.due_date && fee.late_fee == Decimal::ZERO;
        if new_status == FeeStatus::Paid && on_time {
            award_points(&mut tx, fee.student_id, rewards::FEE_PAID_ON_TIME, "Fee paid on time").await?;
        }

        tx.commit().await?;
        tracing::info!("Payment {} settled {} against fee {}", payment.transaction_id, payment.amount, fee.id);

        notify_quietly(
            self.pool,
            fee.student_id,
            NewNotification::new(
                NotificationKind::Fee,
                "Payment received",
                format!("We received {} for {} (ref {})", payment.amount, fee.description, payment.transaction_id),
            )
            .with_link(format!("/fees/payments/{}", payment.id)),
        )
        .await;

        Ok(payment)
    }

    pub async fn payments(&self, student_id: Uuid, page: Page) -> Result<Paginated<Payment>, ApiError> {
        let items = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE student_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        ))
        .bind(student_id)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE student_id = $1")
            .bind(student_id)
            .fetch_one(self.pool)
            .await?;

        Ok(Paginated::new(items, total, page))
    }

    pub async fn receipt(&self, auth: &AuthUser, payment_id: Uuid) -> Result<Receipt, ApiError> {
        let payment = sqlx::query_as::<_, Payment>(&format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1"))
            .bind(payment_id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Payment not found"))?;
        auth.authorize_owner_or(payment.student_id, &[Role::Admin])?;

        let fee = self.find(payment.fee_id).await?;
        Ok(Receipt { payment, fee })
    }

    /// Unpaid fees due within the reminder window and not reminded in the last day
    pub async fn send_due_reminders(&self) -> Result<u64, ApiError> {
        let today = Utc::now().date_naive();
        let horizon = today + chrono::Duration::days(self.config.fees.reminder_days_before);

        let fees = sqlx::query_as::<_, Fee>(&format!(
            "UPDATE fees SET last_reminded_at = now() \
             WHERE status IN ('pending', 'partial') AND due_date BETWEEN $1 AND $2 \
             AND (last_reminded_at IS NULL OR last_reminded_at < now() - INTERVAL '24 hours') \
             RETURNING {FEE_COLUMNS}"
        ))
        .bind(today)
        .bind(horizon)
        .fetch_all(self.pool)
        .await?;

        for fee in &fees {
            notify_quietly(
                self.pool,
                fee.student_id,
                NewNotification::new(
                    NotificationKind::Fee,
                    "Fee due soon",
                    format!("{} ({} outstanding) is due on {}", fee.description, fee.outstanding(), fee.due_date),
                )
                .with_link(format!("/fees/{}", fee.id)),
            )
            .await;
        }

        Ok(fees.len() as u64)
    }

    /// Flag unpaid fees past due and apply the one-off late fee
    pub async fn mark_overdue(&self) -> Result<u64, ApiError> {
        let today = Utc::now().date_naive();

        let mut tx = self.pool.begin().await?;
        let fees = sqlx::query_as::<_, Fee>(&format!(
            "SELECT {FEE_COLUMNS} FROM fees WHERE status IN ('pending', 'partial') AND due_date < $1 FOR UPDATE"
        ))
        .bind(today)
        .fetch_all(&mut *tx)
        .await?;

        for fee in &fees {
            let late_fee = late_fee_for(fee.amount, self.config.fees.late_fee_percent);
            sqlx::query("UPDATE fees SET status = 'overdue', late_fee = $2, updated_at = now() WHERE id = $1")
                .bind(fee.id)
                .bind(late_fee)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        for fee in &fees {
            notify_quietly(
                self.pool,
                fee.student_id,
                NewNotification::new(
                    NotificationKind::Fee,
                    "Fee overdue",
                    format!("{} was due on {}. A late fee has been applied.", fee.description, fee.due_date),
                )
                .with_link(format!("/fees/{}", fee.id)),
            )
            .await;
        }

        Ok(fees.len() as u64)
    }

    pub async fn count_overdue(&self) -> Result<i64, ApiError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM fees WHERE status = 'overdue'")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    async fn ensure_student(&self, id: Uuid) -> Result<(), ApiError> {
        let is_student: Option<bool> = sqlx::query_scalar("SELECT role = 'student' FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        match is_student {
            Some(true) => Ok(()),
            Some(false) => Err(ApiError::invalid_field("student_id", "Fees can only be assigned to students")),
            None => Err(ApiError::not_found("Student not found")),
        }
    }
}

fn validate_fee_fields(description: &str, amount: Decimal) -> Result<(), ApiError> {
    if description.trim().is_empty() {
        return Err(ApiError::invalid_field("description", "Description is required"));
    }
    if amount <= Decimal::ZERO {
        return Err(ApiError::invalid_field("amount", "Amount must be greater than zero"));
    }
    Ok(())
}

/// Only admins may look across students; everyone else is pinned to their own fees
pub fn fee_scope(auth: &AuthUser, requested: Option<Uuid>) -> Option<Uuid> {
    if auth.is(Role::Admin) {
        requested
    } else {
        Some(auth.id)
    }
}

pub fn validate_payment_amount(amount: Decimal, outstanding: Decimal) -> Result<(), ApiError> {
    if amount <= Decimal::ZERO {
        return Err(ApiError::invalid_field("amount", "Amount must be greater than zero"));
    }
    if amount > outstanding {
        return Err(ApiError::invalid_field(
            "amount",
            format!("Amount exceeds the outstanding balance of {}", outstanding),
        ));
    }
    Ok(())
}

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

crate::text_enum! {
    pub enum FeeType {
        Tuition => "tuition",
        Hostel => "hostel",
        Exam => "exam",
        Library => "library",
        Other => "other",
    }
}

crate::text_enum! {
    pub enum FeeStatus {
        Pending => "pending",
        Partial => "partial",
        Paid => "paid",
        Overdue => "overdue",
    }
}

crate::text_enum! {
    pub enum PaymentStatus {
        Success => "success",
        Failed => "failed",
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Fee {
    pub id: Uuid,
    pub student_id: Uuid,
    #[sqlx(try_from = "String")]
    pub fee_type: FeeType,
    pub description: String,
    pub amount: Decimal,
    pub amount_paid: Decimal,
    pub late_fee: Decimal,
    pub due_date: NaiveDate,
    #[sqlx(try_from = "String")]
    pub status: FeeStatus,
    pub last_reminded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Fee {
    /// Amount still owed including any late fee
    pub fn outstanding(&self) -> Decimal {
        (self.amount + self.late_fee - self.amount_paid).max(Decimal::ZERO)
    }

    /// Status once `paid_total` has been received against this fee
    pub fn status_for(&self, paid_total: Decimal, today: NaiveDate) -> FeeStatus {
        if paid_total >= self.amount + self.late_fee {
            FeeStatus::Paid
        } else if today > self.due_date {
            FeeStatus::Overdue
        } else if paid_total > Decimal::ZERO {
            FeeStatus::Partial
        } else {
            FeeStatus::Pending
        }
    }
}

/// One-off penalty applied when a fee first becomes overdue
pub fn late_fee_for(amount: Decimal, percent: Decimal) -> Decimal {
    (amount * percent / Decimal::ONE_HUNDRED).round_dp(2)
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub fee_id: Uuid,
    pub student_id: Uuid,
    pub amount: Decimal,
    pub method: String,
    pub transaction_id: String,
    #[sqlx(try_from = "String")]
    pub status: PaymentStatus,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Per-student totals for the fee summary card
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FeeSummary {
    pub total: Decimal,
    pub paid: Decimal,
    pub outstanding: Decimal,
    pub overdue_count: i64,
}

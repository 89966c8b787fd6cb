use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

crate::text_enum! {
    pub enum IssueStatus {
        Issued => "issued",
        Returned => "returned",
        Overdue => "overdue",
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub category: String,
    pub total_copies: i32,
    pub available_copies: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    pub fn issued_copies(&self) -> i32 {
        self.total_copies - self.available_copies
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BookIssue {
    pub id: Uuid,
    pub book_id: Uuid,
    pub user_id: Uuid,
    pub issued_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub renewals: i32,
    pub fine: Decimal,
    #[sqlx(try_from = "String")]
    pub status: IssueStatus,
}

impl BookIssue {
    pub fn is_open(&self) -> bool {
        self.returned_at.is_none()
    }

    pub fn is_overdue_at(&self, now: DateTime<Utc>) -> bool {
        self.is_open() && now > self.due_date
    }
}

/// Issue joined with the book's title for listings
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BookIssueDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub issue: BookIssue,
    pub book_title: String,
    pub book_author: String,
}

/// Whole days past due, counting any started day; zero when on time
pub fn days_overdue(due: DateTime<Utc>, returned: DateTime<Utc>) -> i64 {
    let late = returned - due;
    if late <= chrono::Duration::zero() {
        return 0;
    }
    let days = late.num_days();
    if late > chrono::Duration::days(days) {
        days + 1
    } else {
        days
    }
}

pub fn fine_for(due: DateTime<Utc>, returned: DateTime<Utc>, fine_per_day: Decimal) -> Decimal {
    Decimal::from(days_overdue(due, returned)) * fine_per_day
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn due() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn on_time_return_has_no_fine() {
        assert_eq!(days_overdue(due(), due() - Duration::hours(3)), 0);
        assert_eq!(days_overdue(due(), due()), 0);
        assert_eq!(fine_for(due(), due(), Decimal::from(2)), Decimal::ZERO);
    }

    #[test]
    fn started_days_count_as_full_days() {
        assert_eq!(days_overdue(due(), due() + Duration::minutes(5)), 1);
        assert_eq!(days_overdue(due(), due() + Duration::days(2)), 2);
        assert_eq!(days_overdue(due(), due() + Duration::days(2) + Duration::seconds(1)), 3);
    }

    #[test]
    fn fine_scales_with_rate() {
        assert_eq!(
            fine_for(due(), due() + Duration::days(4), Decimal::new(250, 2)),
            Decimal::new(1000, 2)
        );
    }

    #[test]
    fn overdue_only_while_open() {
        let now = Utc::now();
        let mut issue = BookIssue {
            id: Uuid::new_v4(),
            book_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            issued_at: now - Duration::days(20),
            due_date: now - Duration::days(6),
            returned_at: None,
            renewals: 0,
            fine: Decimal::ZERO,
            status: IssueStatus::Issued,
        };
        assert!(issue.is_overdue_at(now));
        issue.returned_at = Some(now);
        assert!(!issue.is_overdue_at(now));
    }
}

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

crate::text_enum! {
    pub enum DriveStatus {
        Open => "open",
        Closed => "closed",
    }
}

crate::text_enum! {
    pub enum ApplicationStatus {
        Applied => "applied",
        Shortlisted => "shortlisted",
        Rejected => "rejected",
        Selected => "selected",
    }
}

impl ApplicationStatus {
    pub fn can_transition_to(&self, next: ApplicationStatus) -> bool {
        use ApplicationStatus::*;
        matches!(
            (self, next),
            (Applied, Shortlisted) | (Applied, Rejected) | (Shortlisted, Selected) | (Shortlisted, Rejected)
        )
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Drive {
    pub id: Uuid,
    pub company: String,
    pub role_title: String,
    pub description: String,
    pub package_lpa: Decimal,
    pub min_cgpa: Decimal,
    pub departments: Vec<String>,
    pub deadline: DateTime<Utc>,
    pub drive_date: DateTime<Utc>,
    #[sqlx(try_from = "String")]
    pub status: DriveStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Why a student may not apply to a drive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ineligibility {
    Closed,
    DeadlinePassed,
    Department,
    CgpaUnknown,
    CgpaTooLow,
}

impl Drive {
    pub fn accepts_applications_at(&self, now: DateTime<Utc>) -> Result<(), Ineligibility> {
        if self.status == DriveStatus::Closed {
            return Err(Ineligibility::Closed);
        }
        if now > self.deadline {
            return Err(Ineligibility::DeadlinePassed);
        }
        Ok(())
    }

    /// Department list empty means every department is eligible
    pub fn check_candidate(&self, department: Option<&str>, cgpa: Option<Decimal>) -> Result<(), Ineligibility> {
        if !self.departments.is_empty() {
            let eligible = department
                .map(|d| self.departments.iter().any(|allowed| allowed.eq_ignore_ascii_case(d)))
                .unwrap_or(false);
            if !eligible {
                return Err(Ineligibility::Department);
            }
        }

        if self.min_cgpa > Decimal::ZERO {
            match cgpa {
                None => return Err(Ineligibility::CgpaUnknown),
                Some(cgpa) if cgpa < self.min_cgpa => return Err(Ineligibility::CgpaTooLow),
                Some(_) => {}
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Application {
    pub id: Uuid,
    pub drive_id: Uuid,
    pub student_id: Uuid,
    #[sqlx(try_from = "String")]
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Application joined with drive headline fields
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ApplicationDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub application: Application,
    pub company: String,
    pub role_title: String,
    pub student_name: String,
    pub student_email: String,
}

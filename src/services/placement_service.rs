use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::database::models::gamification::rewards;
use crate::database::models::notification::{NewNotification, NotificationKind};
use crate::database::models::placement::{
    Application, ApplicationDetail, ApplicationStatus, Drive, DriveStatus, Ineligibility,
};
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::gamification_service::award_points;
use crate::services::notification_service::notify_quietly;
use crate::state::AppState;
use crate::types::{Page, Paginated};

const DRIVE_COLUMNS: &str = "id, company, role_title, description, package_lpa, min_cgpa, departments, deadline, \
     drive_date, status, created_at, updated_at";
const APPLICATION_COLUMNS: &str = "id, drive_id, student_id, status, applied_at, updated_at";
const DETAIL_SELECT: &str = "SELECT a.id, a.drive_id, a.student_id, a.status, a.applied_at, a.updated_at, \
            d.company, d.role_title, u.name AS student_name, u.email AS student_email \
     FROM placement_applications a \
     JOIN placement_drives d ON d.id = a.drive_id \
     JOIN users u ON u.id = a.student_id";

#[derive(Debug, Clone, Deserialize)]
pub struct NewDrive {
    pub company: String,
    pub role_title: String,
    #[serde(default)]
    pub description: String,
    pub package_lpa: Decimal,
    #[serde(default)]
    pub min_cgpa: Decimal,
    #[serde(default)]
    pub departments: Vec<String>,
    pub deadline: DateTime<Utc>,
    pub drive_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DriveUpdate {
    pub description: Option<String>,
    pub package_lpa: Option<Decimal>,
    pub min_cgpa: Option<Decimal>,
    pub departments: Option<Vec<String>>,
    pub deadline: Option<DateTime<Utc>>,
    pub drive_date: Option<DateTime<Utc>>,
    pub status: Option<DriveStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DriveFilter {
    pub open: Option<bool>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationStatusUpdate {
    pub status: ApplicationStatus,
}

pub struct PlacementService<'a> {
    pool: &'a PgPool,
    config: &'a AppConfig,
}

impl<'a> PlacementService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self {
            pool: state.pool(),
            config: &state.config,
        }
    }

    /// `open=true` keeps drives still taking applications
    pub async fn list_drives(&self, filter: &DriveFilter) -> Result<Paginated<Drive>, ApiError> {
        let page = Page::new(filter.page, filter.limit, &self.config.api);
        let open_only = filter.open.unwrap_or(false);

        const WHERE: &str = "(NOT $1 OR (status = 'open' AND deadline >= now()))";

        let items = sqlx::query_as::<_, Drive>(&format!(
            "SELECT {DRIVE_COLUMNS} FROM placement_drives WHERE {WHERE} ORDER BY deadline ASC LIMIT $2 OFFSET $3"
        ))
        .bind(open_only)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM placement_drives WHERE {WHERE}"))
            .bind(open_only)
            .fetch_one(self.pool)
            .await?;

        Ok(Paginated::new(items, total, page))
    }

    pub async fn get_drive(&self, id: Uuid) -> Result<Drive, ApiError> {
        sqlx::query_as::<_, Drive>(&format!("SELECT {DRIVE_COLUMNS} FROM placement_drives WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Placement drive not found"))
    }

    pub async fn create_drive(&self, input: NewDrive) -> Result<Drive, ApiError> {
        if input.company.trim().is_empty() {
            return Err(ApiError::invalid_field("company", "Company is required"));
        }
        if input.role_title.trim().is_empty() {
            return Err(ApiError::invalid_field("role_title", "Role title is required"));
        }
        validate_drive_numbers(Some(input.package_lpa), Some(input.min_cgpa))?;
        if input.drive_date < input.deadline {
            return Err(ApiError::invalid_field("drive_date", "Drive date must be after the application deadline"));
        }

        let drive = sqlx::query_as::<_, Drive>(&format!(
            "INSERT INTO placement_drives (id, company, role_title, description, package_lpa, min_cgpa, departments, \
                                           deadline, drive_date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {DRIVE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(input.company.trim())
        .bind(input.role_title.trim())
        .bind(input.description.trim())
        .bind(input.package_lpa)
        .bind(input.min_cgpa)
        .bind(normalize_departments(&input.departments))
        .bind(input.deadline)
        .bind(input.drive_date)
        .fetch_one(self.pool)
        .await?;

        tracing::info!("Opened placement drive {} for {}", drive.role_title, drive.company);
        Ok(drive)
    }

    pub async fn update_drive(&self, id: Uuid, update: &DriveUpdate) -> Result<Drive, ApiError> {
        validate_drive_numbers(update.package_lpa, update.min_cgpa)?;
        let departments = update.departments.as_deref().map(normalize_departments);

        sqlx::query_as::<_, Drive>(&format!(
            "UPDATE placement_drives SET description = COALESCE($2, description), \
             package_lpa = COALESCE($3, package_lpa), min_cgpa = COALESCE($4, min_cgpa), \
             departments = COALESCE($5, departments), deadline = COALESCE($6, deadline), \
             drive_date = COALESCE($7, drive_date), status = COALESCE($8, status), updated_at = now() \
             WHERE id = $1 RETURNING {DRIVE_COLUMNS}"
        ))
        .bind(id)
        .bind(update.description.as_deref().map(str::trim))
        .bind(update.package_lpa)
        .bind(update.min_cgpa)
        .bind(departments)
        .bind(update.deadline)
        .bind(update.drive_date)
        .bind(update.status.map(|s| s.as_str()))
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Placement drive not found"))
    }

    /// Applications cascade with the drive
    pub async fn delete_drive(&self, id: Uuid) -> Result<(), ApiError> {
        let result = sqlx::query("DELETE FROM placement_drives WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("Placement drive not found"));
        }
        Ok(())
    }

    pub async fn apply(&self, auth: &AuthUser, drive_id: Uuid) -> Result<Application, ApiError> {
        let drive = self.get_drive(drive_id).await?;
        drive.accepts_applications_at(Utc::now()).map_err(ineligibility_error)?;

        let cgpa: Option<Decimal> = sqlx::query_scalar("SELECT cgpa FROM users WHERE id = $1")
            .bind(auth.id)
            .fetch_one(self.pool)
            .await?;
        drive
            .check_candidate(auth.department.as_deref(), cgpa)
            .map_err(ineligibility_error)?;

        let mut tx = self.pool.begin().await?;
        let application = sqlx::query_as::<_, Application>(&format!(
            "INSERT INTO placement_applications (id, drive_id, student_id) VALUES ($1, $2, $3) \
             ON CONFLICT (drive_id, student_id) DO NOTHING RETURNING {APPLICATION_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(drive.id)
        .bind(auth.id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ApiError::conflict("You have already applied to this drive"))?;

        award_points(
            &mut tx,
            auth.id,
            rewards::PLACEMENT_APPLIED,
            &format!("Applied to {}", drive.company),
        )
        .await?;
        tx.commit().await?;

        tracing::info!("{} applied to {} ({})", auth.email, drive.company, drive.role_title);
        Ok(application)
    }

    pub async fn my_applications(&self, student_id: Uuid) -> Result<Vec<ApplicationDetail>, ApiError> {
        let applications = sqlx::query_as::<_, ApplicationDetail>(&format!(
            "{DETAIL_SELECT} WHERE a.student_id = $1 ORDER BY a.applied_at DESC"
        ))
        .bind(student_id)
        .fetch_all(self.pool)
        .await?;
        Ok(applications)
    }

    pub async fn drive_applications(&self, drive_id: Uuid) -> Result<Vec<ApplicationDetail>, ApiError> {
        self.get_drive(drive_id).await?;
        let applications = sqlx::query_as::<_, ApplicationDetail>(&format!(
            "{DETAIL_SELECT} WHERE a.drive_id = $1 ORDER BY a.applied_at ASC"
        ))
        .bind(drive_id)
        .fetch_all(self.pool)
        .await?;
        Ok(applications)
    }

    pub async fn update_application_status(&self, id: Uuid, next: ApplicationStatus) -> Result<ApplicationDetail, ApiError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Application>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM placement_applications WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ApiError::not_found("Application not found"))?;

        if !current.status.can_transition_to(next) {
            return Err(ApiError::bad_request(format!(
                "Cannot move application from '{}' to '{}'",
                current.status, next
            )));
        }

        sqlx::query("UPDATE placement_applications SET status = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(next.as_str())
            .execute(&mut *tx)
            .await?;

        let detail = sqlx::query_as::<_, ApplicationDetail>(&format!("{DETAIL_SELECT} WHERE a.id = $1"))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        if next == ApplicationStatus::Selected {
            award_points(
                &mut tx,
                detail.application.student_id,
                rewards::PLACEMENT_SELECTED,
                &format!("Selected by {}", detail.company),
            )
            .await?;
        }

        tx.commit().await?;

        notify_quietly(
            self.pool,
            detail.application.student_id,
            NewNotification::new(
                NotificationKind::Placement,
                "Application update",
                status_message(&detail.company, &detail.role_title, next),
            )
            .with_link("/placements/applications"),
        )
        .await;

        Ok(detail)
    }

    pub async fn count_open_drives(&self) -> Result<i64, ApiError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM placement_drives WHERE status = 'open' AND deadline >= now()")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}

pub fn ineligibility_error(reason: Ineligibility) -> ApiError {
    match reason {
        Ineligibility::Closed => ApiError::conflict("This drive is closed"),
        Ineligibility::DeadlinePassed => ApiError::conflict("The application deadline has passed"),
        Ineligibility::Department => ApiError::forbidden("Your department is not eligible for this drive"),
        Ineligibility::CgpaUnknown => ApiError::forbidden("A CGPA on record is required for this drive"),
        Ineligibility::CgpaTooLow => ApiError::forbidden("Your CGPA is below the drive's minimum"),
    }
}

fn status_message(company: &str, role_title: &str, status: ApplicationStatus) -> String {
    match status {
        ApplicationStatus::Shortlisted => format!("You have been shortlisted for {} at {}", role_title, company),
        ApplicationStatus::Selected => format!("Congratulations! You have been selected for {} at {}", role_title, company),
        ApplicationStatus::Rejected => format!("Your application for {} at {} was not successful", role_title, company),
        ApplicationStatus::Applied => format!("Your application for {} at {} was received", role_title, company),
    }
}

fn normalize_departments(departments: &[String]) -> Vec<String> {
    let mut out: Vec<String> = departments
        .iter()
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .collect();
    out.sort();
    out.dedup();
    out
}

fn validate_drive_numbers(package_lpa: Option<Decimal>, min_cgpa: Option<Decimal>) -> Result<(), ApiError> {
    if package_lpa.is_some_and(|p| p < Decimal::ZERO) {
        return Err(ApiError::invalid_field("package_lpa", "Package cannot be negative"));
    }
    if min_cgpa.is_some_and(|c| c < Decimal::ZERO || c > Decimal::TEN) {
        return Err(ApiError::invalid_field("min_cgpa", "Minimum CGPA must be between 0 and 10"));
    }
    Ok(())
}

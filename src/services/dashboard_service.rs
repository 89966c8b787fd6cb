use serde::Serialize;

use crate::database::models::exam::Exam;
use crate::database::models::fee::FeeSummary;
use crate::database::models::gamification::level_for;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::exam_service::ExamService;
use crate::services::fee_service::FeeService;
use crate::services::hostel_service::HostelService;
use crate::services::library_service::LibraryService;
use crate::services::notification_service::NotificationService;
use crate::services::placement_service::PlacementService;
use crate::services::user_service::UserService;
use crate::state::AppState;

const UPCOMING_EXAMS: i64 = 5;

#[derive(Debug, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum Dashboard {
    Student(StudentDashboard),
    Staff(StaffDashboard),
}

#[derive(Debug, Serialize)]
pub struct StudentDashboard {
    pub fees: FeeSummary,
    pub active_issues: i64,
    pub upcoming_exams: Vec<Exam>,
    pub unread_notifications: i64,
    pub points: i32,
    pub level: i32,
}

#[derive(Debug, Serialize)]
pub struct StaffDashboard {
    pub users: i64,
    pub overdue_fees: i64,
    pub overdue_issues: i64,
    pub open_complaints: i64,
    pub open_drives: i64,
}

pub async fn dashboard_for(state: &AppState, auth: &AuthUser) -> Result<Dashboard, ApiError> {
    if auth.is_staff() {
        return Ok(Dashboard::Staff(StaffDashboard {
            users: UserService::new(state).count().await?,
            overdue_fees: FeeService::new(state).count_overdue().await?,
            overdue_issues: LibraryService::new(state).count_overdue().await?,
            open_complaints: HostelService::new(state).count_open_complaints().await?,
            open_drives: PlacementService::new(state).count_open_drives().await?,
        }));
    }

    let points = UserService::new(state).get(auth.id).await?.points;
    Ok(Dashboard::Student(StudentDashboard {
        fees: FeeService::new(state).summary(auth.id).await?,
        active_issues: LibraryService::new(state).count_active(auth.id).await?,
        upcoming_exams: ExamService::new(state)
            .upcoming_for(auth.department.as_deref(), auth.semester, UPCOMING_EXAMS)
            .await?,
        unread_notifications: NotificationService::new(state.pool()).unread_count(auth.id).await?,
        points,
        level: level_for(points),
    }))
}

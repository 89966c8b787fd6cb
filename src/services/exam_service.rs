use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::database::models::exam::{gpa, grade_for, percentage, Exam, ExamResult, ExamType, TranscriptEntry};
use crate::database::models::notification::{NewNotification, NotificationKind};
use crate::database::models::user::Role;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::notification_service::notify_many_quietly;
use crate::services::user_service::validate_semester;
use crate::state::AppState;
use crate::types::{Page, Paginated};

const EXAM_COLUMNS: &str = "id, title, subject, exam_type, department, semester, exam_date, duration_minutes, \
     venue, max_marks, created_by, created_at, updated_at";
const RESULT_COLUMNS: &str = "id, exam_id, student_id, marks_obtained, grade, grade_points, remarks, published_at";

pub const EXAM_STAFF: &[Role] = &[Role::Faculty, Role::Admin];

#[derive(Debug, Clone, Deserialize)]
pub struct NewExam {
    pub title: String,
    pub subject: String,
    pub exam_type: ExamType,
    pub department: String,
    pub semester: i32,
    pub exam_date: DateTime<Utc>,
    pub duration_minutes: i32,
    pub venue: String,
    pub max_marks: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExamUpdate {
    pub title: Option<String>,
    pub subject: Option<String>,
    pub exam_type: Option<ExamType>,
    pub exam_date: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i32>,
    pub venue: Option<String>,
    pub max_marks: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExamFilter {
    pub department: Option<String>,
    pub semester: Option<i32>,
    pub upcoming: Option<bool>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResultEntry {
    pub student_id: Uuid,
    pub marks_obtained: Decimal,
    pub remarks: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Transcript {
    pub results: Vec<TranscriptEntry>,
    pub gpa: Option<f64>,
}

pub struct ExamService<'a> {
    pool: &'a PgPool,
    config: &'a AppConfig,
}

impl<'a> ExamService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self {
            pool: state.pool(),
            config: &state.config,
        }
    }

    /// Students default to their own cohort when no filter is given
    pub async fn list(&self, auth: &AuthUser, filter: &ExamFilter) -> Result<Paginated<Exam>, ApiError> {
        let page = Page::new(filter.page, filter.limit, &self.config.api);
        let (department, semester) = if auth.is(Role::Student) {
            (
                filter.department.clone().or_else(|| auth.department.clone()),
                filter.semester.or(auth.semester),
            )
        } else {
            (filter.department.clone(), filter.semester)
        };
        let upcoming = filter.upcoming.unwrap_or(false);

        const WHERE: &str = "($1::text IS NULL OR department = $1) AND ($2::int IS NULL OR semester = $2) \
             AND (NOT $3 OR exam_date >= now())";

        let items = sqlx::query_as::<_, Exam>(&format!(
            "SELECT {EXAM_COLUMNS} FROM exams WHERE {WHERE} ORDER BY exam_date ASC LIMIT $4 OFFSET $5"
        ))
        .bind(&department)
        .bind(semester)
        .bind(upcoming)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM exams WHERE {WHERE}"))
            .bind(&department)
            .bind(semester)
            .bind(upcoming)
            .fetch_one(self.pool)
            .await?;

        Ok(Paginated::new(items, total, page))
    }

    pub async fn get(&self, id: Uuid) -> Result<Exam, ApiError> {
        sqlx::query_as::<_, Exam>(&format!("SELECT {EXAM_COLUMNS} FROM exams WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Exam not found"))
    }

    pub async fn create(&self, auth: &AuthUser, input: NewExam) -> Result<Exam, ApiError> {
        validate_exam(&input)?;

        let exam = sqlx::query_as::<_, Exam>(&format!(
            "INSERT INTO exams (id, title, subject, exam_type, department, semester, exam_date, duration_minutes, \
                                venue, max_marks, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING {EXAM_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(input.title.trim())
        .bind(input.subject.trim())
        .bind(input.exam_type.as_str())
        .bind(input.department.trim())
        .bind(input.semester)
        .bind(input.exam_date)
        .bind(input.duration_minutes)
        .bind(input.venue.trim())
        .bind(input.max_marks)
        .bind(auth.id)
        .fetch_one(self.pool)
        .await?;

        tracing::info!("Scheduled exam '{}' for {} semester {}", exam.title, exam.department, exam.semester);
        Ok(exam)
    }

    pub async fn update(&self, id: Uuid, update: &ExamUpdate) -> Result<Exam, ApiError> {
        if let Some(minutes) = update.duration_minutes {
            if minutes <= 0 {
                return Err(ApiError::invalid_field("duration_minutes", "Duration must be positive"));
            }
        }
        if let Some(max) = update.max_marks {
            if max <= Decimal::ZERO {
                return Err(ApiError::invalid_field("max_marks", "Maximum marks must be positive"));
            }
            let highest: Option<Decimal> =
                sqlx::query_scalar("SELECT MAX(marks_obtained) FROM exam_results WHERE exam_id = $1")
                    .bind(id)
                    .fetch_one(self.pool)
                    .await?;
            if highest.is_some_and(|h| h > max) {
                return Err(ApiError::invalid_field(
                    "max_marks",
                    "Published results exceed the new maximum marks",
                ));
            }
        }

        sqlx::query_as::<_, Exam>(&format!(
            "UPDATE exams SET title = COALESCE($2, title), subject = COALESCE($3, subject), \
             exam_type = COALESCE($4, exam_type), exam_date = COALESCE($5, exam_date), \
             duration_minutes = COALESCE($6, duration_minutes), venue = COALESCE($7, venue), \
             max_marks = COALESCE($8, max_marks), updated_at = now() \
             WHERE id = $1 RETURNING {EXAM_COLUMNS}"
        ))
        .bind(id)
        .bind(update.title.as_deref().map(str::trim))
        .bind(update.subject.as_deref().map(str::trim))
        .bind(update.exam_type.map(|t| t.as_str()))
        .bind(update.exam_date)
        .bind(update.duration_minutes)
        .bind(update.venue.as_deref().map(str::trim))
        .bind(update.max_marks)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Exam not found"))
    }

    /// Results cascade with the exam
    pub async fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        let result = sqlx::query("DELETE FROM exams WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("Exam not found"));
        }
        Ok(())
    }

    /// Upsert a batch of marks; any out-of-range entry rejects the whole batch
    pub async fn publish_results(&self, exam_id: Uuid, entries: &[ResultEntry]) -> Result<Vec<ExamResult>, ApiError> {
        if entries.is_empty() {
            return Err(ApiError::bad_request("No results supplied"));
        }

        let exam = self.get(exam_id).await?;

        let requested: Vec<Uuid> = entries.iter().map(|e| e.student_id).collect();
        let students: HashSet<Uuid> = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM users WHERE id = ANY($1) AND role = 'student' AND is_active",
        )
        .bind(&requested)
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .collect();
        check_marks(entries, exam.max_marks, &students)?;

        let ids: Vec<Uuid> = entries.iter().map(|_| Uuid::new_v4()).collect();
        let students: Vec<Uuid> = entries.iter().map(|e| e.student_id).collect();
        let marks: Vec<Decimal> = entries.iter().map(|e| e.marks_obtained).collect();
        let (grades, points): (Vec<String>, Vec<i32>) = entries
            .iter()
            .map(|e| {
                let (grade, points) = grade_for(percentage(e.marks_obtained, exam.max_marks));
                (grade.to_string(), points)
            })
            .unzip();
        let remarks: Vec<Option<String>> = entries.iter().map(|e| e.remarks.clone()).collect();

        let results = sqlx::query_as::<_, ExamResult>(&format!(
            "INSERT INTO exam_results (id, exam_id, student_id, marks_obtained, grade, grade_points, remarks) \
             SELECT r.id, $1, r.student_id, r.marks, r.grade, r.points, r.remarks \
             FROM UNNEST($2::uuid[], $3::uuid[], $4::numeric[], $5::text[], $6::int[], $7::text[]) \
                  AS r(id, student_id, marks, grade, points, remarks) \
             ON CONFLICT (exam_id, student_id) DO UPDATE SET \
                marks_obtained = EXCLUDED.marks_obtained, grade = EXCLUDED.grade, \
                grade_points = EXCLUDED.grade_points, remarks = EXCLUDED.remarks, published_at = now() \
             RETURNING {RESULT_COLUMNS}"
        ))
        .bind(exam.id)
        .bind(&ids)
        .bind(&students)
        .bind(&marks)
        .bind(&grades)
        .bind(&points)
        .bind(&remarks)
        .fetch_all(self.pool)
        .await?;

        tracing::info!("Published {} results for exam '{}'", results.len(), exam.title);

        notify_many_quietly(
            self.pool,
            &students,
            NewNotification::new(
                NotificationKind::Exam,
                "Result published",
                format!("Your result for {} ({}) is now available", exam.title, exam.subject),
            )
            .with_link("/exams/results"),
        )
        .await;

        Ok(results)
    }

    pub async fn results(&self, exam_id: Uuid) -> Result<Vec<ExamResult>, ApiError> {
        self.get(exam_id).await?;
        let results = sqlx::query_as::<_, ExamResult>(&format!(
            "SELECT {RESULT_COLUMNS} FROM exam_results WHERE exam_id = $1 ORDER BY marks_obtained DESC"
        ))
        .bind(exam_id)
        .fetch_all(self.pool)
        .await?;
        Ok(results)
    }

    pub async fn transcript(&self, student_id: Uuid) -> Result<Transcript, ApiError> {
        let results = sqlx::query_as::<_, TranscriptEntry>(
            "SELECT r.id, r.exam_id, r.student_id, r.marks_obtained, r.grade, r.grade_points, r.remarks, r.published_at, \
                    e.title AS exam_title, e.subject, e.max_marks, e.semester \
             FROM exam_results r JOIN exams e ON e.id = r.exam_id \
             WHERE r.student_id = $1 ORDER BY e.exam_date DESC",
        )
        .bind(student_id)
        .fetch_all(self.pool)
        .await?;

        let points: Vec<i32> = results.iter().map(|r| r.result.grade_points).collect();
        Ok(Transcript {
            gpa: gpa(&points),
            results,
        })
    }

    /// Exams starting within `window` from now
    pub async fn starting_within(&self, window: Duration) -> Result<Vec<Exam>, ApiError> {
        let exams = sqlx::query_as::<_, Exam>(&format!(
            "SELECT {EXAM_COLUMNS} FROM exams WHERE exam_date > now() AND exam_date <= $1 ORDER BY exam_date"
        ))
        .bind(Utc::now() + window)
        .fetch_all(self.pool)
        .await?;
        Ok(exams)
    }

    pub async fn upcoming_for(&self, department: Option<&str>, semester: Option<i32>, limit: i64) -> Result<Vec<Exam>, ApiError> {
        let exams = sqlx::query_as::<_, Exam>(&format!(
            "SELECT {EXAM_COLUMNS} FROM exams \
             WHERE exam_date >= now() AND ($1::text IS NULL OR department = $1) AND ($2::int IS NULL OR semester = $2) \
             ORDER BY exam_date ASC LIMIT $3"
        ))
        .bind(department)
        .bind(semester)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(exams)
    }

    /// Remind each exam's cohort; returns notifications sent
    pub async fn send_reminders(&self) -> Result<u64, ApiError> {
        let mut sent = 0;
        for exam in self.starting_within(Duration::hours(24)).await? {
            let students: Vec<Uuid> = sqlx::query_scalar(
                "SELECT id FROM users WHERE role = 'student' AND is_active AND department = $1 AND semester = $2",
            )
            .bind(&exam.department)
            .bind(exam.semester)
            .fetch_all(self.pool)
            .await?;

            if students.is_empty() {
                continue;
            }

            notify_many_quietly(
                self.pool,
                &students,
                NewNotification::new(
                    NotificationKind::Exam,
                    "Exam tomorrow",
                    format!(
                        "{} ({}) starts at {} in {}",
                        exam.title,
                        exam.subject,
                        exam.exam_date.format("%Y-%m-%d %H:%M UTC"),
                        exam.venue
                    ),
                )
                .with_link(format!("/exams/{}", exam.id)),
            )
            .await;
            sent += students.len() as u64;
        }
        Ok(sent)
    }
}

fn validate_exam(input: &NewExam) -> Result<(), ApiError> {
    let mut errors = HashMap::new();
    for (field, value) in [
        ("title", &input.title),
        ("subject", &input.subject),
        ("department", &input.department),
        ("venue", &input.venue),
    ] {
        if value.trim().is_empty() {
            errors.insert(field.to_string(), "This field is required".to_string());
        }
    }
    if let Err(reason) = validate_semester(input.semester) {
        errors.insert("semester".to_string(), reason);
    }
    if input.duration_minutes <= 0 {
        errors.insert("duration_minutes".to_string(), "Duration must be positive".to_string());
    }
    if input.max_marks <= Decimal::ZERO {
        errors.insert("max_marks".to_string(), "Maximum marks must be positive".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation_error("Invalid exam", Some(errors)))
    }
}

/// 422 keyed by student id for out-of-range marks, repeated ids and ids that are not active students
pub fn check_marks(entries: &[ResultEntry], max_marks: Decimal, students: &HashSet<Uuid>) -> Result<(), ApiError> {
    let mut errors: HashMap<String, String> = HashMap::new();
    let mut seen = HashSet::new();

    for e in entries {
        let key = e.student_id.to_string();
        if !seen.insert(e.student_id) {
            errors.insert(key, "Student appears more than once in this batch".to_string());
        } else if !students.contains(&e.student_id) {
            errors.insert(key, "Not an active student".to_string());
        } else if e.marks_obtained < Decimal::ZERO || e.marks_obtained > max_marks {
            errors.insert(key, format!("Marks {} must be between 0 and {}", e.marks_obtained, max_marks));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::unprocessable_entity("Some results are invalid", errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(marks: i64) -> ResultEntry {
        ResultEntry {
            student_id: Uuid::new_v4(),
            marks_obtained: Decimal::from(marks),
            remarks: None,
        }
    }

    fn roster(entries: &[ResultEntry]) -> HashSet<Uuid> {
        entries.iter().map(|e| e.student_id).collect()
    }

    fn field_errors(err: ApiError) -> HashMap<String, String> {
        match err {
            ApiError::UnprocessableEntity { field_errors, .. } => field_errors,
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn marks_within_range_pass() {
        let entries = [entry(0), entry(50), entry(100)];
        assert!(check_marks(&entries, Decimal::from(100), &roster(&entries)).is_ok());
    }

    #[test]
    fn repeated_student_is_rejected_before_upsert() {
        let first = entry(40);
        let again = ResultEntry {
            marks_obtained: Decimal::from(90),
            ..first.clone()
        };
        let entries = [first.clone(), again, entry(70)];

        let err = check_marks(&entries, Decimal::from(100), &roster(&entries)).unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::UNPROCESSABLE_ENTITY);
        let errors = field_errors(err);
        assert_eq!(errors.len(), 1);
        assert!(errors[&first.student_id.to_string()].contains("more than once"));
    }

    #[test]
    fn unknown_students_are_reported_individually() {
        let known = entry(55);
        let stranger = entry(60);
        let err = check_marks(&[known.clone(), stranger.clone()], Decimal::from(100), &roster(&[known])).unwrap_err();

        let errors = field_errors(err);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[&stranger.student_id.to_string()], "Not an active student");
    }

    #[test]
    fn out_of_range_marks_are_reported_per_student() {
        let bad_high = entry(101);
        let bad_low = entry(-1);
        let entries = [entry(40), bad_high.clone(), bad_low.clone()];
        let err = check_marks(&entries, Decimal::from(100), &roster(&entries)).unwrap_err();

        assert_eq!(err.status_code(), axum::http::StatusCode::UNPROCESSABLE_ENTITY);
        let errors = field_errors(err);
        assert_eq!(errors.len(), 2);
        assert!(errors.contains_key(&bad_high.student_id.to_string()));
        assert!(errors.contains_key(&bad_low.student_id.to_string()));
    }

    #[test]
    fn exam_validation_collects_fields() {
        let input = NewExam {
            title: " ".to_string(),
            subject: "Algorithms".to_string(),
            exam_type: ExamType::Midterm,
            department: "CSE".to_string(),
            semester: 0,
            exam_date: Utc::now(),
            duration_minutes: 0,
            venue: "Hall A".to_string(),
            max_marks: Decimal::from(100),
        };
        match validate_exam(&input).unwrap_err() {
            ApiError::ValidationError { field_errors: Some(errors), .. } => {
                assert!(errors.contains_key("title"));
                assert!(errors.contains_key("semester"));
                assert!(errors.contains_key("duration_minutes"));
                assert!(!errors.contains_key("venue"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}

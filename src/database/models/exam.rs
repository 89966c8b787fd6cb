use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

crate::text_enum! {
    pub enum ExamType {
        Quiz => "quiz",
        Midterm => "midterm",
        Final => "final",
        Practical => "practical",
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Exam {
    pub id: Uuid,
    pub title: String,
    pub subject: String,
    #[sqlx(try_from = "String")]
    pub exam_type: ExamType,
    pub department: String,
    pub semester: i32,
    pub exam_date: DateTime<Utc>,
    pub duration_minutes: i32,
    pub venue: String,
    pub max_marks: Decimal,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ExamResult {
    pub id: Uuid,
    pub exam_id: Uuid,
    pub student_id: Uuid,
    pub marks_obtained: Decimal,
    pub grade: String,
    pub grade_points: i32,
    pub remarks: Option<String>,
    pub published_at: DateTime<Utc>,
}

/// Result joined with its exam for a student's transcript
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TranscriptEntry {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub result: ExamResult,
    pub exam_title: String,
    pub subject: String,
    pub max_marks: Decimal,
    pub semester: i32,
}

/// Letter grade and grade points for a percentage score
pub fn grade_for(percentage: Decimal) -> (&'static str, i32) {
    const TABLE: &[(i64, &str, i32)] = &[
        (90, "O", 10),
        (80, "A+", 9),
        (70, "A", 8),
        (60, "B+", 7),
        (50, "B", 6),
        (45, "C", 5),
        (40, "P", 4),
    ];

    TABLE
        .iter()
        .find(|(floor, _, _)| percentage >= Decimal::from(*floor))
        .map(|(_, grade, points)| (*grade, *points))
        .unwrap_or(("F", 0))
}

pub fn percentage(marks: Decimal, max_marks: Decimal) -> Decimal {
    if max_marks <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    marks * Decimal::ONE_HUNDRED / max_marks
}

/// Mean grade points to two decimals; None when nothing has been graded
pub fn gpa(grade_points: &[i32]) -> Option<f64> {
    if grade_points.is_empty() {
        return None;
    }
    let sum: i64 = grade_points.iter().map(|p| *p as i64).sum();
    let mean = Decimal::from(sum) / Decimal::from(grade_points.len() as i64);
    mean.round_dp(2).to_f64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_boundaries() {
        assert_eq!(grade_for(Decimal::from(100)), ("O", 10));
        assert_eq!(grade_for(Decimal::from(90)), ("O", 10));
        assert_eq!(grade_for(Decimal::new(8999, 2)), ("A+", 9));
        assert_eq!(grade_for(Decimal::from(45)), ("C", 5));
        assert_eq!(grade_for(Decimal::from(40)), ("P", 4));
        assert_eq!(grade_for(Decimal::new(3999, 2)), ("F", 0));
    }

    #[test]
    fn percentage_of_max_marks() {
        assert_eq!(percentage(Decimal::from(45), Decimal::from(50)), Decimal::from(90));
        assert_eq!(percentage(Decimal::from(45), Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn gpa_rounds_mean() {
        assert_eq!(gpa(&[]), None);
        assert_eq!(gpa(&[10, 9, 8]), Some(9.0));
        assert_eq!(gpa(&[10, 9, 9]), Some(9.33));
    }
}

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

crate::text_enum! {
    pub enum Role {
        Student => "student",
        Faculty => "faculty",
        Librarian => "librarian",
        Warden => "warden",
        Admin => "admin",
    }
}

impl Role {
    /// Every role except `student`
    pub fn is_staff(&self) -> bool {
        !matches!(self, Role::Student)
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub student_id: Option<String>,
    pub department: Option<String>,
    pub semester: Option<i32>,
    pub phone: Option<String>,
    pub cgpa: Option<Decimal>,
    pub points: i32,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Column list shared by every query that hydrates a `User`
pub const USER_COLUMNS: &str = "id, name, email, password_hash, role, student_id, department, semester, \
     phone, cgpa, points, is_active, last_login_at, created_at, updated_at";

#[cfg(test)]
impl User {
    pub fn fixture(email: &str, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: "Test User".to_string(),
            email: email.to_string(),
            password_hash: String::new(),
            role,
            student_id: None,
            department: Some("CSE".to_string()),
            semester: Some(3),
            phone: None,
            cgpa: None,
            points: 0,
            is_active: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staff_roles() {
        assert!(!Role::Student.is_staff());
        assert!(Role::ALL.iter().filter(|r| r.is_staff()).count() == 4);
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let mut user = User::fixture("a@b.edu", Role::Student);
        user.password_hash = "$argon2id$secret".to_string();
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "student");
    }
}

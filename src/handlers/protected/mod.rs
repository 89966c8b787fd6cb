// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Every route here sits behind jwt_auth_middleware and receives an
// `Extension<AuthUser>`. Role checks happen inside each handler.

pub mod auth;
pub mod dashboard;
pub mod exams;
pub mod fees;
pub mod gamification;
pub mod hostel;
pub mod library;
pub mod notifications;
pub mod placements;
pub mod users;

pub mod dashboard_service;
pub mod exam_service;
pub mod fee_service;
pub mod gamification_service;
pub mod hostel_service;
pub mod library_service;
pub mod notification_service;
pub mod payment;
pub mod placement_service;
pub mod user_service;

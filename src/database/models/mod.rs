pub mod exam;
pub mod fee;
pub mod gamification;
pub mod hostel;
pub mod library;
pub mod notification;
pub mod placement;
pub mod user;

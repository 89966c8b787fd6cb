pub mod application;
pub mod drive;

pub use drive::create as drive_create;
pub use drive::delete as drive_delete;
pub use drive::get as drive_get;
pub use drive::list as drive_list;
pub use drive::update as drive_update;

pub use application::apply as drive_apply;
pub use application::for_drive as drive_applications;
pub use application::mine as application_mine;
pub use application::status as application_status;

pub mod allocation;
pub mod complaint;
pub mod room;

pub use room::create as room_create;
pub use room::get as room_get;
pub use room::list as room_list;
pub use room::update as room_update;

pub use allocation::create as allocation_create;
pub use allocation::list as allocation_list;
pub use allocation::mine as allocation_mine;
pub use allocation::vacate as allocation_vacate;

pub use complaint::create as complaint_create;
pub use complaint::list as complaint_list;
pub use complaint::status as complaint_status;

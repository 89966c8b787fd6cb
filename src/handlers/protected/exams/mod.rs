pub mod exam;
pub mod result;

pub use exam::create as exam_create;
pub use exam::delete as exam_delete;
pub use exam::get as exam_get;
pub use exam::list as exam_list;
pub use exam::update as exam_update;

pub use result::list as result_list;
pub use result::mine as result_mine;
pub use result::publish as result_publish;

pub mod book;
pub mod issue;

pub use book::create as book_create;
pub use book::delete as book_delete;
pub use book::get as book_get;
pub use book::list as book_list;
pub use book::update as book_update;

pub use issue::create as issue_create;
pub use issue::list as issue_list;
pub use issue::renew as issue_renew;
pub use issue::return_book as issue_return;

pub mod session;

pub use session::logout as logout_post;
pub use session::me as me_get;
pub use session::password as password_put;

pub mod fee;
pub mod payment;

pub use fee::bulk as fee_bulk;
pub use fee::create as fee_create;
pub use fee::delete as fee_delete;
pub use fee::get as fee_get;
pub use fee::list as fee_list;
pub use fee::summary as fee_summary;
pub use fee::update as fee_update;

pub use payment::get as payment_get;
pub use payment::list as payment_list;
pub use payment::pay as fee_pay;

pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod scheduler;
pub mod services;
pub mod state;
pub mod types;

pub use routes::app;
pub use state::AppState;

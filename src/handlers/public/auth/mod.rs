// handlers/public/auth/mod.rs - Public authentication handlers

use serde::Serialize;

use crate::auth::TokenPair;
use crate::database::models::user::User;

pub mod login;    // POST /auth/login - authenticate and get tokens
pub mod refresh;  // POST /auth/refresh - exchange a refresh token
pub mod register; // POST /auth/register - create a student account

pub use login::login_post;
pub use refresh::refresh_post;
pub use register::register_post;

/// Body returned by every token-issuing endpoint
#[derive(Debug, Serialize)]
pub struct AuthPayload {
    pub user: User,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

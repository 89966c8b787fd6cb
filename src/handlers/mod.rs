// handlers/mod.rs - Two-tier handler layout
//
// Public (no auth) → Protected (JWT auth)
pub mod public;    // No authentication required (/, /health, /auth/*)
pub mod protected; // JWT authentication required (/api/*)

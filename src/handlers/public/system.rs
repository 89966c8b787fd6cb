// handlers/public/system.rs - GET / and GET /health

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::middleware::ApiResponse;
use crate::state::AppState;

/// Route index for clients and humans poking at the API
pub async fn root_get() -> ApiResponse<Value> {
    ApiResponse::success(json!({
        "name": "Student Portal API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "auth": ["/auth/register", "/auth/login", "/auth/refresh", "/api/auth/me", "/api/auth/password", "/api/auth/logout"],
            "users": ["/api/users", "/api/users/:id"],
            "fees": ["/api/fees", "/api/fees/summary", "/api/fees/bulk", "/api/fees/:id", "/api/fees/:id/pay", "/api/fees/payments", "/api/fees/payments/:id"],
            "library": ["/api/library/books", "/api/library/books/:id", "/api/library/issues", "/api/library/issues/:id/return", "/api/library/issues/:id/renew"],
            "exams": ["/api/exams", "/api/exams/:id", "/api/exams/:id/results", "/api/exams/results/me"],
            "hostel": ["/api/hostel/rooms", "/api/hostel/rooms/:id", "/api/hostel/allocations", "/api/hostel/allocations/me", "/api/hostel/allocations/:id/vacate", "/api/hostel/complaints", "/api/hostel/complaints/:id/status"],
            "placements": ["/api/placements/drives", "/api/placements/drives/:id", "/api/placements/drives/:id/apply", "/api/placements/drives/:id/applications", "/api/placements/applications/me", "/api/placements/applications/:id/status"],
            "notifications": ["/api/notifications", "/api/notifications/unread-count", "/api/notifications/read-all", "/api/notifications/bulk", "/api/notifications/:id", "/api/notifications/:id/read"],
            "gamification": ["/api/gamification/award", "/api/gamification/profile", "/api/gamification/leaderboard"],
            "dashboard": ["/api/dashboard"],
            "system": ["/", "/health"]
        }
    }))
}

/// 200 when the database answers, 503 otherwise
pub async fn health_get(State(state): State<AppState>) -> impl IntoResponse {
    let timestamp = chrono::Utc::now().to_rfc3339();
    match state.db.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "OK",
                "data": { "status": "ok", "database": "connected", "timestamp": timestamp }
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "message": "Database unavailable",
                    "data": { "status": "degraded", "database": "unreachable", "timestamp": timestamp }
                })),
            )
        }
    }
}

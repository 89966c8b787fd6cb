use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Environment;
use crate::handlers::{protected, public};
use crate::middleware::jwt_auth_middleware;
use crate::state::AppState;

/// Full application router: public routes, JWT-protected `/api`, CORS and tracing
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state);

    Router::new()
        // Public
        .route("/", get(public::root_get))
        .route("/health", get(public::health_get))
        .merge(auth_public_routes())
        // Protected API
        .merge(protected_routes(state.clone()))
        // Global middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn auth_public_routes() -> Router<AppState> {
    use public::auth;

    Router::new()
        .route("/auth/register", post(auth::register_post))
        .route("/auth/login", post(auth::login_post))
        .route("/auth/refresh", post(auth::refresh_post))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(auth_routes())
        .merge(user_routes())
        .merge(fee_routes())
        .merge(library_routes())
        .merge(exam_routes())
        .merge(hostel_routes())
        .merge(placement_routes())
        .merge(notification_routes())
        .merge(gamification_routes())
        .route("/api/dashboard", get(protected::dashboard::get))
        .route_layer(from_fn_with_state(state, jwt_auth_middleware))
}

fn auth_routes() -> Router<AppState> {
    use protected::auth;

    Router::new()
        .route("/api/auth/me", get(auth::me_get))
        .route("/api/auth/password", put(auth::password_put))
        .route("/api/auth/logout", post(auth::logout_post))
}

fn user_routes() -> Router<AppState> {
    use protected::users;

    Router::new()
        .route("/api/users", get(users::list).post(users::create))
        .route(
            "/api/users/:id",
            get(users::get).put(users::update).delete(users::deactivate),
        )
}

fn fee_routes() -> Router<AppState> {
    use protected::fees;

    Router::new()
        .route("/api/fees", get(fees::fee_list).post(fees::fee_create))
        .route("/api/fees/summary", get(fees::fee_summary))
        .route("/api/fees/bulk", post(fees::fee_bulk))
        .route("/api/fees/payments", get(fees::payment_list))
        .route("/api/fees/payments/:id", get(fees::payment_get))
        .route(
            "/api/fees/:id",
            get(fees::fee_get).put(fees::fee_update).delete(fees::fee_delete),
        )
        .route("/api/fees/:id/pay", post(fees::fee_pay))
}

fn library_routes() -> Router<AppState> {
    use protected::library;

    Router::new()
        .route("/api/library/books", get(library::book_list).post(library::book_create))
        .route(
            "/api/library/books/:id",
            get(library::book_get).put(library::book_update).delete(library::book_delete),
        )
        .route("/api/library/issues", get(library::issue_list).post(library::issue_create))
        .route("/api/library/issues/:id/return", post(library::issue_return))
        .route("/api/library/issues/:id/renew", post(library::issue_renew))
}

fn exam_routes() -> Router<AppState> {
    use protected::exams;

    Router::new()
        .route("/api/exams", get(exams::exam_list).post(exams::exam_create))
        .route("/api/exams/results/me", get(exams::result_mine))
        .route(
            "/api/exams/:id",
            get(exams::exam_get).put(exams::exam_update).delete(exams::exam_delete),
        )
        .route("/api/exams/:id/results", get(exams::result_list).post(exams::result_publish))
}

fn hostel_routes() -> Router<AppState> {
    use protected::hostel;

    Router::new()
        .route("/api/hostel/rooms", get(hostel::room_list).post(hostel::room_create))
        .route("/api/hostel/rooms/:id", get(hostel::room_get).put(hostel::room_update))
        .route(
            "/api/hostel/allocations",
            get(hostel::allocation_list).post(hostel::allocation_create),
        )
        .route("/api/hostel/allocations/me", get(hostel::allocation_mine))
        .route("/api/hostel/allocations/:id/vacate", post(hostel::allocation_vacate))
        .route(
            "/api/hostel/complaints",
            get(hostel::complaint_list).post(hostel::complaint_create),
        )
        .route("/api/hostel/complaints/:id/status", put(hostel::complaint_status))
}

fn placement_routes() -> Router<AppState> {
    use protected::placements;

    Router::new()
        .route(
            "/api/placements/drives",
            get(placements::drive_list).post(placements::drive_create),
        )
        .route(
            "/api/placements/drives/:id",
            get(placements::drive_get)
                .put(placements::drive_update)
                .delete(placements::drive_delete),
        )
        .route("/api/placements/drives/:id/apply", post(placements::drive_apply))
        .route(
            "/api/placements/drives/:id/applications",
            get(placements::drive_applications),
        )
        .route("/api/placements/applications/me", get(placements::application_mine))
        .route(
            "/api/placements/applications/:id/status",
            put(placements::application_status),
        )
}

fn notification_routes() -> Router<AppState> {
    use protected::notifications;

    Router::new()
        .route(
            "/api/notifications",
            get(notifications::list).post(notifications::send),
        )
        .route("/api/notifications/unread-count", get(notifications::unread_count))
        .route("/api/notifications/read-all", put(notifications::mark_all_read))
        .route("/api/notifications/bulk", post(notifications::send_bulk))
        .route("/api/notifications/:id", axum::routing::delete(notifications::delete))
        .route("/api/notifications/:id/read", put(notifications::mark_read))
}

fn gamification_routes() -> Router<AppState> {
    use protected::gamification;

    Router::new()
        .route("/api/gamification/award", post(gamification::award))
        .route("/api/gamification/profile", get(gamification::profile))
        .route("/api/gamification/leaderboard", get(gamification::leaderboard))
}

/// Development allows any origin; other environments use the configured list
fn cors_layer(state: &AppState) -> CorsLayer {
    if state.config.environment == Environment::Development {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = state
        .config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::library::Book;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::library_service::{BookFilter, BookUpdate, LibraryService, NewBook, CIRCULATION_ROLES};
use crate::state::AppState;
use crate::types::Paginated;

/// GET /api/library/books - catalogue search
pub async fn list(State(state): State<AppState>, Query(filter): Query<BookFilter>) -> ApiResult<Paginated<Book>> {
    Ok(ApiResponse::success(LibraryService::new(&state).list_books(&filter).await?))
}

/// GET /api/library/books/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Book> {
    Ok(ApiResponse::success(LibraryService::new(&state).get_book(id).await?))
}

/// POST /api/library/books
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(input): Json<NewBook>,
) -> ApiResult<Book> {
    auth.authorize(CIRCULATION_ROLES)?;
    let book = LibraryService::new(&state).create_book(input).await?;
    Ok(ApiResponse::created("Book added", book))
}

/// PUT /api/library/books/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(update): Json<BookUpdate>,
) -> ApiResult<Book> {
    auth.authorize(CIRCULATION_ROLES)?;
    let book = LibraryService::new(&state).update_book(id, &update).await?;
    Ok(ApiResponse::message("Book updated", book))
}

/// DELETE /api/library/books/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    auth.authorize(CIRCULATION_ROLES)?;
    LibraryService::new(&state).delete_book(id).await?;
    Ok(ApiResponse::message("Book deleted", json!({ "id": id })))
}

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::database::models::library::{BookIssue, BookIssueDetail};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::library_service::{IssueFilter, IssueRequest, LibraryService, CIRCULATION_ROLES};
use crate::state::AppState;
use crate::types::Paginated;

/// GET /api/library/issues - students only ever see their own loans
pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(filter): Query<IssueFilter>,
) -> ApiResult<Paginated<BookIssueDetail>> {
    Ok(ApiResponse::success(LibraryService::new(&state).list_issues(&auth, &filter).await?))
}

/// POST /api/library/issues
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(request): Json<IssueRequest>,
) -> ApiResult<BookIssue> {
    auth.authorize(CIRCULATION_ROLES)?;
    let issue = LibraryService::new(&state).issue(&request).await?;
    Ok(ApiResponse::created("Book issued", issue))
}

/// POST /api/library/issues/:id/return
pub async fn return_book(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<BookIssue> {
    auth.authorize(CIRCULATION_ROLES)?;
    let issue = LibraryService::new(&state).return_issue(id).await?;
    let message = if issue.fine.is_zero() {
        "Book returned".to_string()
    } else {
        format!("Book returned with a fine of {}", issue.fine)
    };
    Ok(ApiResponse::message(message, issue))
}

/// POST /api/library/issues/:id/renew - holder or circulation staff
pub async fn renew(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<BookIssue> {
    let issue = LibraryService::new(&state).renew(&auth, id).await?;
    Ok(ApiResponse::message("Loan renewed", issue))
}

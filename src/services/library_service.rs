use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::database::models::gamification::rewards;
use crate::database::models::library::{fine_for, Book, BookIssue, BookIssueDetail, IssueStatus};
use crate::database::models::notification::{NewNotification, NotificationKind};
use crate::database::models::user::Role;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::gamification_service::award_points;
use crate::services::notification_service::notify_quietly;
use crate::state::AppState;
use crate::types::{Page, Paginated};

const BOOK_COLUMNS: &str =
    "id, title, author, isbn, category, total_copies, available_copies, created_at, updated_at";
const ISSUE_COLUMNS: &str = "id, book_id, user_id, issued_at, due_date, returned_at, renewals, fine, status";

/// Roles that run the circulation desk
pub const CIRCULATION_ROLES: &[Role] = &[Role::Librarian, Role::Admin];

#[derive(Debug, Clone, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub category: String,
    pub total_copies: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookUpdate {
    pub title: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    pub total_copies: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BookFilter {
    pub q: Option<String>,
    pub category: Option<String>,
    pub available: Option<bool>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IssueFilter {
    pub user_id: Option<Uuid>,
    pub status: Option<IssueStatus>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueRequest {
    pub book_id: Uuid,
    pub user_id: Uuid,
}

pub struct LibraryService<'a> {
    pool: &'a PgPool,
    config: &'a AppConfig,
}

impl<'a> LibraryService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self {
            pool: state.pool(),
            config: &state.config,
        }
    }

    pub async fn list_books(&self, filter: &BookFilter) -> Result<Paginated<Book>, ApiError> {
        let page = Page::new(filter.page, filter.limit, &self.config.api);
        let q = filter.q.as_deref().map(|q| format!("%{}%", q.trim()));

        const WHERE: &str = "($1::text IS NULL OR title ILIKE $1 OR author ILIKE $1 OR isbn ILIKE $1) \
             AND ($2::text IS NULL OR category = $2) \
             AND ($3::bool IS NULL OR (available_copies > 0) = $3)";

        let items = sqlx::query_as::<_, Book>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE {WHERE} ORDER BY title ASC LIMIT $4 OFFSET $5"
        ))
        .bind(&q)
        .bind(&filter.category)
        .bind(filter.available)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM books WHERE {WHERE}"))
            .bind(&q)
            .bind(&filter.category)
            .bind(filter.available)
            .fetch_one(self.pool)
            .await?;

        Ok(Paginated::new(items, total, page))
    }

    pub async fn get_book(&self, id: Uuid) -> Result<Book, ApiError> {
        sqlx::query_as::<_, Book>(&format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Book not found"))
    }

    pub async fn create_book(&self, input: NewBook) -> Result<Book, ApiError> {
        for (field, value) in [
            ("title", &input.title),
            ("author", &input.author),
            ("isbn", &input.isbn),
            ("category", &input.category),
        ] {
            if value.trim().is_empty() {
                return Err(ApiError::invalid_field(field, "This field is required"));
            }
        }
        if input.total_copies < 1 {
            return Err(ApiError::invalid_field("total_copies", "At least one copy is required"));
        }

        let book = sqlx::query_as::<_, Book>(&format!(
            "INSERT INTO books (id, title, author, isbn, category, total_copies, available_copies) \
             VALUES ($1, $2, $3, $4, $5, $6, $6) RETURNING {BOOK_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(input.title.trim())
        .bind(input.author.trim())
        .bind(input.isbn.trim())
        .bind(input.category.trim())
        .bind(input.total_copies)
        .fetch_one(self.pool)
        .await?;

        tracing::info!("Catalogued '{}' ({} copies)", book.title, book.total_copies);
        Ok(book)
    }

    /// Changing total copies shifts available copies by the same delta
    pub async fn update_book(&self, id: Uuid, update: &BookUpdate) -> Result<Book, ApiError> {
        let mut tx = self.pool.begin().await?;
        let book = sqlx::query_as::<_, Book>(&format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = $1 FOR UPDATE"))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ApiError::not_found("Book not found"))?;

        let (total, available) = match update.total_copies {
            Some(total) => resize_copies(&book, total)?,
            None => (book.total_copies, book.available_copies),
        };

        let updated = sqlx::query_as::<_, Book>(&format!(
            "UPDATE books SET title = COALESCE($2, title), author = COALESCE($3, author), \
             category = COALESCE($4, category), total_copies = $5, available_copies = $6, updated_at = now() \
             WHERE id = $1 RETURNING {BOOK_COLUMNS}"
        ))
        .bind(id)
        .bind(update.title.as_deref().map(str::trim))
        .bind(update.author.as_deref().map(str::trim))
        .bind(update.category.as_deref().map(str::trim))
        .bind(total)
        .bind(available)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    pub async fn delete_book(&self, id: Uuid) -> Result<(), ApiError> {
        let mut tx = self.pool.begin().await?;
        let active: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book_issues WHERE book_id = $1 AND returned_at IS NULL")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        if active > 0 {
            return Err(ApiError::conflict("Book has copies on loan and cannot be deleted"));
        }

        sqlx::query("DELETE FROM book_issues WHERE book_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("Book not found"));
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn issue(&self, request: &IssueRequest) -> Result<BookIssue, ApiError> {
        let mut tx = self.pool.begin().await?;

        let book = sqlx::query_as::<_, Book>(&format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = $1 FOR UPDATE"))
            .bind(request.book_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ApiError::not_found("Book not found"))?;
        if book.available_copies < 1 {
            return Err(ApiError::conflict("No copies of this book are available"));
        }

        let active: bool = sqlx::query_scalar("SELECT is_active FROM users WHERE id = $1")
            .bind(request.user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))?;
        if !active {
            return Err(ApiError::conflict("User account is inactive"));
        }

        let (open_issues, holds_same): (i64, bool) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(BOOL_OR(book_id = $2), FALSE) FROM book_issues \
             WHERE user_id = $1 AND returned_at IS NULL",
        )
        .bind(request.user_id)
        .bind(request.book_id)
        .fetch_one(&mut *tx)
        .await?;
        if holds_same {
            return Err(ApiError::conflict("User already has this book issued"));
        }
        if open_issues >= self.config.library.max_active_issues {
            return Err(ApiError::conflict(format!(
                "User already has the maximum of {} books issued",
                self.config.library.max_active_issues
            )));
        }

        let due_date = Utc::now() + Duration::days(self.config.library.loan_days);
        let issue = sqlx::query_as::<_, BookIssue>(&format!(
            "INSERT INTO book_issues (id, book_id, user_id, due_date) VALUES ($1, $2, $3, $4) RETURNING {ISSUE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(book.id)
        .bind(request.user_id)
        .bind(due_date)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE books SET available_copies = available_copies - 1, updated_at = now() WHERE id = $1")
            .bind(book.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!("Issued '{}' to {} until {}", book.title, request.user_id, issue.due_date);

        notify_quietly(
            self.pool,
            request.user_id,
            NewNotification::new(
                NotificationKind::Library,
                "Book issued",
                format!("'{}' is due back on {}", book.title, issue.due_date.format("%Y-%m-%d")),
            )
            .with_link("/library/issues"),
        )
        .await;

        Ok(issue)
    }

    pub async fn return_issue(&self, id: Uuid) -> Result<BookIssue, ApiError> {
        let mut tx = self.pool.begin().await?;

        let issue = self.lock_issue(&mut tx, id).await?;
        if !issue.is_open() {
            return Err(ApiError::conflict("Book has already been returned"));
        }

        let now = Utc::now();
        let fine = fine_for(issue.due_date, now, self.config.library.fine_per_day);

        let returned = sqlx::query_as::<_, BookIssue>(&format!(
            "UPDATE book_issues SET returned_at = $2, fine = $3, status = 'returned' WHERE id = $1 RETURNING {ISSUE_COLUMNS}"
        ))
        .bind(id)
        .bind(now)
        .bind(fine)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE books SET available_copies = available_copies + 1, updated_at = now() WHERE id = $1")
            .bind(issue.book_id)
            .execute(&mut *tx)
            .await?;

        if fine == Decimal::ZERO {
            award_points(&mut tx, issue.user_id, rewards::BOOK_RETURNED_ON_TIME, "Book returned on time").await?;
        }

        tx.commit().await?;

        if fine > Decimal::ZERO {
            notify_quietly(
                self.pool,
                issue.user_id,
                NewNotification::new(
                    NotificationKind::Library,
                    "Late return fine",
                    format!("A fine of {} was charged for returning a book late", fine),
                )
                .with_link("/library/issues"),
            )
            .await;
        }

        Ok(returned)
    }

    pub async fn renew(&self, auth: &AuthUser, id: Uuid) -> Result<BookIssue, ApiError> {
        let mut tx = self.pool.begin().await?;

        let issue = self.lock_issue(&mut tx, id).await?;
        auth.authorize_owner_or(issue.user_id, CIRCULATION_ROLES)?;

        if !issue.is_open() {
            return Err(ApiError::conflict("Book has already been returned"));
        }
        if issue.is_overdue_at(Utc::now()) || issue.status == IssueStatus::Overdue {
            return Err(ApiError::conflict("Overdue books cannot be renewed"));
        }
        if issue.renewals >= self.config.library.max_renewals {
            return Err(ApiError::conflict("Renewal limit reached"));
        }

        let renewed = sqlx::query_as::<_, BookIssue>(&format!(
            "UPDATE book_issues SET due_date = $2, renewals = renewals + 1 WHERE id = $1 RETURNING {ISSUE_COLUMNS}"
        ))
        .bind(id)
        .bind(issue.due_date + Duration::days(self.config.library.loan_days))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(renewed)
    }

    pub async fn list_issues(&self, auth: &AuthUser, filter: &IssueFilter) -> Result<Paginated<BookIssueDetail>, ApiError> {
        let page = Page::new(filter.page, filter.limit, &self.config.api);
        let user_id = issue_scope(auth, filter.user_id);
        let status = filter.status.map(|s| s.as_str());

        let items = sqlx::query_as::<_, BookIssueDetail>(
            "SELECT i.id, i.book_id, i.user_id, i.issued_at, i.due_date, i.returned_at, i.renewals, i.fine, i.status, \
                    b.title AS book_title, b.author AS book_author \
             FROM book_issues i JOIN books b ON b.id = i.book_id \
             WHERE ($1::uuid IS NULL OR i.user_id = $1) AND ($2::text IS NULL OR i.status = $2) \
             ORDER BY i.issued_at DESC LIMIT $3 OFFSET $4",
        )
        .bind(user_id)
        .bind(status)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM book_issues WHERE ($1::uuid IS NULL OR user_id = $1) AND ($2::text IS NULL OR status = $2)",
        )
        .bind(user_id)
        .bind(status)
        .fetch_one(self.pool)
        .await?;

        Ok(Paginated::new(items, total, page))
    }

    /// Flag open loans past due; returns the flagged issues
    pub async fn mark_overdue(&self) -> Result<u64, ApiError> {
        let flagged = sqlx::query_as::<_, BookIssue>(&format!(
            "UPDATE book_issues SET status = 'overdue' \
             WHERE status = 'issued' AND returned_at IS NULL AND due_date < now() RETURNING {ISSUE_COLUMNS}"
        ))
        .fetch_all(self.pool)
        .await?;

        for issue in &flagged {
            notify_quietly(
                self.pool,
                issue.user_id,
                NewNotification::new(
                    NotificationKind::Library,
                    "Book overdue",
                    format!(
                        "A book was due on {}. Fines of {} per day apply until it is returned.",
                        issue.due_date.format("%Y-%m-%d"),
                        self.config.library.fine_per_day
                    ),
                )
                .with_link("/library/issues"),
            )
            .await;
        }

        Ok(flagged.len() as u64)
    }

    pub async fn count_active(&self, user_id: Uuid) -> Result<i64, ApiError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM book_issues WHERE user_id = $1 AND returned_at IS NULL")
            .bind(user_id)
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    pub async fn count_overdue(&self) -> Result<i64, ApiError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM book_issues WHERE status = 'overdue'")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    async fn lock_issue(&self, tx: &mut sqlx::PgConnection, id: Uuid) -> Result<BookIssue, ApiError> {
        sqlx::query_as::<_, BookIssue>(&format!("SELECT {ISSUE_COLUMNS} FROM book_issues WHERE id = $1 FOR UPDATE"))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ApiError::not_found("Issue record not found"))
    }
}

/// New (total, available) when resizing a title's stock
/// Circulation staff may look across borrowers; everyone else sees their own loans
pub fn issue_scope(auth: &AuthUser, requested: Option<Uuid>) -> Option<Uuid> {
    if CIRCULATION_ROLES.contains(&auth.role) {
        requested
    } else {
        Some(auth.id)
    }
}

pub fn resize_copies(book: &Book, new_total: i32) -> Result<(i32, i32), ApiError> {
    if new_total < 1 {
        return Err(ApiError::invalid_field("total_copies", "At least one copy is required"));
    }
    if new_total < book.issued_copies() {
        return Err(ApiError::invalid_field(
            "total_copies",
            format!("{} copies are currently issued", book.issued_copies()),
        ));
    }
    Ok((new_total, book.available_copies + (new_total - book.total_copies)))
}

//! Book requests repository: storage and state transitions of borrow requests

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Transaction};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::Book,
        book_request::{default_due_date, BookRequest, RequestStatus},
    },
};

use super::conflict_on_unique;

const DUPLICATE_PENDING: &str = "You already have a pending request for this book";

/// Outcome of an approval
#[derive(Debug)]
pub struct Approval {
    pub request: BookRequest,
    /// Competing pending requests on the same book that were rejected
    pub rejected: u64,
}

#[derive(Clone)]
pub struct BookRequestsRepository {
    pool: Pool<Postgres>,
}

impl BookRequestsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get request by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<BookRequest> {
        sqlx::query_as::<_, BookRequest>("SELECT * FROM book_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Book request not found".to_string()))
    }

    async fn lock(tx: &mut Transaction<'_, Postgres>, id: i32) -> AppResult<BookRequest> {
        sqlx::query_as::<_, BookRequest>("SELECT * FROM book_requests WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Book request not found".to_string()))
    }

    /// Create a pending request for an available book.
    ///
    /// The book row is share-locked so an approval cannot issue it while the
    /// request is being recorded.
    pub async fn create(&self, user_id: i32, book_id: i32) -> AppResult<BookRequest> {
        let mut tx = self.pool.begin().await?;

        let available: bool = sqlx::query_scalar("SELECT available FROM books WHERE id = $1 FOR SHARE")
            .bind(book_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))?;

        if !available {
            return Err(AppError::Conflict(
                "Book is already issued to someone else".to_string(),
            ));
        }

        let already_pending: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM book_requests WHERE book_id = $1 AND user_id = $2 AND status = $3)",
        )
        .bind(book_id)
        .bind(user_id)
        .bind(RequestStatus::Pending)
        .fetch_one(&mut *tx)
        .await?;

        if already_pending {
            return Err(AppError::Conflict(DUPLICATE_PENDING.to_string()));
        }

        let request = sqlx::query_as::<_, BookRequest>(
            r#"
            INSERT INTO book_requests (book_id, user_id, status, request_date)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(book_id)
        .bind(user_id)
        .bind(RequestStatus::Pending)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, DUPLICATE_PENDING))?;

        tx.commit().await?;
        Ok(request)
    }

    /// Lock the book a request points at, before the request itself.
    ///
    /// Returns `None` when the request has no book or the book is gone.
    async fn lock_book_of(tx: &mut Transaction<'_, Postgres>, id: i32) -> AppResult<Option<Book>> {
        let book_id: Option<i32> = sqlx::query_scalar("SELECT book_id FROM book_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Book request not found".to_string()))?;
        let Some(book_id) = book_id else {
            return Ok(None);
        };
        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
            .bind(book_id)
            .fetch_optional(&mut **tx)
            .await?;
        Ok(book)
    }

    /// Approve a pending request: issue the book to the requester and reject
    /// every other pending request on that book, all in one transaction.
    ///
    /// Of two concurrent approvals on the same book the second waits on the
    /// book row and then fails with `Conflict`.
    pub async fn approve(&self, id: i32, due_date: Option<DateTime<Utc>>) -> AppResult<Approval> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let book = Self::lock_book_of(&mut tx, id).await?;
        let request = Self::lock(&mut tx, id).await?;
        let status = request.status.transition(RequestStatus::Approved)?;

        let book = book
            .filter(|book| request.book_id == Some(book.id))
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))?;
        let user_id = request
            .user_id
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let claimed = sqlx::query(
            r#"
            UPDATE books SET available = FALSE, issued_to = $2, updated_at = NOW()
            WHERE id = $1 AND available
            "#,
        )
        .bind(book.id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if claimed == 0 {
            return Err(AppError::Conflict("Book is no longer available".to_string()));
        }

        let request = sqlx::query_as::<_, BookRequest>(
            r#"
            UPDATE book_requests
            SET status = $2, approval_date = $3, due_date = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(now)
        .bind(due_date.unwrap_or_else(|| default_due_date(now)))
        .fetch_one(&mut *tx)
        .await?;

        let rejected = sqlx::query(
            r#"
            UPDATE book_requests SET status = $3, updated_at = NOW()
            WHERE book_id = $1 AND status = $2 AND id != $4
            "#,
        )
        .bind(book.id)
        .bind(RequestStatus::Pending)
        .bind(RequestStatus::Rejected)
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;
        Ok(Approval { request, rejected })
    }

    /// Reject a pending request
    pub async fn reject(&self, id: i32) -> AppResult<BookRequest> {
        let rejected = sqlx::query_as::<_, BookRequest>(
            r#"
            UPDATE book_requests SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(RequestStatus::Pending)
        .bind(RequestStatus::Rejected)
        .fetch_optional(&self.pool)
        .await?;

        match rejected {
            Some(request) => Ok(request),
            // Missing, or no longer pending
            None => {
                let current = self.get_by_id(id).await?;
                current.status.transition(RequestStatus::Rejected)?;
                Err(AppError::Conflict("This request has already been processed".to_string()))
            }
        }
    }

    /// Close an approved request and make its book available again
    pub async fn mark_returned(&self, id: i32) -> AppResult<BookRequest> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let book = Self::lock_book_of(&mut tx, id).await?;
        let request = Self::lock(&mut tx, id).await?;
        let status = request.status.transition(RequestStatus::Returned)?;

        let book = book
            .filter(|book| request.book_id == Some(book.id))
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))?;

        sqlx::query(
            r#"
            UPDATE books SET available = TRUE, issued_to = NULL, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(book.id)
        .execute(&mut *tx)
        .await?;

        let request = sqlx::query_as::<_, BookRequest>(
            r#"
            UPDATE book_requests SET status = $2, return_date = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(request)
    }

    /// All requests, newest first
    pub async fn list(&self) -> AppResult<Vec<BookRequest>> {
        let requests = sqlx::query_as::<_, BookRequest>(
            "SELECT * FROM book_requests ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(requests)
    }

    /// Pending requests, oldest request first
    pub async fn list_pending(&self) -> AppResult<Vec<BookRequest>> {
        let requests = sqlx::query_as::<_, BookRequest>(
            "SELECT * FROM book_requests WHERE status = $1 ORDER BY request_date ASC",
        )
        .bind(RequestStatus::Pending)
        .fetch_all(&self.pool)
        .await?;
        Ok(requests)
    }

    /// A user's requests, newest first
    pub async fn list_for_user(&self, user_id: i32) -> AppResult<Vec<BookRequest>> {
        let requests = sqlx::query_as::<_, BookRequest>(
            "SELECT * FROM book_requests WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(requests)
    }

    /// A user's approved requests whose book has not come back yet
    pub async fn list_borrowed_by_user(&self, user_id: i32) -> AppResult<Vec<BookRequest>> {
        let requests = sqlx::query_as::<_, BookRequest>(
            r#"
            SELECT * FROM book_requests
            WHERE user_id = $1 AND status = $2 AND return_date IS NULL
            ORDER BY due_date ASC
            "#,
        )
        .bind(user_id)
        .bind(RequestStatus::Approved)
        .fetch_all(&self.pool)
        .await?;
        Ok(requests)
    }

    /// The `limit` most recently created requests
    pub async fn recent(&self, limit: i64) -> AppResult<Vec<BookRequest>> {
        let requests = sqlx::query_as::<_, BookRequest>(
            "SELECT * FROM book_requests ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(requests)
    }

    /// Approved requests due within `[from, to]`, soonest first
    pub async fn due_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> AppResult<Vec<BookRequest>> {
        let requests = sqlx::query_as::<_, BookRequest>(
            r#"
            SELECT * FROM book_requests
            WHERE status = $1 AND due_date >= $2 AND due_date <= $3
            ORDER BY due_date ASC
            "#,
        )
        .bind(RequestStatus::Approved)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(requests)
    }

    /// Approved requests whose due date is before `now`, most overdue first
    pub async fn overdue(&self, now: DateTime<Utc>) -> AppResult<Vec<BookRequest>> {
        let requests = sqlx::query_as::<_, BookRequest>(
            r#"
            SELECT * FROM book_requests
            WHERE status = $1 AND due_date < $2
            ORDER BY due_date ASC
            "#,
        )
        .bind(RequestStatus::Approved)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(requests)
    }

    pub async fn count_by_status(&self, status: RequestStatus) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book_requests WHERE status = $1")
            .bind(status)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

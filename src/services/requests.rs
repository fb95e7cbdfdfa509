//! Borrow request workflow service

use crate::{
    error::AppResult,
    models::book_request::{parse_due_date, BookRequest, BookRequestDetails},
    repository::Repository,
};

use super::lookup;

#[derive(Clone)]
pub struct RequestsService {
    repository: Repository,
}

impl RequestsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// File a pending request for an available book
    pub async fn create_request(&self, user_id: i32, book_id: i32) -> AppResult<BookRequest> {
        let request = self.repository.requests.create(user_id, book_id).await?;
        tracing::info!(request_id = request.id, book_id, user_id, "Book requested");
        Ok(request)
    }

    /// Approve a pending request and issue the book.
    ///
    /// `due_date` is RFC 3339 or `YYYY-MM-DD`; two weeks from now when absent.
    pub async fn approve_request(&self, request_id: i32, due_date: Option<&str>) -> AppResult<BookRequest> {
        let due_date = due_date
            .filter(|value| !value.trim().is_empty())
            .map(parse_due_date)
            .transpose()?;

        let approval = self.repository.requests.approve(request_id, due_date).await?;
        tracing::info!(
            request_id,
            book_id = ?approval.request.book_id,
            user_id = ?approval.request.user_id,
            rejected = approval.rejected,
            "Book request approved"
        );
        Ok(approval.request)
    }

    pub async fn reject_request(&self, request_id: i32) -> AppResult<BookRequest> {
        let request = self.repository.requests.reject(request_id).await?;
        tracing::info!(request_id, "Book request rejected");
        Ok(request)
    }

    /// Record the return of an issued book
    pub async fn return_book(&self, request_id: i32) -> AppResult<BookRequest> {
        let request = self.repository.requests.mark_returned(request_id).await?;
        tracing::info!(request_id, book_id = ?request.book_id, "Book returned");
        Ok(request)
    }

    /// The caller's requests, newest first
    pub async fn user_requests(&self, user_id: i32) -> AppResult<Vec<BookRequestDetails>> {
        let requests = self.repository.requests.list_for_user(user_id).await?;
        lookup::request_details_with_book(&self.repository, requests).await
    }

    /// The caller's books currently out
    pub async fn user_borrowed(&self, user_id: i32) -> AppResult<Vec<BookRequestDetails>> {
        let requests = self.repository.requests.list_borrowed_by_user(user_id).await?;
        lookup::request_details_with_book(&self.repository, requests).await
    }

    pub async fn all_requests(&self) -> AppResult<Vec<BookRequestDetails>> {
        let requests = self.repository.requests.list().await?;
        lookup::request_details(&self.repository, requests).await
    }

    pub async fn pending_requests(&self) -> AppResult<Vec<BookRequestDetails>> {
        let requests = self.repository.requests.list_pending().await?;
        lookup::request_details(&self.repository, requests).await
    }
}

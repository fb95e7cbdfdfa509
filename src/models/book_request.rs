//! Borrow request model and its lifecycle rules

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::{book::BookSummary, user::UserSummary};
use crate::error::AppError;

/// Loan period applied when an approval carries no due date
pub const DEFAULT_LOAN_DAYS: i64 = 14;

/// Request status.
///
/// `Pending` moves to `Approved` or `Rejected`; `Approved` moves to `Returned`.
/// `Rejected` and `Returned` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Returned,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
            RequestStatus::Returned => "returned",
        }
    }

    pub fn can_transition_to(self, next: RequestStatus) -> bool {
        matches!(
            (self, next),
            (RequestStatus::Pending, RequestStatus::Approved)
                | (RequestStatus::Pending, RequestStatus::Rejected)
                | (RequestStatus::Approved, RequestStatus::Returned)
        )
    }

    /// Check that moving to `next` is allowed, returning the new status
    pub fn transition(self, next: RequestStatus) -> Result<RequestStatus, AppError> {
        if self.can_transition_to(next) {
            return Ok(next);
        }
        let message = match next {
            RequestStatus::Returned => "This book was not issued or has already been returned",
            _ => "This request has already been processed",
        };
        Err(AppError::Conflict(message.to_string()))
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RequestStatus::Pending),
            "approved" => Ok(RequestStatus::Approved),
            "rejected" => Ok(RequestStatus::Rejected),
            "returned" => Ok(RequestStatus::Returned),
            _ => Err(format!("Invalid request status: {}", s)),
        }
    }
}

super::impl_text_column!(RequestStatus);

/// Borrow request from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookRequest {
    pub id: i32,
    /// Cleared when the book is deleted
    pub book_id: Option<i32>,
    /// Cleared when the user is deleted
    pub user_id: Option<i32>,
    pub status: RequestStatus,
    pub request_date: DateTime<Utc>,
    pub approval_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub return_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request with book and user resolved for display
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookRequestDetails {
    pub id: i32,
    pub book: Option<BookSummary>,
    pub user: Option<UserSummary>,
    pub status: RequestStatus,
    pub request_date: DateTime<Utc>,
    pub approval_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub return_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl BookRequestDetails {
    pub fn new(request: BookRequest, book: Option<BookSummary>, user: Option<UserSummary>) -> Self {
        BookRequestDetails {
            id: request.id,
            book,
            user,
            status: request.status,
            request_date: request.request_date,
            approval_date: request.approval_date,
            due_date: request.due_date,
            return_date: request.return_date,
            created_at: request.created_at,
        }
    }
}

/// Due date used when an approval does not specify one
pub fn default_due_date(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::days(DEFAULT_LOAN_DAYS)
}

/// Parse a due date given either as RFC 3339 or as a plain `YYYY-MM-DD` date.
///
/// Plain dates are taken as midnight UTC.
pub fn parse_due_date(value: &str) -> Result<DateTime<Utc>, AppError> {
    let value = value.trim();
    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Ok(datetime.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|datetime| datetime.and_utc())
        .ok_or_else(|| AppError::Validation(format!("Invalid due date: {}", value)))
}

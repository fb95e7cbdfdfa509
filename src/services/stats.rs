//! Statistics service for the admin dashboard

use chrono::{DateTime, Duration, Utc};

use crate::{
    api::stats::LibraryStatistics,
    error::AppResult,
    models::{book_request::RequestStatus, user::Role},
    repository::Repository,
};

use super::lookup;

/// Number of requests listed as recent activity
pub const RECENT_ACTIVITY_LIMIT: i64 = 20;

/// Look-ahead for books due soon
pub const DUE_SOON_DAYS: i64 = 7;

/// Inclusive window of due dates counted as "due soon"
pub fn due_soon_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    (now, now + Duration::days(DUE_SOON_DAYS))
}

#[derive(Clone)]
pub struct StatsService {
    repository: Repository,
}

impl StatsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Gather dashboard counts and lists. Read-only.
    pub async fn library_statistics(&self) -> AppResult<LibraryStatistics> {
        let repo = &self.repository;
        let now = Utc::now();
        let (from, to) = due_soon_window(now);

        let total_books = repo.books.count().await?;
        let available_books = repo.books.count_by_availability(true).await?;
        let borrowed_books = repo.books.count_by_availability(false).await?;
        let total_users = repo.users.count_by_role(Role::User).await?;
        let pending_requests = repo.requests.count_by_status(RequestStatus::Pending).await?;

        let recent_activity =
            lookup::request_details(repo, repo.requests.recent(RECENT_ACTIVITY_LIMIT).await?).await?;
        let books_due_soon = lookup::request_details(repo, repo.requests.due_between(from, to).await?).await?;
        let overdue_books = lookup::request_details(repo, repo.requests.overdue(now).await?).await?;

        Ok(LibraryStatistics {
            total_books,
            available_books,
            borrowed_books,
            total_users,
            pending_requests,
            recent_activity,
            books_due_soon,
            overdue_books,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_due_soon_window_spans_a_week() {
        let now = Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap();
        let (from, to) = due_soon_window(now);
        assert_eq!(from, now);
        assert_eq!(to, Utc.with_ymd_and_hms(2024, 1, 17, 9, 0, 0).unwrap());
    }
}

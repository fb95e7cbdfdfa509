//! Statistics endpoints

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{error::AppResult, models::book_request::BookRequestDetails, AppState};

use super::AdminUser;

/// Admin dashboard statistics
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LibraryStatistics {
    /// Number of books in the catalog
    pub total_books: i64,
    pub available_books: i64,
    /// Books currently issued
    pub borrowed_books: i64,
    /// Accounts with the `user` role
    pub total_users: i64,
    pub pending_requests: i64,
    /// Latest requests of any status
    pub recent_activity: Vec<BookRequestDetails>,
    /// Open borrows due within the next week
    pub books_due_soon: Vec<BookRequestDetails>,
    /// Open borrows past their due date
    pub overdue_books: Vec<BookRequestDetails>,
}

/// Get library statistics
#[utoipa::path(
    get,
    path = "/admin/statistics",
    tag = "stats",
    security(("auth_token" = [])),
    responses(
        (status = 200, description = "Dashboard statistics", body = LibraryStatistics),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_statistics(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> AppResult<Json<LibraryStatistics>> {
    let stats = state.services.stats.library_statistics().await?;
    Ok(Json(stats))
}

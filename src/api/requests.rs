//! Borrow request endpoints

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::book_request::{BookRequest, BookRequestDetails},
    AppState,
};

use super::{AdminUser, AppJson, AppPath, AuthenticatedUser, OptionalJson};

/// Borrow request body
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookRequest {
    pub book_id: Option<i32>,
}

/// Optional approval parameters
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApproveRequest {
    /// RFC 3339 timestamp or `YYYY-MM-DD`; two weeks from now when omitted
    pub due_date: Option<String>,
}

/// Acknowledgement carrying a request
#[derive(Serialize, ToSchema)]
pub struct RequestResponse {
    pub message: String,
    pub request: BookRequest,
}

impl RequestResponse {
    fn new(message: &str, request: BookRequest) -> Self {
        Self {
            message: message.to_string(),
            request,
        }
    }
}

/// Request to borrow a book
#[utoipa::path(
    post,
    path = "/books/request",
    tag = "requests",
    security(("auth_token" = [])),
    request_body = CreateBookRequest,
    responses(
        (status = 201, description = "Request filed", body = RequestResponse),
        (status = 400, description = "Missing book, book issued or request already pending", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn request_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    AppJson(body): AppJson<CreateBookRequest>,
) -> AppResult<(StatusCode, Json<RequestResponse>)> {
    let book_id = body
        .book_id
        .ok_or_else(|| AppError::Validation("Book ID is required".to_string()))?;

    let request = state.services.requests.create_request(claims.user_id, book_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(RequestResponse::new("Book request submitted successfully", request)),
    ))
}

/// Requests filed by the caller
#[utoipa::path(
    get,
    path = "/books/user/requests",
    tag = "requests",
    security(("auth_token" = [])),
    responses(
        (status = 200, description = "Caller's requests, newest first", body = Vec<BookRequestDetails>),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorResponse)
    )
)]
pub async fn my_requests(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<BookRequestDetails>>> {
    let requests = state.services.requests.user_requests(claims.user_id).await?;
    Ok(Json(requests))
}

/// Books currently borrowed by the caller
#[utoipa::path(
    get,
    path = "/books/user/borrowed",
    tag = "requests",
    security(("auth_token" = [])),
    responses(
        (status = 200, description = "Approved, unreturned requests", body = Vec<BookRequestDetails>),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorResponse)
    )
)]
pub async fn my_borrowed_books(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<BookRequestDetails>>> {
    let requests = state.services.requests.user_borrowed(claims.user_id).await?;
    Ok(Json(requests))
}

/// List every request
#[utoipa::path(
    get,
    path = "/admin/requests",
    tag = "requests",
    security(("auth_token" = [])),
    responses(
        (status = 200, description = "All requests, newest first", body = Vec<BookRequestDetails>),
        (status = 403, description = "Caller is not an admin", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_requests(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> AppResult<Json<Vec<BookRequestDetails>>> {
    let requests = state.services.requests.all_requests().await?;
    Ok(Json(requests))
}

/// List pending requests
#[utoipa::path(
    get,
    path = "/admin/requests/pending",
    tag = "requests",
    security(("auth_token" = [])),
    responses(
        (status = 200, description = "Pending requests, oldest first", body = Vec<BookRequestDetails>),
        (status = 403, description = "Caller is not an admin", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_pending_requests(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> AppResult<Json<Vec<BookRequestDetails>>> {
    let requests = state.services.requests.pending_requests().await?;
    Ok(Json(requests))
}

/// Approve a pending request and issue the book
#[utoipa::path(
    put,
    path = "/admin/requests/approve/{id}",
    tag = "requests",
    security(("auth_token" = [])),
    params(
        ("id" = i32, Path, description = "Request ID")
    ),
    request_body(content = ApproveRequest, description = "Optional due date; an empty body uses the default"),
    responses(
        (status = 200, description = "Request approved", body = RequestResponse),
        (status = 400, description = "Already processed, book unavailable or bad due date", body = crate::error::ErrorResponse),
        (status = 404, description = "Request or book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn approve_request(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    AppPath(id): AppPath<i32>,
    OptionalJson(body): OptionalJson<ApproveRequest>,
) -> AppResult<Json<RequestResponse>> {
    let body = body.unwrap_or_default();
    let request = state
        .services
        .requests
        .approve_request(id, body.due_date.as_deref())
        .await?;
    tracing::debug!(request_id = id, admin_id = admin.id, "Approval recorded");
    Ok(Json(RequestResponse::new("Book request approved successfully", request)))
}

/// Reject a pending request
#[utoipa::path(
    put,
    path = "/admin/requests/reject/{id}",
    tag = "requests",
    security(("auth_token" = [])),
    params(
        ("id" = i32, Path, description = "Request ID")
    ),
    responses(
        (status = 200, description = "Request rejected", body = RequestResponse),
        (status = 400, description = "Request already processed", body = crate::error::ErrorResponse),
        (status = 404, description = "Request not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn reject_request(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    AppPath(id): AppPath<i32>,
) -> AppResult<Json<RequestResponse>> {
    let request = state.services.requests.reject_request(id).await?;
    Ok(Json(RequestResponse::new("Book request rejected", request)))
}

/// Record the return of an issued book
#[utoipa::path(
    put,
    path = "/admin/requests/return/{id}",
    tag = "requests",
    security(("auth_token" = [])),
    params(
        ("id" = i32, Path, description = "Request ID")
    ),
    responses(
        (status = 200, description = "Book returned", body = RequestResponse),
        (status = 400, description = "Book not issued or already returned", body = crate::error::ErrorResponse),
        (status = 404, description = "Request not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_book(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    AppPath(id): AppPath<i32>,
) -> AppResult<Json<RequestResponse>> {
    let request = state.services.requests.return_book(id).await?;
    Ok(Json(RequestResponse::new("Book returned successfully", request)))
}

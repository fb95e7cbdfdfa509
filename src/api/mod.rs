//! API handlers for the lending REST endpoints

pub mod auth;
pub mod books;
pub mod health;
pub mod openapi;
pub mod requests;
pub mod stats;
pub mod users;

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, HeaderValue},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::de::DeserializeOwned;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    error::AppError,
    models::user::{User, UserClaims},
    AppState,
};

/// Header carrying the bearer token
pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";

/// Read the token from `x-auth-token`, falling back to `Authorization: Bearer`
pub fn token_from_headers(headers: &HeaderMap) -> Result<&str, AppError> {
    if let Some(token) = headers.get(AUTH_TOKEN_HEADER).and_then(|value| value.to_str().ok()) {
        let token = token.trim();
        if !token.is_empty() {
            return Ok(token);
        }
    }

    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Authentication("No token, authorization denied".to_string()))
}

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = token_from_headers(&parts.headers)?;
        let claims = state.services.auth.verify_token(token)?;
        Ok(AuthenticatedUser(claims))
    }
}

/// Extractor for an authenticated admin, with the role checked against the database
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(claims) = AuthenticatedUser::from_request_parts(parts, state).await?;
        let user = state.services.auth.require_admin(claims.user_id).await?;
        Ok(AdminUser(user))
    }
}

/// JSON body extractor reporting bad input as `AppError`
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Path extractor reporting bad parameters as `AppError`
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

/// JSON body that may be omitted. An empty body gives `None`; anything else
/// must deserialize.
pub struct OptionalJson<T>(pub Option<T>);

#[async_trait]
impl<S, T> FromRequest<S> for OptionalJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(OptionalJson(None));
        }
        let Json(value) = Json::<T>::from_bytes(&bytes)?;
        Ok(OptionalJson(Some(value)))
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = match state
        .config
        .server
        .cors_origin
        .as_deref()
        .and_then(|origin| origin.parse::<HeaderValue>().ok())
    {
        Some(origin) => CorsLayer::new().allow_origin(origin),
        None => CorsLayer::new().allow_origin(Any),
    }
    .allow_methods(Any)
    .allow_headers(Any);

    let admin = Router::new()
        // Users
        .route("/users", get(users::list_users))
        .route("/users", post(users::add_user))
        .route("/users/:id", put(users::update_user))
        .route("/users/:id", delete(users::delete_user))
        // Books
        .route("/books", get(books::list_books_detailed))
        .route("/books", post(books::add_book))
        .route("/books/:id", put(books::update_book))
        .route("/books/:id", delete(books::delete_book))
        // Requests
        .route("/requests", get(requests::list_requests))
        .route("/requests/pending", get(requests::list_pending_requests))
        .route("/requests/approve/:id", put(requests::approve_request))
        .route("/requests/reject/:id", put(requests::reject_request))
        .route("/requests/return/:id", put(requests::return_book))
        // Dashboard
        .route("/statistics", get(stats::get_statistics));

    let api = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Authentication
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/profile", get(auth::get_profile))
        .route("/auth/profile", put(auth::update_profile))
        .route("/auth/admin/register", post(auth::register_admin))
        // Books
        .route("/books", get(books::list_books))
        .route("/books/request", post(requests::request_book))
        .route("/books/user/requests", get(requests::my_requests))
        .route("/books/user/borrowed", get(requests::my_borrowed_books))
        .route("/books/:id", get(books::get_book))
        .nest("/admin", admin)
        .with_state(state);

    Router::new()
        .nest("/api", api)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    use super::{auth::LoginRequest, requests::ApproveRequest};
    use crate::models::user::RegisterUser;

    fn json_request(content_type: Option<&str>, body: &'static str) -> Request {
        let mut builder = axum::http::Request::builder().method("POST").uri("/");
        if let Some(content_type) = content_type {
            builder = builder.header("content-type", content_type);
        }
        builder.body(Body::from(body)).unwrap()
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_token_from_custom_header() {
        let map = headers(&[("x-auth-token", "abc.def.ghi")]);
        assert_eq!(token_from_headers(&map).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_token_from_bearer_fallback() {
        let map = headers(&[("authorization", "Bearer abc.def.ghi")]);
        assert_eq!(token_from_headers(&map).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_custom_header_wins() {
        let map = headers(&[("x-auth-token", "custom"), ("authorization", "Bearer other")]);
        assert_eq!(token_from_headers(&map).unwrap(), "custom");
    }

    #[test]
    fn test_missing_or_malformed_token() {
        assert!(matches!(
            token_from_headers(&HeaderMap::new()),
            Err(AppError::Authentication(_))
        ));
        assert!(token_from_headers(&headers(&[("authorization", "Basic dXNlcjpwYXNz")])).is_err());
        assert!(token_from_headers(&headers(&[("x-auth-token", "  ")])).is_err());
    }

    #[tokio::test]
    async fn test_json_without_content_type_is_a_validation_error() {
        let request = json_request(None, r#"{"username": "a", "email": "a@b.c", "password": "secret"}"#);
        let result = AppJson::<RegisterUser>::from_request(request, &()).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_json_with_wrong_types_is_a_validation_error() {
        let request = json_request(Some("application/json"), r#"{"email": 5}"#);
        let result = AppJson::<LoginRequest>::from_request(request, &()).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_optional_json_accepts_empty_body() {
        let request = json_request(None, "");
        let OptionalJson(body) = OptionalJson::<ApproveRequest>::from_request(request, &())
            .await
            .unwrap();
        assert!(body.is_none());
    }

    #[tokio::test]
    async fn test_optional_json_parses_due_date() {
        let request = json_request(Some("application/json"), r#"{"dueDate": "2024-01-15"}"#);
        let OptionalJson(body) = OptionalJson::<ApproveRequest>::from_request(request, &())
            .await
            .unwrap();
        assert_eq!(body.unwrap().due_date.as_deref(), Some("2024-01-15"));
    }

    #[tokio::test]
    async fn test_optional_json_rejects_malformed_body() {
        for body in [r#"{"dueDate": 15}"#, "{not json"] {
            let request = json_request(Some("application/json"), body);
            let result = OptionalJson::<ApproveRequest>::from_request(request, &()).await;
            assert!(matches!(result, Err(AppError::Validation(_))), "{}", body);
        }
    }
}

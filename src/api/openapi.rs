//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, books, health, requests, stats, users, AUTH_TOKEN_HEADER};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Lending API",
        version = "1.0.0",
        description = "Library book lending REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api", description = "API")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::register,
        auth::login,
        auth::get_profile,
        auth::update_profile,
        auth::register_admin,
        // Books
        books::list_books,
        books::get_book,
        books::list_books_detailed,
        books::add_book,
        books::update_book,
        books::delete_book,
        // Users
        users::list_users,
        users::add_user,
        users::update_user,
        users::delete_user,
        // Requests
        requests::request_book,
        requests::my_requests,
        requests::my_borrowed_books,
        requests::list_requests,
        requests::list_pending_requests,
        requests::approve_request,
        requests::reject_request,
        requests::return_book,
        // Stats
        stats::get_statistics,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            auth::UserResponse,
            auth::ProfileResponse,
            // Users
            crate::models::user::User,
            crate::models::user::UserSummary,
            crate::models::user::Role,
            crate::models::user::RegisterUser,
            crate::models::user::CreateUser,
            crate::models::user::UpdateUser,
            crate::models::user::UpdateProfile,
            // Books
            books::BookResponse,
            crate::models::book::Book,
            crate::models::book::BookDetails,
            crate::models::book::BookSummary,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            // Requests
            requests::CreateBookRequest,
            requests::ApproveRequest,
            requests::RequestResponse,
            crate::models::book_request::BookRequest,
            crate::models::book_request::BookRequestDetails,
            crate::models::book_request::RequestStatus,
            // Stats
            stats::LibraryStatistics,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration, login and profile"),
        (name = "books", description = "Book catalog"),
        (name = "users", description = "User administration"),
        (name = "requests", description = "Borrow requests"),
        (name = "stats", description = "Statistics")
    )
)]
pub struct ApiDoc;

/// Registers the `x-auth-token` header scheme
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "auth_token",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(AUTH_TOKEN_HEADER))),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

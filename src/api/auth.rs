//! Authentication and profile endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::user::{RegisterUser, Role, UpdateProfile, User, UserSummary},
    AppState,
};

use super::{AdminUser, AppJson, AuthenticatedUser};

/// Login request
#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Login response with JWT token
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// JWT access token
    pub token: String,
    /// Token type (always "Bearer")
    pub token_type: String,
    /// Role at login time
    pub role: Role,
    pub user: UserSummary,
}

/// Acknowledgement carrying an account
#[derive(Serialize, ToSchema)]
pub struct UserResponse {
    pub message: String,
    pub user: User,
}

/// Current user's profile
#[derive(Serialize, ToSchema)]
pub struct ProfileResponse {
    pub user: User,
}

/// Register a new user account
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegisterUser,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid input or email taken", body = crate::error::ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    AppJson(request): AppJson<RegisterUser>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let user = state.services.auth.register(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            message: "User registered successfully".to_string(),
            user,
        }),
    ))
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Invalid credentials", body = crate::error::ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    AppJson(request): AppJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let (token, user) = state.services.auth.login(&request.email, &request.password).await?;
    tracing::info!(user_id = user.id, "User logged in");

    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer".to_string(),
        role: user.role,
        user: UserSummary::from(&user),
    }))
}

/// Get current user profile
#[utoipa::path(
    get,
    path = "/auth/profile",
    tag = "auth",
    security(("auth_token" = [])),
    responses(
        (status = 200, description = "Current user", body = ProfileResponse),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<ProfileResponse>> {
    let user = state.services.auth.get_profile(claims.user_id).await?;
    Ok(Json(ProfileResponse { user }))
}

/// Update current user profile
#[utoipa::path(
    put,
    path = "/auth/profile",
    tag = "auth",
    security(("auth_token" = [])),
    request_body = UpdateProfile,
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 400, description = "Invalid input, email taken or wrong current password", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    AppJson(profile): AppJson<UpdateProfile>,
) -> AppResult<Json<UserResponse>> {
    let user = state.services.auth.update_profile(claims.user_id, profile).await?;
    Ok(Json(UserResponse {
        message: "Profile updated successfully".to_string(),
        user,
    }))
}

/// Register a new administrator
#[utoipa::path(
    post,
    path = "/auth/admin/register",
    tag = "auth",
    security(("auth_token" = [])),
    request_body = RegisterUser,
    responses(
        (status = 201, description = "Admin created", body = UserResponse),
        (status = 400, description = "Invalid input or email taken", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = crate::error::ErrorResponse)
    )
)]
pub async fn register_admin(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    AppJson(request): AppJson<RegisterUser>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let user = state.services.auth.register_admin(request).await?;
    tracing::info!(admin_id = admin.id, user_id = user.id, "Admin registered another admin");
    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            message: "Admin registered successfully".to_string(),
            user,
        }),
    ))
}

//! User administration endpoints

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::user::{CreateUser, UpdateUser, User},
    AppState,
};

use super::{auth::UserResponse, AdminUser, AppJson, AppPath};

/// List all users
#[utoipa::path(
    get,
    path = "/admin/users",
    tag = "users",
    security(("auth_token" = [])),
    responses(
        (status = 200, description = "All users", body = Vec<User>),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> AppResult<Json<Vec<User>>> {
    let users = state.services.users.list_users().await?;
    Ok(Json(users))
}

/// Create a user with any role
#[utoipa::path(
    post,
    path = "/admin/users",
    tag = "users",
    security(("auth_token" = [])),
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid input or email taken", body = crate::error::ErrorResponse)
    )
)]
pub async fn add_user(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    AppJson(user): AppJson<CreateUser>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let user = state.services.users.create_user(user).await?;
    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            message: "User created successfully".to_string(),
            user,
        }),
    ))
}

/// Update a user
#[utoipa::path(
    put,
    path = "/admin/users/{id}",
    tag = "users",
    security(("auth_token" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Invalid input or email taken", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    AppPath(id): AppPath<i32>,
    AppJson(update): AppJson<UpdateUser>,
) -> AppResult<Json<UserResponse>> {
    let user = state.services.users.update_user(id, update).await?;
    Ok(Json(UserResponse {
        message: "User updated successfully".to_string(),
        user,
    }))
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/admin/users/{id}",
    tag = "users",
    security(("auth_token" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 204, description = "User deleted"),
        (status = 400, description = "Own account or user still holds books", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    AppPath(id): AppPath<i32>,
) -> AppResult<StatusCode> {
    state.services.users.delete_user(id, admin.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

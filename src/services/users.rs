//! User administration service

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::user::{CreateUser, Role, UpdateUser, User},
    repository::{users::UserChanges, Repository},
};

use super::auth::hash_password;

const EMAIL_TAKEN: &str = "User already exists with this email";

/// Store a new account after checking the email is free
pub(crate) async fn create_account(
    repository: &Repository,
    username: &str,
    email: &str,
    password: &str,
    role: Role,
) -> AppResult<User> {
    if repository.users.email_exists(email, None).await? {
        return Err(AppError::Conflict(EMAIL_TAKEN.to_string()));
    }
    let password_hash = hash_password(password)?;
    repository.users.create(username, email, &password_hash, role).await
}

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
}

impl UsersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list_users(&self) -> AppResult<Vec<User>> {
        self.repository.users.list().await
    }

    /// Create a user with the requested role (default `user`)
    pub async fn create_user(&self, user: CreateUser) -> AppResult<User> {
        user.validate()?;
        let role = user.role.unwrap_or_default();
        let created = create_account(&self.repository, &user.username, &user.email, &user.password, role).await?;
        tracing::info!(user_id = created.id, role = %role, "Admin created account");
        Ok(created)
    }

    /// Update an existing user
    pub async fn update_user(&self, id: i32, user: UpdateUser) -> AppResult<User> {
        user.validate()?;
        self.repository.users.get_by_id(id).await?;

        if let Some(ref email) = user.email {
            if self.repository.users.email_exists(email, Some(id)).await? {
                return Err(AppError::Conflict(EMAIL_TAKEN.to_string()));
            }
        }

        let password_hash = match user.password {
            Some(ref password) => Some(hash_password(password)?),
            None => None,
        };

        let changes = UserChanges {
            username: user.username.as_deref(),
            email: user.email.as_deref(),
            password_hash: password_hash.as_deref(),
            role: user.role,
        };
        self.repository.users.update(id, &changes).await
    }

    /// Delete a user; admins cannot delete themselves and borrowers must
    /// return their books first
    pub async fn delete_user(&self, id: i32, acting_admin_id: i32) -> AppResult<()> {
        if id == acting_admin_id {
            return Err(AppError::Conflict("You cannot delete your own account".to_string()));
        }
        self.repository.users.delete(id).await?;
        tracing::info!(user_id = id, "Deleted user");
        Ok(())
    }
}

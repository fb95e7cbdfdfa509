//! Authentication, profile and access-control service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use validator::Validate;

use crate::{
    config::{AuthConfig, SeedAdminConfig},
    error::{AppError, AppResult},
    models::user::{require_admin, RegisterUser, Role, UpdateProfile, User, UserClaims},
    repository::{users::UserChanges, Repository},
};

use super::users::create_account;

const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Hash a password using Argon2 with a random salt
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Check a password against a stored Argon2 hash
pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Register a regular user
    pub async fn register(&self, user: RegisterUser) -> AppResult<User> {
        self.register_with_role(user, Role::User).await
    }

    /// Register an administrator (caller must already be an admin)
    pub async fn register_admin(&self, user: RegisterUser) -> AppResult<User> {
        self.register_with_role(user, Role::Admin).await
    }

    async fn register_with_role(&self, user: RegisterUser, role: Role) -> AppResult<User> {
        user.validate()?;
        let created = create_account(&self.repository, &user.username, &user.email, &user.password, role).await?;
        tracing::info!(user_id = created.id, role = %role, "Registered account");
        Ok(created)
    }

    /// Check credentials and issue a token.
    ///
    /// Unknown email and wrong password produce the same error.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<(String, User)> {
        let user = self
            .repository
            .users
            .get_by_email(email)
            .await?
            .ok_or_else(|| AppError::InvalidCredentials(INVALID_CREDENTIALS.to_string()))?;

        if !verify_password(password, &user.password)? {
            return Err(AppError::InvalidCredentials(INVALID_CREDENTIALS.to_string()));
        }

        let token = self.create_token(&user)?;
        Ok((token, user))
    }

    /// Create JWT token for a user
    pub fn create_token(&self, user: &User) -> AppResult<String> {
        UserClaims::for_user(user, self.config.jwt_expiration_hours)
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Validate a token and return its claims
    pub fn verify_token(&self, token: &str) -> AppResult<UserClaims> {
        UserClaims::from_token(token, &self.config.jwt_secret)
            .map_err(|_| AppError::Authentication("Token is not valid".to_string()))
    }

    /// Load the account behind a token and make sure it is an admin.
    ///
    /// The stored role is authoritative so role changes apply without a new login.
    pub async fn require_admin(&self, user_id: i32) -> AppResult<User> {
        let user = self
            .repository
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::Authentication("User not found".to_string()))?;
        require_admin(&user)?;
        Ok(user)
    }

    pub async fn get_profile(&self, user_id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(user_id).await
    }

    /// Update own username/email, and password when both current and new are given
    pub async fn update_profile(&self, user_id: i32, profile: UpdateProfile) -> AppResult<User> {
        profile.validate()?;
        let user = self.repository.users.get_by_id(user_id).await?;

        if let Some(ref email) = profile.email {
            if self.repository.users.email_exists(email, Some(user_id)).await? {
                return Err(AppError::Conflict("User already exists with this email".to_string()));
            }
        }

        let password_hash = match (&profile.current_password, &profile.new_password) {
            (Some(current), Some(new)) => {
                if !verify_password(current, &user.password)? {
                    return Err(AppError::InvalidCredentials("Current password is incorrect".to_string()));
                }
                Some(hash_password(new)?)
            }
            _ => None,
        };

        let changes = UserChanges {
            username: profile.username.as_deref(),
            email: profile.email.as_deref(),
            password_hash: password_hash.as_deref(),
            role: None,
        };
        self.repository.users.update(user_id, &changes).await
    }

    /// Create the configured admin account unless its email is already registered.
    ///
    /// Returns whether an account was created. Safe to run on every startup.
    pub async fn ensure_seed_admin(&self, seed: &SeedAdminConfig) -> AppResult<bool> {
        if self.repository.users.get_by_email(&seed.email).await?.is_some() {
            tracing::debug!("Seed admin {} already present", seed.email);
            return Ok(false);
        }

        tracing::info!("Creating seed admin {}", seed.email);
        let password_hash = hash_password(&seed.password)?;
        self.repository
            .users
            .create(&seed.username, &seed.email, &password_hash, Role::Admin)
            .await?;
        Ok(true)
    }
}

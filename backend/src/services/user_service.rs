//! User business logic service.
//!
//! Handles registration, credential checks and account activation.

use crate::api::common::PaginationFilter;
use crate::auth::permissions::Role;
use crate::config::BootstrapAdmin;
use crate::database::is_unique_violation;
use crate::database::models::{CreateNewUser, CreateUser, User};
use crate::errors::{ServiceError, ServiceResult};
use crate::repositories::user_repository::UserRepository;
use sqlx::SqlitePool;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

pub struct UserService<'a> {
    /// Shared database connection pool
    pool: &'a SqlitePool,
    bcrypt_cost: u32,
}

impl<'a> UserService<'a> {
    /// Creates a new UserService instance.
    ///
    /// # Arguments
    /// * `pool` - Reference to SQLite connection pool
    /// * `bcrypt_cost` - Work factor for new password hashes
    pub fn new(pool: &'a SqlitePool, bcrypt_cost: u32) -> Self {
        Self { pool, bcrypt_cost }
    }

    /// Creates a new user with full validation.
    ///
    /// # Errors
    /// Returns `ServiceError` for:
    /// - Validation failures (malformed fields, unknown role)
    /// - Duplicate username or email
    pub async fn create_user(&self, create_user: CreateNewUser) -> ServiceResult<User> {
        if let Err(validation_errors) = create_user.validate() {
            return Err(ServiceError::from_validation_errors(&validation_errors));
        }

        self.validate_business_rules(&create_user)?;
        let role = Role::from_str(&create_user.role)?;

        let repo = UserRepository::new(self.pool);

        if repo.username_exists(&create_user.username).await? {
            return Err(ServiceError::already_exists("User", &create_user.username));
        }
        if repo.email_exists(&create_user.email).await? {
            return Err(ServiceError::already_exists("User", &create_user.email));
        }

        let password_hash = hash_password(create_user.password, self.bcrypt_cost).await?;

        let data = CreateUser {
            id: Uuid::now_v7().to_string(),
            username: create_user.username,
            email: create_user.email,
            role: role.to_string(),
            department: create_user.department,
            shift: create_user.shift,
            password_hash,
        };

        let username = data.username.clone();
        let user = match repo.create_user(data).await {
            Ok(user) => user,
            Err(e) if is_unique_violation(&e) => {
                return Err(ServiceError::already_exists("User", username));
            }
            Err(e) => return Err(e.into()),
        };
        tracing::info!(user_id = %user.id, role = %user.role, "User created");
        Ok(user)
    }

    /// Checks a username/password pair.
    ///
    /// Unknown usernames are compared against `dummy_hash` so every failure
    /// costs one bcrypt verification. Unknown user, wrong password and
    /// inactive account all yield `InvalidCredentials`.
    pub async fn authenticate_user(
        &self,
        username: &str,
        password: &str,
        dummy_hash: &str,
    ) -> ServiceResult<User> {
        let repo = UserRepository::new(self.pool);
        let user = repo.get_user_by_username(username).await?;

        let hash = match &user {
            Some(user) => user.password_hash.clone(),
            None => dummy_hash.to_string(),
        };
        let matches = verify_password(password.to_string(), hash).await?;

        match user {
            Some(user) if matches && user.is_active => Ok(user),
            Some(user) if matches => {
                tracing::warn!(user_id = %user.id, "Login attempt on inactive account");
                Err(ServiceError::InvalidCredentials)
            }
            _ => {
                tracing::warn!(username, "Failed login attempt");
                Err(ServiceError::InvalidCredentials)
            }
        }
    }

    /// Retrieves a user by ID with existence verification.
    ///
    /// # Errors
    /// Returns `ServiceError::NotFound` if user doesn't exist
    pub async fn get_user_required(&self, id: &str) -> ServiceResult<User> {
        let repo = UserRepository::new(self.pool);
        let user = repo
            .get_user_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", id))?;
        Ok(user)
    }

    pub async fn list_users(&self, pagination: &PaginationFilter) -> ServiceResult<(Vec<User>, u64)> {
        let repo = UserRepository::new(self.pool);
        let users = repo.list_users(pagination).await?;
        let total = repo.count_users().await?;
        Ok((users, total))
    }

    /// Activates or deactivates an account. Users cannot deactivate themselves.
    pub async fn set_active(&self, actor_id: &str, id: &str, is_active: bool) -> ServiceResult<User> {
        if !is_active && actor_id == id {
            return Err(ServiceError::invalid_operation(
                "Users cannot deactivate their own account",
            ));
        }

        let repo = UserRepository::new(self.pool);
        let user = repo
            .set_active(id, is_active)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", id))?;

        tracing::info!(user_id = %user.id, is_active, "User activation changed");
        Ok(user)
    }

    /// Creates the configured first administrator when no users exist yet.
    ///
    /// # Returns
    /// `true` if an administrator was created
    pub async fn ensure_bootstrap_admin(&self, admin: &BootstrapAdmin) -> ServiceResult<bool> {
        let repo = UserRepository::new(self.pool);
        if repo.count_users().await? > 0 {
            return Ok(false);
        }

        self.create_user(CreateNewUser {
            username: admin.username.clone(),
            email: admin.email.clone(),
            password: admin.password.clone(),
            role: Role::Admin.to_string(),
            department: None,
            shift: None,
        })
        .await?;

        Ok(true)
    }

    /// Business validation rules.
    fn validate_business_rules(&self, create_user: &CreateNewUser) -> ServiceResult<()> {
        let valid_chars = create_user
            .username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-');
        let starts_with_letter = create_user
            .username
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic());

        if !valid_chars || !starts_with_letter {
            return Err(ServiceError::validation(
                "username: must start with a letter and contain only letters, digits, '.', '_' or '-'",
            ));
        }

        Ok(())
    }
}

/// Hashes a password on the blocking pool.
pub async fn hash_password(password: String, cost: u32) -> ServiceResult<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| ServiceError::internal_error(format!("Password hashing task failed: {}", e)))?
        .map_err(|e| ServiceError::internal_error(format!("Password hashing failed: {}", e)))
}

/// Verifies a password against a stored hash on the blocking pool.
async fn verify_password(password: String, hash: String) -> ServiceResult<bool> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| ServiceError::internal_error(format!("Password verification task failed: {}", e)))?
        .map_err(|e| ServiceError::internal_error(format!("Password verification failed: {}", e)))
}

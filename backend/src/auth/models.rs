//! Data structures for authentication-related entities.
//!
//! This module defines the login payloads, the user view returned to clients
//! and the session material produced by a successful login.

use crate::auth::permissions::Role;
use crate::database::models::User;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use validator::Validate;

/// Login request payload
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Login response body. The session token itself only travels in the
/// httpOnly cookie.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: UserInfo,
    pub csrf_token: String,
    pub expires_in: u64, // Token expiration in seconds
}

/// User information returned to clients
#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: String,
    pub department: Option<String>,
    pub shift: Option<String>,
    pub is_active: bool,
    pub permissions: Vec<String>,
}

/// Everything a successful login produces.
#[derive(Debug)]
pub struct LoginOutcome {
    pub user: UserInfo,
    pub session_token: String,
    pub csrf_token: String,
    pub expires_in: u64,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        let permissions = Role::from_str(&user.role)
            .map(|role| role.permissions().iter().map(|p| p.to_string()).collect())
            .unwrap_or_default();

        UserInfo {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
            department: user.department.clone(),
            shift: user.shift.clone(),
            is_active: user.is_active,
            permissions,
        }
    }
}

//! Rust structs that represent database table mappings.
//!
//! These models define the structure of data as it is stored in and retrieved
//! from the database. Note that these may differ from API-specific models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A factory-control user. The role string maps to a fixed permission set.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: String,
    pub department: Option<String>,
    pub shift: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registration payload for a new user.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateNewUser {
    #[validate(length(
        min = 3,
        max = 50,
        message = "Username must be between 3-50 characters"
    ))]
    pub username: String,

    #[validate(
        email(message = "Must be a valid email"),
        length(max = 255, message = "Email too long")
    )]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(length(min = 1, message = "Role is required"))]
    pub role: String,

    #[validate(length(max = 100, message = "Department too long"))]
    pub department: Option<String>,

    #[validate(length(max = 100, message = "Shift too long"))]
    pub shift: Option<String>,
}

/// Insert DTO with the password already hashed.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: String,
    pub department: Option<String>,
    pub shift: Option<String>,
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InventoryItem {
    pub id: String,
    pub sku: String,
    pub name: String,
    pub quantity: i64,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateInventoryItem {
    #[validate(length(min = 1, max = 64, message = "SKU must be between 1-64 characters"))]
    pub sku: String,

    #[validate(length(
        min = 1,
        max = 255,
        message = "Name must be between 1-255 characters"
    ))]
    pub name: String,

    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: i64,

    #[validate(length(max = 100, message = "Location too long"))]
    pub location: Option<String>,
}

/// Signed stock movement applied to an inventory item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustQuantity {
    pub delta: i64,
}

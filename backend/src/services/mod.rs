//! Business logic services sitting between handlers and repositories.

pub mod inventory_service;
pub mod rate_limiter;
pub mod user_service;

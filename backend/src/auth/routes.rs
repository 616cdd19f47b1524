//! Defines the HTTP routes specifically for authentication.
//!
//! Login is public; everything else requires a verified session and is
//! mounted behind the CSRF and token middleware by `app::app_router`.

use crate::auth::handlers::*;
use axum::{
    Router,
    routing::{get, post},
};

/// Routes reachable without a session
pub fn public_auth_router() -> Router {
    Router::new().route("/auth/login", post(login))
}

/// Routes that require a verified session token
pub fn session_router() -> Router {
    Router::new()
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .route("/auth/register", post(register))
}

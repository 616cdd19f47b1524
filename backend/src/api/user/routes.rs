//! Defines the HTTP routes for user administration.
//!
//! Creating users goes through `/auth/register`; these routes cover lookup
//! and account activation.

use super::handlers::{activate_user, deactivate_user, get_user_by_id, list_users};
use axum::{
    Router,
    routing::{get, post},
};

pub fn user_router() -> Router {
    Router::new()
        .route("/", get(list_users))
        .route("/{id}", get(get_user_by_id))
        .route("/{id}/activate", post(activate_user))
        .route("/{id}/deactivate", post(deactivate_user))
}

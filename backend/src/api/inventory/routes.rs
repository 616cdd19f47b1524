//! Defines the HTTP routes for inventory management.

use super::handlers::{adjust_quantity, create_item, delete_item, list_items};
use axum::{
    Router,
    routing::{delete, get, put},
};

pub fn inventory_router() -> Router {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route("/{id}", delete(delete_item))
        .route("/{id}/quantity", put(adjust_quantity))
}

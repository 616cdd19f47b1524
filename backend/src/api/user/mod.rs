//! Module for user administration API endpoints.

pub mod handlers;
pub mod routes;

//! Module for inventory API endpoints.
//!
//! Stock items are the main resource operators and supervisors mutate, and
//! each endpoint declares the permission it needs.

pub mod handlers;
pub mod routes;

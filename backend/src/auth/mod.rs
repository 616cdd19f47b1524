//! Authentication module for sessions and access control.
//!
//! This module provides login/logout, session token and CSRF handling,
//! the request pipeline middleware and the role → permission table.

pub mod handlers;
pub mod middleware;
pub mod models;
pub mod permissions;
pub mod routes;
pub mod service;

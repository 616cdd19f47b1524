//! Collection of general utility functions.
//!
//! Token handling (session JWTs and CSRF tokens) and cookie plumbing shared by
//! the auth handlers and the request pipeline middleware.

pub mod cookies;
pub mod csrf;
pub mod jwt;

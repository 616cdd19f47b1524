//! Central module for organizing the application's API endpoints.
//!
//! Authentication routes live in `auth`; this module holds the protected
//! resources and the shared response types.

pub mod common;
pub mod inventory;
pub mod user;

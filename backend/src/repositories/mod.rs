//! Persistence layer: one repository per table.

pub mod inventory_repository;
pub mod user_repository;

//! Database module: view models and SQL repositories.
//!
//! This module is split into two submodules:
//! - `model`: read-side views assembled from joins.
//! - `repo`: SQL-only functions that map rows into entities.
//!
//! Callers import from `trainer_bot::db`; the repository API is re-exported here.

pub mod model;
pub mod repo;

pub use repo::*;

pub use model::CatalogEntry;

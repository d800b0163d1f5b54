//! View models returned by repositories.
//!
//! Keep these structs focused on the data returned by queries. Business logic
//! should live in higher layers.

use serde::Serialize;

/// An exercise together with the name of its muscle group, if any.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: i64,
    pub name: String,
    pub muscle_group: Option<i64>,
    pub muscle_group_name: Option<String>,
    pub video: String,
    pub description: String,
}

//! Database module: row models, schema bootstrap and SQL repositories.
//!
//! - `model`: row structs returned by queries.
//! - `repo`: SQL-only functions that map rows into domain values.
//! - `schema`: table creation for an empty store.
//!
//! The repository API is re-exported at `crate::db::*`.

pub mod model;
pub mod repo;
pub mod schema;

pub use repo::*;
pub use schema::create_tables;

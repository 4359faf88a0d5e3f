//! Data access for users, points of interest, their categories and per-user
//! favorites, with write-through caching of external search results.

pub mod config;
pub mod credentials;
pub mod db;
pub mod error;
pub mod gateway;
pub mod model;
pub mod search;

pub use error::GatewayError;
pub use gateway::Gateway;
pub use model::{Item, User};
pub use search::SearchProvider;

//! Table definitions for a fresh store.
//!
//! This only creates missing tables; existing tables are left untouched.

use super::Pool;
use anyhow::{Context, Result};
use tracing::info;

const SCHEMA_USERS: &str = "CREATE TABLE IF NOT EXISTS users (
    user_id TEXT PRIMARY KEY NOT NULL,
    password TEXT NOT NULL,
    first_name TEXT,
    last_name TEXT
)";
const SCHEMA_ITEMS: &str = "CREATE TABLE IF NOT EXISTS items (
    item_id TEXT PRIMARY KEY NOT NULL,
    name TEXT,
    rating REAL,
    address TEXT,
    image_url TEXT,
    url TEXT,
    distance REAL
)";
const SCHEMA_CATEGORIES: &str = "CREATE TABLE IF NOT EXISTS categories (
    item_id TEXT NOT NULL,
    category TEXT NOT NULL,
    PRIMARY KEY (item_id, category),
    FOREIGN KEY (item_id) REFERENCES items(item_id)
)";
const SCHEMA_HISTORY: &str = "CREATE TABLE IF NOT EXISTS history (
    user_id TEXT NOT NULL,
    item_id TEXT NOT NULL,
    PRIMARY KEY (user_id, item_id),
    FOREIGN KEY (user_id) REFERENCES users(user_id),
    FOREIGN KEY (item_id) REFERENCES items(item_id)
)";

pub async fn create_tables(pool: &Pool) -> Result<()> {
    // Referenced tables first.
    for (table, ddl) in [
        ("users", SCHEMA_USERS),
        ("items", SCHEMA_ITEMS),
        ("categories", SCHEMA_CATEGORIES),
        ("history", SCHEMA_HISTORY),
    ] {
        sqlx::query(ddl)
            .execute(pool)
            .await
            .with_context(|| format!("failed to create table {table}"))?;
    }
    info!("schema ready");
    Ok(())
}

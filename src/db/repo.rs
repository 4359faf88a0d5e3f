use super::model::ItemRow;
use crate::model::{Item, User};
use anyhow::{Context, Result};
use futures::TryStreamExt;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::instrument;

pub type Pool = SqlitePool;

/// How long a call may wait for the shared connection. Long enough that
/// callers simply queue behind one another.
pub const ACQUIRE_WAIT: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Open the single connection a gateway works through.
///
/// The pool is capped at one connection that is never recycled, so an
/// in-memory database lives exactly as long as the pool does.
pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let options = SqliteConnectOptions::from_str(&normalized)
        .with_context(|| format!("invalid database url {normalized}"))?
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .acquire_timeout(ACQUIRE_WAIT)
        .connect_with(options)
        .await
        .with_context(|| format!("failed to connect to {normalized}"))?;
    Ok(pool)
}

/// Expand a leading `~/` in file-backed SQLite URLs and make sure the parent
/// directory exists. In-memory and non-sqlite URLs are returned unchanged.
fn prepare_sqlite_url(url: &str) -> String {
    let Some(rest) = url.strip_prefix("sqlite:") else {
        return url.to_string();
    };
    if rest.starts_with(":memory") {
        return url.to_string();
    }

    let rest = rest.strip_prefix("//").unwrap_or(rest);
    let (path, query) = match rest.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (rest, None),
    };
    if path.is_empty() {
        return url.to_string();
    }

    let path = match (path.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(tail), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), tail),
        _ => path.to_string(),
    };

    if let Some(parent) = Path::new(&path).parent() {
        if !parent.as_os_str().is_empty() {
            // A failure here surfaces as a connect error.
            let _ = std::fs::create_dir_all(parent);
        }
    }

    match query {
        Some(q) => format!("sqlite://{path}?{q}"),
        None => format!("sqlite://{path}"),
    }
}

/// Insert `(user_id, item_id)` favorites, skipping pairs that already exist
/// and ids with no matching user or item row.
#[instrument(skip_all)]
pub async fn insert_favorites(pool: &Pool, user_id: &str, item_ids: &[String]) -> Result<()> {
    for item_id in item_ids {
        sqlx::query(
            "INSERT OR IGNORE INTO history (user_id, item_id) SELECT ?1, ?2 \
             WHERE EXISTS (SELECT 1 FROM users WHERE user_id = ?1) \
             AND EXISTS (SELECT 1 FROM items WHERE item_id = ?2)",
        )
        .bind(user_id)
        .bind(item_id)
        .execute(pool)
        .await
        .with_context(|| format!("failed to favorite item {item_id}"))?;
    }
    Ok(())
}

#[instrument(skip_all)]
pub async fn delete_favorites(pool: &Pool, user_id: &str, item_ids: &[String]) -> Result<()> {
    for item_id in item_ids {
        sqlx::query("DELETE FROM history WHERE user_id = ? AND item_id = ?")
            .bind(user_id)
            .bind(item_id)
            .execute(pool)
            .await
            .with_context(|| format!("failed to unfavorite item {item_id}"))?;
    }
    Ok(())
}

#[instrument(skip_all)]
pub async fn favorite_item_ids(pool: &Pool, user_id: &str) -> Result<HashSet<String>> {
    let ids: Vec<String> = sqlx::query_scalar("SELECT item_id FROM history WHERE user_id = ?")
        .bind(user_id)
        .fetch_all(pool)
        .await?;
    Ok(ids.into_iter().collect())
}

#[instrument(skip_all)]
pub async fn fetch_item_row(pool: &Pool, item_id: &str) -> Result<Option<ItemRow>> {
    let row = sqlx::query_as::<_, ItemRow>(
        "SELECT item_id, name, rating, address, image_url, url, distance FROM items WHERE item_id = ?",
    )
    .bind(item_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

#[instrument(skip_all)]
pub async fn categories(pool: &Pool, item_id: &str) -> Result<BTreeSet<String>> {
    let mut rows = sqlx::query("SELECT category FROM categories WHERE item_id = ?")
        .bind(item_id)
        .fetch(pool);
    let mut categories = BTreeSet::new();
    while let Some(row) = rows.try_next().await? {
        categories.insert(row.try_get::<String, _>("category")?);
    }
    Ok(categories)
}

/// Insert the item row if its id is new, then add any categories it does
/// not already carry. Existing rows are never rewritten.
#[instrument(skip_all)]
pub async fn insert_item(pool: &Pool, item: &Item) -> Result<()> {
    sqlx::query(
        "INSERT OR IGNORE INTO items (item_id, name, rating, address, image_url, url, distance) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&item.item_id)
    .bind(&item.name)
    .bind(item.rating)
    .bind(&item.address)
    .bind(&item.image_url)
    .bind(&item.url)
    .bind(item.distance)
    .execute(pool)
    .await
    .with_context(|| format!("failed to insert item {}", item.item_id))?;

    for category in &item.categories {
        sqlx::query("INSERT OR IGNORE INTO categories (item_id, category) VALUES (?, ?)")
            .bind(&item.item_id)
            .bind(category)
            .execute(pool)
            .await
            .with_context(|| format!("failed to tag item {} as {}", item.item_id, category))?;
    }
    Ok(())
}

#[instrument(skip_all)]
pub async fn fetch_user(pool: &Pool, user_id: &str) -> Result<Option<User>> {
    let row = sqlx::query("SELECT user_id, first_name, last_name FROM users WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    let Some(row) = row else {
        return Ok(None);
    };
    Ok(Some(User {
        user_id: row.try_get("user_id")?,
        first_name: row
            .try_get::<Option<String>, _>("first_name")?
            .unwrap_or_default(),
        last_name: row
            .try_get::<Option<String>, _>("last_name")?
            .unwrap_or_default(),
    }))
}

#[instrument(skip_all)]
pub async fn fetch_password(pool: &Pool, user_id: &str) -> Result<Option<String>> {
    let password = sqlx::query_scalar::<_, String>("SELECT password FROM users WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(password)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::create_tables;

    async fn setup_pool() -> Pool {
        let pool = init_pool("sqlite::memory:").await.unwrap();
        create_tables(&pool).await.unwrap();
        pool
    }

    async fn add_user(pool: &Pool, user_id: &str, password: &str, first: &str, last: &str) {
        sqlx::query(
            "INSERT INTO users (user_id, password, first_name, last_name) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(password)
        .bind(first)
        .bind(last)
        .execute(pool)
        .await
        .unwrap();
    }

    #[test]
    fn prepare_url_passes_memory_through() {
        assert_eq!(prepare_sqlite_url("sqlite::memory:"), "sqlite::memory:");
        assert_eq!(
            prepare_sqlite_url("sqlite::memory:?cache=shared"),
            "sqlite::memory:?cache=shared"
        );
    }

    #[test]
    fn prepare_url_creates_parent_and_keeps_query() {
        let td = tempfile::tempdir().unwrap();
        let db_path = td.path().join("nested").join("places.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        let prepared = prepare_sqlite_url(&url);
        assert_eq!(prepared, url);
        assert!(db_path.parent().unwrap().exists());
    }

    #[tokio::test]
    async fn item_row_round_trips_with_categories() {
        let pool = setup_pool().await;
        let item = Item {
            item_id: "x1".into(),
            name: "Jazz Night".into(),
            address: "1 Main St".into(),
            image_url: "https://img/x1.jpg".into(),
            url: "https://events/x1".into(),
            distance: 2.5,
            rating: 4.0,
            categories: ["Music".to_string()].into_iter().collect(),
        };
        insert_item(&pool, &item).await.unwrap();

        let row = fetch_item_row(&pool, "x1").await.unwrap().unwrap();
        let cats = categories(&pool, "x1").await.unwrap();
        assert_eq!(row.into_item(cats), item);
        assert!(fetch_item_row(&pool, "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn insert_item_keeps_first_row_values() {
        let pool = setup_pool().await;
        insert_item(&pool, &Item::new("x1").with_name("first"))
            .await
            .unwrap();
        insert_item(&pool, &Item::new("x1").with_name("second"))
            .await
            .unwrap();
        let row = fetch_item_row(&pool, "x1").await.unwrap().unwrap();
        assert_eq!(row.name.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn favorites_insert_is_idempotent_and_delete_tolerates_missing() {
        let pool = setup_pool().await;
        add_user(&pool, "alice", "secret", "Alice", "Smith").await;
        insert_item(&pool, &Item::new("x1")).await.unwrap();

        let ids = vec!["x1".to_string()];
        insert_favorites(&pool, "alice", &ids).await.unwrap();
        insert_favorites(&pool, "alice", &ids).await.unwrap();
        assert_eq!(favorite_item_ids(&pool, "alice").await.unwrap().len(), 1);

        delete_favorites(&pool, "alice", &ids).await.unwrap();
        delete_favorites(&pool, "alice", &ids).await.unwrap();
        assert!(favorite_item_ids(&pool, "alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn favorite_skips_unknown_ids_and_keeps_going() {
        let pool = setup_pool().await;
        add_user(&pool, "alice", "secret", "Alice", "Smith").await;
        insert_item(&pool, &Item::new("x1")).await.unwrap();

        let ids = vec!["ghost".to_string(), "x1".to_string()];
        insert_favorites(&pool, "alice", &ids).await.unwrap();
        assert_eq!(
            favorite_item_ids(&pool, "alice").await.unwrap(),
            HashSet::from(["x1".to_string()])
        );

        insert_favorites(&pool, "nobody", &["x1".to_string()])
            .await
            .unwrap();
        assert!(favorite_item_ids(&pool, "nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn pool_waits_for_its_single_connection() {
        let pool = setup_pool().await;
        assert_eq!(pool.options().get_max_connections(), 1);
        assert_eq!(pool.options().get_acquire_timeout(), ACQUIRE_WAIT);
    }

    #[tokio::test]
    async fn user_lookups() {
        let pool = setup_pool().await;
        add_user(&pool, "bob", "pw", "Bob", "Lee").await;

        let user = fetch_user(&pool, "bob").await.unwrap().unwrap();
        assert_eq!(user.full_name(), "Bob Lee");
        assert!(fetch_user(&pool, "ghost").await.unwrap().is_none());

        assert_eq!(
            fetch_password(&pool, "bob").await.unwrap().as_deref(),
            Some("pw")
        );
        assert!(fetch_password(&pool, "ghost").await.unwrap().is_none());
    }
}

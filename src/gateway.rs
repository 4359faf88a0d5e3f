//! The data access gateway.
//!
//! A `Gateway` holds at most one database connection for its lifetime. When
//! that connection could not be opened (or has been closed) the gateway is
//! *degraded*: reads return empty values and writes do nothing, but nothing
//! fails past this boundary. Local store failures are treated the same way.
//! The one exception is `search_items`, where a provider failure is returned
//! to the caller.
//!
//! The single connection is shared behind a pool handle, so concurrent calls
//! on one gateway queue for it. Callers that need parallel access should open
//! separate gateways.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use crate::credentials::{CredentialVerifier, PlaintextVerifier};
use crate::db::{self, Pool};
use crate::error::GatewayError;
use crate::model::Item;
use crate::search::SearchProvider;

pub struct Gateway {
    pool: Option<Pool>,
    provider: Arc<dyn SearchProvider>,
    verifier: Arc<dyn CredentialVerifier>,
}

impl fmt::Debug for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gateway")
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

impl Gateway {
    /// Open the connection to `database_url`. Never fails: if the store is
    /// unreachable the error is logged and a degraded gateway is returned.
    pub async fn connect(database_url: &str, provider: Arc<dyn SearchProvider>) -> Self {
        match db::init_pool(database_url).await {
            Ok(pool) => {
                info!("database connection established");
                Self::with_pool(pool, provider)
            }
            Err(err) => {
                error!(?err, "DB connection failed; gateway is degraded");
                Self::disconnected(provider)
            }
        }
    }

    pub fn with_pool(pool: Pool, provider: Arc<dyn SearchProvider>) -> Self {
        Self {
            pool: Some(pool),
            provider,
            verifier: Arc::new(PlaintextVerifier),
        }
    }

    pub fn disconnected(provider: Arc<dyn SearchProvider>) -> Self {
        Self {
            pool: None,
            provider,
            verifier: Arc::new(PlaintextVerifier),
        }
    }

    /// Replace the password check used by `verify_login`.
    pub fn with_verifier(mut self, verifier: Arc<dyn CredentialVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn is_connected(&self) -> bool {
        self.pool.is_some()
    }

    pub fn pool(&self) -> Option<&Pool> {
        self.pool.as_ref()
    }

    /// Release the connection. The gateway stays degraded afterwards.
    pub async fn close(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.close().await;
            info!("database connection closed");
        }
    }

    fn conn(&self) -> Option<&Pool> {
        if self.pool.is_none() {
            error!("DB connection failed");
        }
        self.pool.as_ref()
    }

    #[instrument(skip(self, item_ids))]
    pub async fn set_favorite_items(&self, user_id: &str, item_ids: &[String]) {
        let Some(pool) = self.conn() else {
            return;
        };
        if let Err(err) = db::insert_favorites(pool, user_id, item_ids).await {
            warn!(?err, "failed to set favorite items");
        }
    }

    #[instrument(skip(self, item_ids))]
    pub async fn unset_favorite_items(&self, user_id: &str, item_ids: &[String]) {
        let Some(pool) = self.conn() else {
            return;
        };
        if let Err(err) = db::delete_favorites(pool, user_id, item_ids).await {
            warn!(?err, "failed to unset favorite items");
        }
    }

    #[instrument(skip(self))]
    pub async fn get_favorite_item_ids(&self, user_id: &str) -> HashSet<String> {
        let Some(pool) = self.conn() else {
            return HashSet::new();
        };
        db::favorite_item_ids(pool, user_id)
            .await
            .unwrap_or_else(|err| {
                warn!(?err, "failed to read favorite item ids");
                HashSet::new()
            })
    }

    /// Every favorited item that still has a row, each with its categories.
    #[instrument(skip(self))]
    pub async fn get_favorite_items(&self, user_id: &str) -> HashSet<Item> {
        let Some(pool) = self.conn() else {
            return HashSet::new();
        };
        let mut items = HashSet::new();
        for item_id in self.get_favorite_item_ids(user_id).await {
            if let Some(item) = load_item(pool, &item_id).await {
                items.insert(item);
            }
        }
        items
    }

    /// A single stored item with its categories, if present.
    #[instrument(skip(self))]
    pub async fn get_item(&self, item_id: &str) -> Option<Item> {
        load_item(self.conn()?, item_id).await
    }

    /// Categories tagged to `item_id`. Unlike the other reads, a missing
    /// connection or a failed query is reported rather than returned as an
    /// empty set, so "no categories" stays distinguishable.
    #[instrument(skip(self))]
    pub async fn get_categories(&self, item_id: &str) -> Result<BTreeSet<String>, GatewayError> {
        let pool = self.conn().ok_or(GatewayError::Disconnected)?;
        db::categories(pool, item_id)
            .await
            .map_err(GatewayError::Database)
    }

    /// Ask the provider, store every result, and return them in the
    /// provider's order.
    #[instrument(skip(self))]
    pub async fn search_items(
        &self,
        lat: f64,
        lon: f64,
        term: &str,
    ) -> Result<Vec<Item>, GatewayError> {
        let items = self
            .provider
            .search(lat, lon, term)
            .await
            .map_err(GatewayError::Search)?;
        // One connection check for the whole batch.
        if let Some(pool) = self.conn() {
            for item in &items {
                if let Err(err) = db::insert_item(pool, item).await {
                    warn!(?err, item_id = %item.item_id, "failed to save search result");
                }
            }
            info!(count = items.len(), "search results persisted");
        }
        Ok(items)
    }

    #[instrument(skip_all, fields(item_id = %item.item_id))]
    pub async fn save_item(&self, item: &Item) {
        let Some(pool) = self.conn() else {
            return;
        };
        if let Err(err) = db::insert_item(pool, item).await {
            warn!(?err, "failed to save item");
        }
    }

    /// `"First Last"` for a known user, otherwise an empty string.
    #[instrument(skip(self))]
    pub async fn get_fullname(&self, user_id: &str) -> String {
        let Some(pool) = self.conn() else {
            return String::new();
        };
        match db::fetch_user(pool, user_id).await {
            Ok(Some(user)) => user.full_name(),
            Ok(None) => String::new(),
            Err(err) => {
                warn!(?err, "failed to read user name");
                String::new()
            }
        }
    }

    #[instrument(skip(self, password))]
    pub async fn verify_login(&self, user_id: &str, password: &str) -> bool {
        let Some(pool) = self.conn() else {
            return false;
        };
        match db::fetch_password(pool, user_id).await {
            Ok(Some(stored)) => self.verifier.verify(&stored, password),
            Ok(None) => false,
            Err(err) => {
                warn!(?err, "failed to verify login");
                false
            }
        }
    }
}

async fn load_item(pool: &Pool, item_id: &str) -> Option<Item> {
    let row = match db::fetch_item_row(pool, item_id).await {
        Ok(row) => row?,
        Err(err) => {
            warn!(?err, item_id, "failed to read item");
            return None;
        }
    };
    match db::categories(pool, item_id).await {
        Ok(categories) => Some(row.into_item(categories)),
        Err(err) => {
            warn!(?err, item_id, "failed to read item categories");
            None
        }
    }
}

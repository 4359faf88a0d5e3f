use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use std::fmt;
use tracing::{info, warn};

use crate::config::Config;
use crate::model::Item;
use crate::search::model::EventsResponse;

pub mod model;

const TICKETMASTER_API_BASE: &str = "https://app.ticketmaster.com/";
const EVENTS_PATH: &str = "discovery/v2/events.json";
pub const DEFAULT_RADIUS: u32 = 50;

/// Source of items for a location and free-text term, ranked by the provider.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, lat: f64, lon: f64, term: &str) -> Result<Vec<Item>>;
}

#[derive(Clone)]
pub struct TicketMasterClient {
    http: Client,
    base_url: Url,
    api_key: String,
    radius: u32,
}

impl fmt::Debug for TicketMasterClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TicketMasterClient")
            .field("base_url", &self.base_url)
            .field("radius", &self.radius)
            .finish_non_exhaustive()
    }
}

impl TicketMasterClient {
    pub fn new(api_key: String) -> Result<Self> {
        let base_url = Url::parse(TICKETMASTER_API_BASE).context("invalid default API URL")?;
        Self::with_base_url(api_key, DEFAULT_RADIUS, base_url)
    }

    pub fn with_base_url(api_key: String, radius: u32, base_url: Url) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("placekeeper/", env!("CARGO_PKG_VERSION")))
            .no_proxy()
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url,
            api_key,
            radius,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let base_url = Url::parse(&cfg.search.base_url)
            .with_context(|| format!("invalid search.base_url {}", cfg.search.base_url))?;
        Self::with_base_url(cfg.search.api_key.clone(), cfg.search.radius, base_url)
    }

    pub fn build_request(&self, lat: f64, lon: f64, term: &str) -> Result<reqwest::Request> {
        let endpoint = self
            .base_url
            .join(EVENTS_PATH)
            .context("invalid search base URL")?;
        let mut query = vec![
            ("apikey", self.api_key.clone()),
            ("latlong", format!("{lat},{lon}")),
            ("radius", self.radius.to_string()),
        ];
        let term = term.trim();
        if !term.is_empty() {
            query.push(("keyword", term.to_string()));
        }
        self.http
            .get(endpoint)
            .header("Accept", "application/json")
            .query(&query)
            .build()
            .context("failed to build search request")
    }

    async fn execute_search(&self, request: reqwest::Request) -> Result<Vec<Item>> {
        let res = self
            .http
            .execute(request)
            .await
            .context("failed to reach search provider")?;

        let status = res.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let body = res.text().await.unwrap_or_default();
            warn!("rate limited by search provider: {}", body);
            return Err(anyhow!("received 429 from search provider: {}", body));
        }
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            warn!(%status, "search provider error: {}", body);
            return Err(anyhow!("search provider error {}: {}", status, body));
        }

        let body = res
            .text()
            .await
            .context("failed to read search response")?;
        let items = parse_events(&body)?;
        info!(count = items.len(), "search provider returned items");
        Ok(items)
    }
}

#[async_trait]
impl SearchProvider for TicketMasterClient {
    async fn search(&self, lat: f64, lon: f64, term: &str) -> Result<Vec<Item>> {
        let request = self.build_request(lat, lon, term)?;
        self.execute_search(request).await
    }
}

/// Decode a discovery response body, keeping the provider's order.
pub fn parse_events(body: &str) -> Result<Vec<Item>> {
    let payload: EventsResponse =
        serde_json::from_str(body).context("invalid search response JSON")?;
    Ok(payload.into_items())
}

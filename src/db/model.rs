//! Row shapes returned by repository queries.
//!
//! Columns are nullable in the schema, so every field is optional here and
//! defaults are applied when rows are turned into domain values.

use crate::model::Item;
use std::collections::BTreeSet;

/// One row of `items`, before its categories are attached.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ItemRow {
    pub item_id: String,
    pub name: Option<String>,
    pub rating: Option<f64>,
    pub address: Option<String>,
    pub image_url: Option<String>,
    pub url: Option<String>,
    pub distance: Option<f64>,
}

impl ItemRow {
    pub fn into_item(self, categories: BTreeSet<String>) -> Item {
        Item {
            item_id: self.item_id,
            name: self.name.unwrap_or_default(),
            address: self.address.unwrap_or_default(),
            image_url: self.image_url.unwrap_or_default(),
            url: self.url.unwrap_or_default(),
            distance: self.distance.unwrap_or_default(),
            rating: self.rating.unwrap_or_default(),
            categories,
        }
    }
}

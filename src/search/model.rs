//! Response shapes of the event discovery API.

use crate::model::Item;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct EventsResponse {
    #[serde(rename = "_embedded")]
    pub embedded: Option<EmbeddedEvents>,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddedEvents {
    #[serde(default)]
    pub events: Vec<Event>,
}

#[derive(Debug, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    pub distance: Option<f64>,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub classifications: Vec<Classification>,
    #[serde(rename = "_embedded")]
    pub embedded: Option<EmbeddedVenues>,
}

#[derive(Debug, Deserialize)]
pub struct Image {
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Classification {
    pub segment: Option<Segment>,
}

#[derive(Debug, Deserialize)]
pub struct Segment {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddedVenues {
    #[serde(default)]
    pub venues: Vec<Venue>,
}

#[derive(Debug, Deserialize)]
pub struct Venue {
    pub address: Option<Address>,
    pub city: Option<City>,
}

#[derive(Debug, Deserialize)]
pub struct Address {
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub line3: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct City {
    pub name: Option<String>,
}

impl Venue {
    fn display_address(&self) -> String {
        let lines = self
            .address
            .iter()
            .flat_map(|a| [&a.line1, &a.line2, &a.line3]);
        let city = self.city.iter().map(|c| &c.name);
        lines
            .chain(city)
            .filter_map(|part| part.as_deref())
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Event {
    /// The provider carries no rating, so items come back unrated.
    pub fn into_item(self) -> Item {
        let address = self
            .embedded
            .iter()
            .flat_map(|e| e.venues.iter())
            .map(Venue::display_address)
            .find(|a| !a.is_empty())
            .unwrap_or_default();
        let image_url = self
            .images
            .iter()
            .find_map(|i| i.url.clone())
            .unwrap_or_default();
        let categories = self
            .classifications
            .into_iter()
            .filter_map(|c| c.segment.and_then(|s| s.name))
            .collect();

        Item {
            item_id: self.id,
            name: self.name,
            address,
            image_url,
            url: self.url,
            distance: self.distance.unwrap_or_default(),
            rating: 0.0,
            categories,
        }
    }
}

impl EventsResponse {
    pub fn into_items(self) -> Vec<Item> {
        self.embedded
            .map(|e| e.events.into_iter().map(Event::into_item).collect())
            .unwrap_or_default()
    }
}

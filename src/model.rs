use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

/// A point of interest, either already stored locally or freshly returned by
/// the search provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub item_id: String,
    pub name: String,
    pub address: String,
    pub image_url: String,
    pub url: String,
    pub distance: f64,
    pub rating: f64,
    pub categories: BTreeSet<String>,
}

impl Item {
    pub fn new(item_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }
}

// Floats compare by bit pattern so items can be collected into a `HashSet`.
impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.item_id == other.item_id
            && self.name == other.name
            && self.address == other.address
            && self.image_url == other.image_url
            && self.url == other.url
            && self.distance.to_bits() == other.distance.to_bits()
            && self.rating.to_bits() == other.rating.to_bits()
            && self.categories == other.categories
    }
}

impl Eq for Item {}

impl Hash for Item {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.item_id.hash(state);
        self.name.hash(state);
        self.address.hash(state);
        self.image_url.hash(state);
        self.url.hash(state);
        self.distance.to_bits().hash(state);
        self.rating.to_bits().hash(state);
        self.categories.hash(state);
    }
}

/// Account row as stored in `users`. Managed outside this crate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn equal_items_collapse_in_a_set() {
        let a = Item::new("x1").with_name("Jazz Night").with_categories(["Music"]);
        let b = a.clone();
        let set: HashSet<Item> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn category_difference_breaks_equality() {
        let a = Item::new("x1").with_categories(["Music"]);
        let b = Item::new("x1").with_categories(["Music", "Sports"]);
        assert_ne!(a, b);
    }

    #[test]
    fn full_name_joins_with_space() {
        let user = User {
            user_id: "bob".into(),
            first_name: "Bob".into(),
            last_name: "Lee".into(),
        };
        assert_eq!(user.full_name(), "Bob Lee");
    }
}

//! Entities served by the data layer and the service capability they share.

use crate::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A record type exposed as a REST collection.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection path segment, e.g. `"events"`.
    const COLLECTION: &'static str;
    /// Query parameter used to filter by parent, if the entity has one.
    const PARENT_PARAM: Option<&'static str> = None;
    /// Known category values, served without a network call.
    const CATEGORIES: &'static [&'static str] = &[];

    fn id(&self) -> &str;
    fn label(&self) -> &str;

    fn category(&self) -> Option<&str> {
        None
    }

    fn parent_id(&self) -> Option<&str> {
        None
    }

    /// Year the entity is placed on the timeline at.
    fn year(&self) -> Option<i32> {
        None
    }
}

/// The capability every wired data service offers.
///
/// Remote and fallback implementations share this trait, so a wrapper can
/// only be built from two objects that expose the same functions.
#[async_trait]
pub trait EntityService<E: Entity>: Send + Sync {
    async fn list(&self, query: &ListQuery) -> Result<Page<E>>;

    async fn get(&self, id: &str) -> Result<E>;

    async fn search(&self, text: &str) -> Result<Vec<E>>;

    /// Static enumeration lookup. Must not perform I/O.
    fn categories(&self) -> Result<Vec<String>>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub text: Option<String>,
    pub category: Option<String>,
    pub parent: Option<String>,
    pub from_year: Option<i32>,
    pub to_year: Option<i32>,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_years(mut self, from: Option<i32>, to: Option<i32>) -> Self {
        self.from_year = from;
        self.to_year = to;
        self
    }

    pub fn with_page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }

    /// Query-string form for the remote API.
    pub fn to_params<E: Entity>(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(ref t) = self.text {
            params.push(("q".to_string(), t.clone()));
        }
        if let Some(ref c) = self.category {
            params.push(("category".to_string(), c.clone()));
        }
        if let (Some(ref p), Some(key)) = (&self.parent, E::PARENT_PARAM) {
            params.push((key.to_string(), p.clone()));
        }
        if let Some(y) = self.from_year {
            params.push(("from".to_string(), y.to_string()));
        }
        if let Some(y) = self.to_year {
            params.push(("to".to_string(), y.to_string()));
        }
        if self.offset > 0 {
            params.push(("offset".to_string(), self.offset.to_string()));
        }
        if let Some(l) = self.limit {
            params.push(("limit".to_string(), l.to_string()));
        }
        params
    }

    /// Local evaluation of the filter part of the query (no paging).
    pub fn matches<E: Entity>(&self, entity: &E) -> bool {
        if let Some(ref t) = self.text {
            if !entity.label().to_lowercase().contains(&t.to_lowercase()) {
                return false;
            }
        }
        if let Some(ref c) = self.category {
            if entity.category() != Some(c.as_str()) {
                return false;
            }
        }
        if let Some(ref p) = self.parent {
            if entity.parent_id() != Some(p.as_str()) {
                return false;
            }
        }
        if self.from_year.is_some() || self.to_year.is_some() {
            let Some(year) = entity.year() else {
                return false;
            };
            if self.from_year.map_or(false, |from| year < from)
                || self.to_year.map_or(false, |to| year > to)
            {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<E> {
    pub items: Vec<E>,
    /// Total matches before paging.
    pub total: usize,
}

impl<E> Page<E> {
    pub fn new(items: Vec<E>, total: usize) -> Self {
        Self { items, total }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub title: String,
    pub year: i32,
    #[serde(default)]
    pub end_year: Option<i32>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub place_id: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

impl Entity for Event {
    const COLLECTION: &'static str = "events";
    const PARENT_PARAM: Option<&'static str> = Some("placeId");
    const CATEGORIES: &'static [&'static str] = &[
        "battle",
        "treaty",
        "founding",
        "succession",
        "disaster",
        "culture",
    ];

    fn id(&self) -> &str {
        &self.id
    }
    fn label(&self) -> &str {
        &self.title
    }
    fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }
    fn parent_id(&self) -> Option<&str> {
        self.place_id.as_deref()
    }
    fn year(&self) -> Option<i32> {
        Some(self.year)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub born: Option<i32>,
    #[serde(default)]
    pub died: Option<i32>,
    #[serde(default)]
    pub role: Option<String>,
}

impl Entity for Person {
    const COLLECTION: &'static str = "persons";
    const CATEGORIES: &'static [&'static str] =
        &["ruler", "general", "scholar", "artist", "cleric"];

    fn id(&self) -> &str {
        &self.id
    }
    fn label(&self) -> &str {
        &self.name
    }
    fn category(&self) -> Option<&str> {
        self.role.as_deref()
    }
    fn year(&self) -> Option<i32> {
        self.born
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub kind: Option<String>,
}

impl Entity for Place {
    const COLLECTION: &'static str = "places";
    const CATEGORIES: &'static [&'static str] =
        &["city", "province", "battlefield", "monument", "river"];

    fn id(&self) -> &str {
        &self.id
    }
    fn label(&self) -> &str {
        &self.name
    }
    fn category(&self) -> Option<&str> {
        self.kind.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dynasty {
    pub id: String,
    pub name: String,
    pub start_year: i32,
    #[serde(default)]
    pub end_year: Option<i32>,
    #[serde(default)]
    pub capital_place_id: Option<String>,
}

impl Entity for Dynasty {
    const COLLECTION: &'static str = "dynasties";
    const PARENT_PARAM: Option<&'static str> = Some("capitalPlaceId");

    fn id(&self) -> &str {
        &self.id
    }
    fn label(&self) -> &str {
        &self.name
    }
    fn parent_id(&self) -> Option<&str> {
        self.capital_place_id.as_deref()
    }
    fn year(&self) -> Option<i32> {
        Some(self.start_year)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Emperor {
    pub id: String,
    pub name: String,
    pub dynasty_id: String,
    pub reign_start: i32,
    #[serde(default)]
    pub reign_end: Option<i32>,
}

impl Entity for Emperor {
    const COLLECTION: &'static str = "emperors";
    const PARENT_PARAM: Option<&'static str> = Some("dynastyId");

    fn id(&self) -> &str {
        &self.id
    }
    fn label(&self) -> &str {
        &self.name
    }
    fn parent_id(&self) -> Option<&str> {
        Some(&self.dynasty_id)
    }
    fn year(&self) -> Option<i32> {
        Some(self.reign_start)
    }
}

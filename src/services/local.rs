use super::entity::{Dynasty, Emperor, Entity, EntityService, Event, ListQuery, Page, Person, Place};
use crate::error_code::ErrorKind;
use crate::{ApiError, Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

/// In-memory [`EntityService`], the usual fallback implementation.
#[derive(Debug, Clone)]
pub struct LocalCatalog<E> {
    items: Arc<Vec<E>>,
}

impl<E> Default for LocalCatalog<E> {
    fn default() -> Self {
        Self {
            items: Arc::new(Vec::new()),
        }
    }
}

impl<E: Entity> LocalCatalog<E> {
    pub fn from_items(items: Vec<E>) -> Self {
        Self {
            items: Arc::new(items),
        }
    }

    /// Parse a JSON array of entities.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(Self::from_items(serde_json::from_str(json)?))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[E] {
        &self.items
    }
}

#[async_trait]
impl<E: Entity> EntityService<E> for LocalCatalog<E> {
    async fn list(&self, query: &ListQuery) -> Result<Page<E>> {
        let matched: Vec<&E> = self.items.iter().filter(|e| query.matches(*e)).collect();
        let total = matched.len();
        let items = matched
            .into_iter()
            .skip(query.offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(Page::new(items, total))
    }

    async fn get(&self, id: &str) -> Result<E> {
        self.items
            .iter()
            .find(|e| e.id() == id)
            .cloned()
            .ok_or_else(|| {
                Error::Api(
                    ApiError::new(
                        ErrorKind::ClientError,
                        format!("{} '{}' not found", E::COLLECTION, id),
                    )
                    .with_status(404),
                )
            })
    }

    async fn search(&self, text: &str) -> Result<Vec<E>> {
        let query = ListQuery::new().with_text(text);
        Ok(self
            .items
            .iter()
            .filter(|e| query.matches(*e))
            .cloned()
            .collect())
    }

    fn categories(&self) -> Result<Vec<String>> {
        let distinct: BTreeSet<&str> = self.items.iter().filter_map(|e| e.category()).collect();
        Ok(distinct.into_iter().map(str::to_string).collect())
    }
}

/// Seed data for all five local catalogs.
#[derive(Debug, Clone, Default)]
pub struct LocalData {
    pub events: LocalCatalog<Event>,
    pub persons: LocalCatalog<Person>,
    pub places: LocalCatalog<Place>,
    pub dynasties: LocalCatalog<Dynasty>,
    pub emperors: LocalCatalog<Emperor>,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct LocalDataFile {
    events: Vec<Event>,
    persons: Vec<Person>,
    places: Vec<Place>,
    dynasties: Vec<Dynasty>,
    emperors: Vec<Emperor>,
}

impl LocalData {
    /// Parse `{"events": [...], "persons": [...], ...}`; every key is optional.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: LocalDataFile = serde_json::from_str(json)?;
        Ok(Self {
            events: LocalCatalog::from_items(file.events),
            persons: LocalCatalog::from_items(file.persons),
            places: LocalCatalog::from_items(file.places),
            dynasties: LocalCatalog::from_items(file.dynasties),
            emperors: LocalCatalog::from_items(file.emperors),
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }
}

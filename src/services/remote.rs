use super::entity::{Entity, EntityService, ListQuery, Page};
use super::normalize::{normalize_item, normalize_list};
use super::validator::Validator;
use crate::client::ResilientClient;
use crate::resilience::RequestOptions;
use crate::transport::TransportRequest;
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

/// REST-backed [`EntityService`] for one collection.
///
/// | Function | Request |
/// |----------|---------|
/// | `list` | `GET /{collection}?{filters}` |
/// | `get` | `GET /{collection}/{id}` |
/// | `search` | `GET /{collection}?q={text}` |
///
/// `categories` is served from [`Entity::CATEGORIES`] without I/O.
pub struct RemoteEntityService<E> {
    client: ResilientClient,
    validator: Option<Arc<dyn Validator>>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> RemoteEntityService<E> {
    pub fn new(client: ResilientClient) -> Self {
        Self {
            client,
            validator: None,
            _entity: PhantomData,
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn client(&self) -> &ResilientClient {
        &self.client
    }

    fn collection_path(&self) -> String {
        format!("/{}", E::COLLECTION)
    }

    async fn fetch(&self, request: TransportRequest) -> Result<Value> {
        let payload = self.client.request(request, RequestOptions::default()).await?;
        if let Some(ref v) = self.validator {
            v.validate(&payload)?;
        }
        Ok(payload)
    }
}

impl<E> Clone for RemoteEntityService<E> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            validator: self.validator.clone(),
            _entity: PhantomData,
        }
    }
}

#[async_trait]
impl<E: Entity> EntityService<E> for RemoteEntityService<E> {
    async fn list(&self, query: &ListQuery) -> Result<Page<E>> {
        let mut req = TransportRequest::get(self.collection_path());
        for (k, v) in query.to_params::<E>() {
            req = req.with_query(k, v);
        }
        normalize_list(self.fetch(req).await?)
    }

    async fn get(&self, id: &str) -> Result<E> {
        if id.trim().is_empty() {
            return Err(Error::invalid_request_with_context(
                "entity id must not be empty",
                ErrorContext::new()
                    .with_field_path("id")
                    .with_source(E::COLLECTION),
            ));
        }
        let path = format!("{}/{}", self.collection_path(), encode_segment(id));
        normalize_item(self.fetch(TransportRequest::get(path)).await?)
    }

    async fn search(&self, text: &str) -> Result<Vec<E>> {
        let req = TransportRequest::get(self.collection_path()).with_query("q", text);
        Ok(normalize_list::<E>(self.fetch(req).await?)?.items)
    }

    fn categories(&self) -> Result<Vec<String>> {
        if E::CATEGORIES.is_empty() {
            return Err(Error::validation_with_context(
                format!("no category enumeration for '{}'", E::COLLECTION),
                ErrorContext::new().with_source("remote_service"),
            ));
        }
        Ok(E::CATEGORIES.iter().map(|c| c.to_string()).collect())
    }
}

fn encode_segment(raw: &str) -> String {
    url::form_urlencoded::byte_serialize(raw.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

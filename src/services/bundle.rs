use super::descriptor::{DYNASTIES, EMPERORS, EVENTS, PERSONS, PLACES};
use super::entity::{Dynasty, Emperor, Entity, EntityService, Event, Person, Place};
use super::local::{LocalCatalog, LocalData};
use super::remote::RemoteEntityService;
use super::wiring::{ServiceFactory, ServiceWiring};
use super::{DataSource, DataSourceSwitch};
use crate::client::{ResilientClient, ResilientClientBuilder, StatusSnapshot};
use crate::config::DataLayerConfig;
use crate::fallback::FallbackManager;
use crate::Result;
use std::sync::Arc;

/// A wired entity service with type-erased implementations.
pub type Wired<E> = ServiceWiring<dyn EntityService<E>, dyn EntityService<E>>;

/// The five entity services over one client, one manager and one switch.
#[derive(Clone)]
pub struct DataServices {
    pub events: Wired<Event>,
    pub persons: Wired<Person>,
    pub places: Wired<Place>,
    pub dynasties: Wired<Dynasty>,
    pub emperors: Wired<Emperor>,
    client: ResilientClient,
    manager: Arc<FallbackManager>,
    source: Arc<DataSourceSwitch>,
}

impl DataServices {
    /// Wire REST services over `client` with `local` as the fallback data.
    pub fn build(
        client: ResilientClient,
        manager: Arc<FallbackManager>,
        source: Arc<DataSourceSwitch>,
        local: LocalData,
    ) -> Self {
        let factory = ServiceFactory::new(Arc::clone(&manager), Arc::clone(&source));
        Self {
            events: wire_one(&factory, &client, EVENTS, local.events),
            persons: wire_one(&factory, &client, PERSONS, local.persons),
            places: wire_one(&factory, &client, PLACES, local.places),
            dynasties: wire_one(&factory, &client, DYNASTIES, local.dynasties),
            emperors: wire_one(&factory, &client, EMPERORS, local.emperors),
            client,
            manager,
            source,
        }
    }

    pub fn from_config(config: &DataLayerConfig, local: LocalData) -> Result<Self> {
        config.validate()?;
        let client = ResilientClientBuilder::from_config(config).build()?;
        let manager = Arc::new(FallbackManager::new(config.fallback.to_fallback_config())?);
        let source = Arc::new(DataSourceSwitch::new(config.data_source));
        Ok(Self::build(client, manager, source, local))
    }

    pub fn client(&self) -> &ResilientClient {
        &self.client
    }

    pub fn manager(&self) -> &Arc<FallbackManager> {
        &self.manager
    }

    pub fn data_source(&self) -> DataSource {
        self.source.get()
    }

    pub fn set_data_source(&self, source: DataSource) {
        self.source.set(source);
    }

    pub fn status(&self) -> StatusSnapshot {
        StatusSnapshot {
            data_source: self.source.get(),
            client: self.client.signals(),
            fallback: self.manager.snapshot(),
        }
    }
}

fn wire_one<E: Entity>(
    factory: &ServiceFactory,
    client: &ResilientClient,
    descriptor: super::ServiceDescriptor,
    local: LocalCatalog<E>,
) -> Wired<E> {
    let remote: Arc<dyn EntityService<E>> = Arc::new(RemoteEntityService::<E>::new(client.clone()));
    let fallback: Arc<dyn EntityService<E>> = Arc::new(local);
    factory.wire(descriptor, remote, fallback)
}

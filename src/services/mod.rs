//! 服务装配：把远程实现与本地回退实现组合成同一个数据服务。
//!
//! Service wiring.
//!
//! Each logical data service (events, persons, places, dynasties, emperors)
//! has a remote implementation over [`ResilientClient`](crate::client::ResilientClient)
//! and an in-memory fallback. [`ServiceFactory::wire`] combines the two into a
//! single [`EntityService`] that routes every call through the shared
//! [`FallbackManager`](crate::fallback::FallbackManager):
//!
//! | Function kind | Routing |
//! |---------------|---------|
//! | async (`list`, `get`, `search`) | `execute_with_fallback` |
//! | sync (`categories`) | remote, then fallback on error |
//!
//! The [`DataSourceSwitch`] is consulted on every call. In `mock` mode the
//! fallback implementation is used directly and the manager is not touched.

mod bundle;
mod descriptor;
mod entity;
mod local;
mod normalize;
mod remote;
mod validator;
mod wiring;

pub use bundle::{DataServices, Wired};
pub use descriptor::{FunctionKind, ServiceDescriptor, DYNASTIES, EMPERORS, EVENTS, PERSONS, PLACES};
pub use entity::{
    Dynasty, Emperor, Entity, EntityService, Event, ListQuery, Page, Person, Place,
};
pub use local::{LocalCatalog, LocalData};
pub use normalize::{normalize_item, normalize_list};
pub use remote::RemoteEntityService;
pub use validator::{JsonSchemaValidator, Validator};
pub use wiring::{ServiceFactory, ServiceWiring};

use crate::{Error, ErrorContext};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use tracing::info;

/// Where wired services read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// Remote first, fallback per the manager's policy.
    #[default]
    Api,
    /// Local fallback only; the remote is never called.
    Mock,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Api => "api",
            DataSource::Mock => "mock",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "api" => Ok(DataSource::Api),
            "mock" => Ok(DataSource::Mock),
            other => Err(Error::configuration_with_context(
                format!("unknown data source '{}'", other),
                ErrorContext::new()
                    .with_field_path("data_source")
                    .with_details("expected 'api' or 'mock'"),
            )),
        }
    }
}

/// Runtime-switchable [`DataSource`], shared by every wired service.
#[derive(Debug, Default)]
pub struct DataSourceSwitch {
    mode: AtomicU8,
}

impl DataSourceSwitch {
    pub fn new(source: DataSource) -> Self {
        Self {
            mode: AtomicU8::new(encode(source)),
        }
    }

    pub fn get(&self) -> DataSource {
        match self.mode.load(Ordering::Acquire) {
            1 => DataSource::Mock,
            _ => DataSource::Api,
        }
    }

    pub fn set(&self, source: DataSource) {
        let prev = self.mode.swap(encode(source), Ordering::AcqRel);
        if prev != encode(source) {
            info!(data_source = %source, "data source switched");
        }
    }

    pub fn is_mock(&self) -> bool {
        self.get() == DataSource::Mock
    }
}

fn encode(source: DataSource) -> u8 {
    match source {
        DataSource::Api => 0,
        DataSource::Mock => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_source_parse() {
        assert_eq!("API".parse::<DataSource>().unwrap(), DataSource::Api);
        assert_eq!(" mock ".parse::<DataSource>().unwrap(), DataSource::Mock);
        let err = "remote".parse::<DataSource>().unwrap_err();
        assert!(err.to_string().contains("unknown data source"));
    }

    #[test]
    fn test_data_source_serde() {
        assert_eq!(serde_json::to_string(&DataSource::Mock).unwrap(), "\"mock\"");
        let parsed: DataSource = serde_json::from_str("\"api\"").unwrap();
        assert_eq!(parsed, DataSource::Api);
    }

    #[test]
    fn test_switch() {
        let switch = DataSourceSwitch::default();
        assert_eq!(switch.get(), DataSource::Api);
        switch.set(DataSource::Mock);
        assert!(switch.is_mock());
        switch.set(DataSource::Api);
        assert!(!switch.is_mock());
    }
}

//! # annals-data
//!
//! 时间线浏览器的弹性数据访问层：熔断、指数退避重试、限时降级到本地数据。
//!
//! Resilient data-access layer for the Annals timeline browser.
//!
//! ## Overview
//!
//! Every remote fetch goes through two independent protection layers:
//!
//! - **Per-endpoint**: a [`ResilientClient`] wraps each call in a circuit
//!   breaker around a bounded, exponentially backed-off retry loop.
//! - **Per-subsystem**: a [`FallbackManager`] counts consecutive backend
//!   failures and, past a threshold, serves local data for a fixed window
//!   without touching the network at all.
//!
//! Entity services (events, persons, places, dynasties, emperors) are wired
//! from a remote implementation and a local fallback that share one trait,
//! [`EntityService`](services::EntityService).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use annals_data::config::DataLayerConfig;
//! use annals_data::services::{DataServices, EntityService, ListQuery, LocalData};
//!
//! #[tokio::main]
//! async fn main() -> annals_data::Result<()> {
//!     let config = DataLayerConfig::from_env()?;
//!     let local = LocalData::from_path("data/seed.json")?;
//!     let services = DataServices::from_config(&config, local)?;
//!
//!     let page = services
//!         .emperors
//!         .list(&ListQuery::new().with_parent("tang"))
//!         .await?;
//!     println!("{} emperors", page.total);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`resilience`] | Circuit breaker and retry executor |
//! | [`transport`] | Transport trait, reqwest transport, error classification |
//! | [`client`] | Resilient client, builder and status signals |
//! | [`fallback`] | Time-boxed degradation manager |
//! | [`services`] | Entity services, wiring factory, local catalogs |
//! | [`config`] | YAML and environment configuration |

pub mod client;
pub mod config;
pub mod error;
pub mod error_code;
pub mod fallback;
pub mod resilience;
pub mod services;
pub mod transport;

pub use client::{ResilientClient, ResilientClientBuilder, StatusSnapshot};
pub use error::{ApiError, Error, ErrorContext};
pub use error_code::ErrorKind;
pub use fallback::{FallbackConfig, FallbackManager};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

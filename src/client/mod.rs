//! Resilient remote client: builder, verbs and status signals.

mod builder;
mod core;
mod signals;

pub use builder::ResilientClientBuilder;
pub use self::core::ResilientClient;
pub use signals::{ClientSignals, StatusSnapshot};

//! 降级管理：基于连续失败计数和限时降级窗口的回退策略。
//!
//! Fallback / degradation manager.
//!
//! Coarser than the per-endpoint circuit breaker: one manager covers an
//! entire data-access subsystem and decides, per call, whether to try the
//! remote path at all. The two mechanisms are independent and can be layered.
//!
//! ```rust
//! use annals_data::fallback::{FallbackConfig, FallbackManager};
//! use std::time::Duration;
//!
//! # async fn demo() -> annals_data::Result<()> {
//! let manager = FallbackManager::new(
//!     FallbackConfig::new()
//!         .with_threshold(3)
//!         .with_duration(Duration::from_secs(60)),
//! )?;
//! let value = manager
//!     .execute_with_fallback(
//!         || async { Ok::<_, annals_data::Error>("remote") },
//!         || async { Ok("local") },
//!         "events.list",
//!     )
//!     .await?;
//! assert_eq!(value, "remote");
//! # Ok(())
//! # }
//! ```

mod config;
mod manager;

pub use config::{FallbackConfig, FallbackConfigUpdate, FallbackConfigView};
pub use manager::{FallbackManager, FallbackSnapshot, LastErrorView};

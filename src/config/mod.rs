//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared via SharedConfig to all subsystems
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of the SharedConfig contents
//!     → next dispatch / newly spawned workers observe new config
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

use arc_swap::ArcSwap;
use std::sync::Arc;

pub use schema::{
    AdminConfig, DelayedConfig, DownstreamConfig, GatewayConfig, LifetimeMode, ListenerConfig,
    LogFormat, ObservabilityConfig, SequencerConfig, TimeoutConfig,
};

/// Live configuration, swapped atomically on reload.
pub type SharedConfig = Arc<ArcSwap<GatewayConfig>>;

/// Wrap a configuration for sharing across subsystems.
pub fn shared(config: GatewayConfig) -> SharedConfig {
    Arc::new(ArcSwap::from_pointee(config))
}

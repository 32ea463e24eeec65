//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Inbound request timeouts.
    pub timeouts: TimeoutConfig,

    /// Per-destination serialization settings.
    pub sequencer: SequencerConfig,

    /// Two-phase delayed request settings.
    pub delayed: DelayedConfig,

    /// Outbound HTTP client settings.
    pub downstream: DownstreamConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8018").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8018".to_string(),
        }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upper bound on handling one inbound request, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 60 }
    }
}

/// When a destination worker retires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LifetimeMode {
    /// Retire after `worker_lifetime_secs` without processing anything.
    #[default]
    Idle,
    /// Retire `worker_lifetime_secs` after spawn, regardless of activity.
    Fixed,
}

/// Per-destination worker and dispatch settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SequencerConfig {
    /// Outstanding envelopes a worker queue holds before callers block.
    pub queue_capacity: usize,

    /// Ceiling on one downstream call made by a worker, in seconds.
    pub downstream_timeout_secs: u64,

    /// How long a caller waits for its worker's answer, in seconds.
    pub dispatch_timeout_secs: u64,

    /// Worker lifetime, in seconds (see `lifetime_mode`).
    pub worker_lifetime_secs: u64,

    pub lifetime_mode: LifetimeMode,
}

impl SequencerConfig {
    pub fn downstream_timeout(&self) -> Duration {
        Duration::from_secs(self.downstream_timeout_secs)
    }

    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_secs(self.dispatch_timeout_secs)
    }

    pub fn worker_lifetime(&self) -> Duration {
        Duration::from_secs(self.worker_lifetime_secs)
    }
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 5000,
            downstream_timeout_secs: 15,
            dispatch_timeout_secs: 25,
            worker_lifetime_secs: 24 * 60 * 60,
            lifetime_mode: LifetimeMode::Idle,
        }
    }
}

/// Delayed request/response settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DelayedConfig {
    /// Ceiling on each of the two calls, in seconds.
    pub request_timeout_secs: u64,

    /// Largest delay a caller may ask for, in seconds.
    pub max_delay_secs: u64,
}

impl DelayedConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_secs(self.max_delay_secs)
    }
}

impl Default for DelayedConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 15,
            max_delay_secs: 25,
        }
    }
}

/// Outbound HTTP client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DownstreamConfig {
    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Ceiling on an unserialized `/simple` call, in seconds.
    pub simple_timeout_secs: u64,

    /// Largest response body buffered from a destination.
    pub max_response_bytes: usize,
}

impl DownstreamConfig {
    pub fn simple_timeout(&self) -> Duration {
        Duration::from_secs(self.simple_timeout_secs)
    }
}

impl Default for DownstreamConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 5,
            simple_timeout_secs: 15,
            max_response_bytes: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: "127.0.0.1:8019".to_string(),
        }
    }
}

//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (capacities and timeouts > 0)
//! - Check timeout ordering between layers
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} is not a valid socket address: {value}")]
    BadAddress { field: &'static str, value: String },

    #[error("{longer} ({longer_secs}s) must exceed {shorter} ({shorter_secs}s)")]
    TimeoutOrder {
        longer: &'static str,
        longer_secs: u64,
        shorter: &'static str,
        shorter_secs: u64,
    },
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let positive: [(&'static str, u64); 8] = [
        ("sequencer.queue_capacity", config.sequencer.queue_capacity as u64),
        ("sequencer.downstream_timeout_secs", config.sequencer.downstream_timeout_secs),
        ("sequencer.dispatch_timeout_secs", config.sequencer.dispatch_timeout_secs),
        ("sequencer.worker_lifetime_secs", config.sequencer.worker_lifetime_secs),
        ("delayed.request_timeout_secs", config.delayed.request_timeout_secs),
        ("downstream.simple_timeout_secs", config.downstream.simple_timeout_secs),
        ("downstream.max_response_bytes", config.downstream.max_response_bytes as u64),
        ("timeouts.request_secs", config.timeouts.request_secs),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    }

    // The worker's own ceiling must fire before the caller gives up.
    if config.sequencer.dispatch_timeout_secs <= config.sequencer.downstream_timeout_secs {
        errors.push(ValidationError::TimeoutOrder {
            longer: "sequencer.dispatch_timeout_secs",
            longer_secs: config.sequencer.dispatch_timeout_secs,
            shorter: "sequencer.downstream_timeout_secs",
            shorter_secs: config.sequencer.downstream_timeout_secs,
        });
    }

    if config.timeouts.request_secs <= config.sequencer.dispatch_timeout_secs {
        errors.push(ValidationError::TimeoutOrder {
            longer: "timeouts.request_secs",
            longer_secs: config.timeouts.request_secs,
            shorter: "sequencer.dispatch_timeout_secs",
            shorter_secs: config.sequencer.dispatch_timeout_secs,
        });
    }

    let delayed_worst_case = config
        .delayed
        .max_delay_secs
        .saturating_add(config.delayed.request_timeout_secs.saturating_mul(2));
    if config.timeouts.request_secs <= delayed_worst_case {
        errors.push(ValidationError::TimeoutOrder {
            longer: "timeouts.request_secs",
            longer_secs: config.timeouts.request_secs,
            shorter: "delayed.max_delay_secs + 2 * delayed.request_timeout_secs",
            shorter_secs: delayed_worst_case,
        });
    }

    let addresses = [
        ("listener.bind_address", &config.listener.bind_address, true),
        ("observability.metrics_address", &config.observability.metrics_address, config.observability.metrics_enabled),
        ("admin.bind_address", &config.admin.bind_address, config.admin.enabled),
    ];
    for (field, value, in_use) in addresses {
        if in_use && value.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::BadAddress {
                field,
                value: value.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

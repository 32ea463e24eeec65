//! Destination, result and error types shared by the sequencer.

use axum::body::Bytes;
use axum::http::uri::{Authority, PathAndQuery};
use axum::http::StatusCode;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_HTTP_PORT: u16 = 80;

/// A downstream target, identified by `host[:port]`.
///
/// Used as the registry key, so two spellings of the same target must compare
/// equal: the host part is lowercased and an explicit `:80` is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Destination(String);

impl Destination {
    /// Parse and normalise a destination taken from an inbound URI segment.
    pub fn parse(raw: &str) -> Result<Self, GatewayError> {
        if raw.is_empty() {
            return Err(GatewayError::MalformedInput("destination must not be empty".into()));
        }
        let authority = Authority::from_str(raw).map_err(|e| {
            GatewayError::MalformedInput(format!("invalid destination {:?}: {}", raw, e))
        })?;
        if authority.as_str().contains('@') {
            return Err(GatewayError::MalformedInput(format!(
                "destination {:?} must not carry credentials",
                raw
            )));
        }
        let host = authority.host().to_ascii_lowercase();
        let port_part = authority.as_str().get(authority.host().len()..).unwrap_or("");
        let normalised = match authority.port_u16() {
            Some(DEFAULT_HTTP_PORT) => host,
            Some(port) => format!("{}:{}", host, port),
            None if port_part.is_empty() => host,
            None => {
                return Err(GatewayError::MalformedInput(format!(
                    "destination {:?} has an invalid port",
                    raw
                )))
            }
        };
        Ok(Self(normalised))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Check that `path` is an origin-form path (and optional query) that can be
/// appended to a destination.
pub fn validate_path(path: &str) -> Result<(), GatewayError> {
    if !path.starts_with('/') {
        return Err(GatewayError::MalformedInput(format!(
            "downstream path {:?} must start with '/'",
            path
        )));
    }
    PathAndQuery::from_str(path)
        .map(|_| ())
        .map_err(|e| GatewayError::MalformedInput(format!("invalid downstream path {:?}: {}", path, e)))
}

/// A complete downstream response, body fully buffered.
#[derive(Debug, Clone)]
pub struct Forwarded {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// Failure of a single outbound GET.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The destination could not be reached.
    #[error("could not reach {target}: {reason}")]
    Connect { target: String, reason: String },

    /// The connection succeeded but the body could not be read.
    #[error("failed to read response body from {target}: {reason}")]
    Read { target: String, reason: String },

    /// The per-call ceiling elapsed.
    #[error("{target} did not answer within {timeout:?}")]
    Timeout { target: String, timeout: Duration },

    /// The outbound request could not be built.
    #[error("invalid downstream target {target}: {reason}")]
    InvalidTarget { target: String, reason: String },
}

/// Every failure a forwarding call can surface to its caller.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Downstream failure of a serialized or simple call.
    #[error(transparent)]
    Downstream(#[from] FetchError),

    /// The dispatcher gave up waiting for the worker.
    #[error("gateway timed out after {0:?} waiting for {1}")]
    DispatchTimeout(Duration, Destination),

    /// The response sink was dropped without a value.
    #[error("response channel from the worker for {0} was closed")]
    SinkClosed(Destination),

    /// The worker retired before it got to this request.
    #[error("worker for {0} retired before processing the request")]
    WorkerRetired(Destination),

    /// A worker received a request addressed to another destination.
    #[error("worker for {worker} received a request for {requested}")]
    DestinationMismatch {
        worker: Destination,
        requested: Destination,
    },

    /// Rejected at the boundary before any forwarding work started.
    #[error("{0}")]
    MalformedInput(String),

    /// The first call of a delayed flow failed; the second was never sent.
    #[error("initial request failed: {0}")]
    FirstPhase(#[source] FetchError),

    /// The first call of a delayed flow succeeded but the second failed.
    #[error("successfully executed initial request, but the second request failed: {0}")]
    SecondPhase(#[source] FetchError),
}

impl GatewayError {
    /// Status code reported to the inbound caller.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::MalformedInput(_) => StatusCode::BAD_REQUEST,
            GatewayError::DispatchTimeout(..) => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::Downstream(FetchError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::Downstream(FetchError::InvalidTarget { .. }) => StatusCode::BAD_REQUEST,
            GatewayError::Downstream(_) => StatusCode::BAD_GATEWAY,
            GatewayError::FirstPhase(_) | GatewayError::SecondPhase(_) => StatusCode::BAD_GATEWAY,
            GatewayError::SinkClosed(_) | GatewayError::WorkerRetired(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            GatewayError::DestinationMismatch { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

//! Inbound request parsing.
//!
//! # Responsibilities
//! - Generate unique request IDs (UUID v4)
//! - Split forwarding URIs into route parameters and the downstream path
//! - Parse pacing intervals and delay durations
//!
//! # Design Decisions
//! - The downstream path is cut from the raw URI, so percent-encoding and the
//!   query string reach the destination untouched
//! - Every parse failure is a `MalformedInput` error, rejected before any
//!   forwarding work starts

use axum::http::{HeaderMap, HeaderValue, Request, Uri};
use std::time::Duration;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::sequencer::downstream::X_REQUEST_ID;
use crate::sequencer::GatewayError;

/// Issues a UUID v4 for requests that arrive without `x-request-id`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeGatewayRequestId;

impl MakeRequestId for MakeGatewayRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// The request ID set by the request-id layer, if any.
pub fn request_id(headers: &HeaderMap) -> Option<&str> {
    headers.get(X_REQUEST_ID).and_then(|v| v.to_str().ok())
}

/// A forwarding URI split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardTarget {
    /// Route parameters following the mode segment, in order.
    pub params: Vec<String>,
    /// Downstream path, always starting with `/`, without the query.
    pub path: String,
    pub query: Option<String>,
}

impl ForwardTarget {
    /// Split `/{mode}/{param 1}/…/{param n}/{rest…}[?query]`.
    pub fn parse(uri: &Uri, params: usize) -> Result<Self, GatewayError> {
        let raw = uri.path().trim_start_matches('/');
        let mut segments = raw.splitn(params + 2, '/');

        // Mode segment, already matched by the router.
        segments.next();

        let mut values = Vec::with_capacity(params);
        for _ in 0..params {
            match segments.next() {
                Some(segment) if !segment.is_empty() => values.push(segment.to_string()),
                _ => {
                    return Err(GatewayError::MalformedInput(format!(
                        "expected {} route parameter(s) in {}",
                        params,
                        uri.path()
                    )))
                }
            }
        }

        let path = format!("/{}", segments.next().unwrap_or(""));
        Ok(Self {
            params: values,
            path,
            query: uri.query().map(str::to_owned),
        })
    }

    /// Downstream path with the query re-attached.
    pub fn path_and_query(&self) -> String {
        with_query(&self.path, self.query.as_deref())
    }

    /// Split the path around its single `resp` segment into the first and
    /// second request of a delayed flow. The query goes to the second request.
    pub fn split_delayed(&self) -> Result<(String, String), GatewayError> {
        let segments: Vec<&str> = self.path.split('/').skip(1).collect();
        let markers: Vec<usize> = segments
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == "resp")
            .map(|(i, _)| i)
            .collect();

        let &[marker] = markers.as_slice() else {
            return Err(GatewayError::MalformedInput(
                "must include a before and after request separated by a single /resp/ segment".into(),
            ));
        };

        let first = format!("/{}", segments[..marker].join("/"));
        let second = format!("/{}", segments[marker + 1..].join("/"));
        Ok((first, with_query(&second, self.query.as_deref())))
    }
}

fn with_query(path: &str, query: Option<&str>) -> String {
    match query {
        Some(q) => format!("{}?{}", path, q),
        None => path.to_string(),
    }
}

/// Parse a metered pacing interval given in whole milliseconds.
pub fn parse_pacing_millis(raw: &str) -> Result<Duration, GatewayError> {
    raw.parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| GatewayError::MalformedInput(format!("rate must be a non-negative integer, was {}", raw)))
}

/// Parse a delay such as `300ms`, `2s`, `1m30s` or `1h 5m`.
///
/// A bare `0` is allowed; any other number needs a unit. Negative durations
/// are rejected.
pub fn parse_duration(raw: &str) -> Result<Duration, GatewayError> {
    if raw == "0" {
        return Ok(Duration::ZERO);
    }
    humantime::parse_duration(raw).map_err(|e| {
        GatewayError::MalformedInput(format!(
            "delay must be a duration such as 500ms or 2s, was {} ({})",
            raw, e
        ))
    })
}

//! Forwarding route handlers.
//!
//! Route shapes (all GET):
//! - `/simple/{destination}/{path…}`: one direct call, no ordering
//! - `/sequenced/{destination}/{path…}`: serialized per destination
//! - `/metered/{millis}/{destination}/{path…}`: serialized, then paced
//! - `/delayed/{delay}/{destination}/{before…}/resp/{after…}`: two-phase

use axum::{
    extract::State,
    http::{HeaderMap, Uri},
    response::{IntoResponse, Response},
};
use std::time::{Duration, Instant};

use crate::http::request::{parse_duration, parse_pacing_millis, request_id, ForwardTarget};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::sequencer::types::validate_path;
use crate::sequencer::{Destination, FetchRequest, Forwarded, GatewayError};

pub async fn simple(State(state): State<AppState>, headers: HeaderMap, uri: Uri) -> Response {
    let started = Instant::now();
    let request_id = request_id(&headers);
    let result = forward_simple(&state, &uri, request_id).await;
    finish("simple", started, request_id, result)
}

pub async fn sequenced(State(state): State<AppState>, headers: HeaderMap, uri: Uri) -> Response {
    let started = Instant::now();
    let request_id = request_id(&headers);
    let result = forward_sequenced(&state, &uri, request_id).await;
    finish("sequenced", started, request_id, result)
}

pub async fn metered(State(state): State<AppState>, headers: HeaderMap, uri: Uri) -> Response {
    let started = Instant::now();
    let request_id = request_id(&headers);
    let result = forward_metered(&state, &uri, request_id).await;
    finish("metered", started, request_id, result)
}

pub async fn delayed(State(state): State<AppState>, headers: HeaderMap, uri: Uri) -> Response {
    let started = Instant::now();
    let request_id = request_id(&headers);
    let result = forward_delayed(&state, &uri, request_id).await;
    finish("delayed", started, request_id, result)
}

async fn forward_simple(
    state: &AppState,
    uri: &Uri,
    request_id: Option<&str>,
) -> Result<Forwarded, GatewayError> {
    let target = ForwardTarget::parse(uri, 1)?;
    let destination = Destination::parse(&target.params[0])?;
    let path = target.path_and_query();
    validate_path(&path)?;

    tracing::info!(destination = %destination, request_id, path = %path, "Passthrough request");
    let timeout = state.config.load().downstream.simple_timeout();
    let forwarded = state
        .downstream
        .fetch(FetchRequest {
            destination: &destination,
            path: &path,
            request_id,
            timeout,
        })
        .await?;
    Ok(forwarded)
}

async fn forward_sequenced(
    state: &AppState,
    uri: &Uri,
    request_id: Option<&str>,
) -> Result<Forwarded, GatewayError> {
    let target = ForwardTarget::parse(uri, 1)?;
    let destination = Destination::parse(&target.params[0])?;
    state
        .dispatcher
        .dispatch(&destination, &target.path_and_query(), Duration::ZERO, request_id)
        .await
}

async fn forward_metered(
    state: &AppState,
    uri: &Uri,
    request_id: Option<&str>,
) -> Result<Forwarded, GatewayError> {
    let target = ForwardTarget::parse(uri, 2)?;
    let pacing = parse_pacing_millis(&target.params[0])?;
    let destination = Destination::parse(&target.params[1])?;
    state
        .dispatcher
        .dispatch(&destination, &target.path_and_query(), pacing, request_id)
        .await
}

async fn forward_delayed(
    state: &AppState,
    uri: &Uri,
    request_id: Option<&str>,
) -> Result<Forwarded, GatewayError> {
    let target = ForwardTarget::parse(uri, 2)?;
    let delay = parse_duration(&target.params[0])?;
    let destination = Destination::parse(&target.params[1])?;
    let (first, second) = target.split_delayed()?;
    state
        .delayed
        .run(&destination, &first, &second, delay, request_id)
        .await
}

fn finish(
    mode: &'static str,
    started: Instant,
    request_id: Option<&str>,
    result: Result<Forwarded, GatewayError>,
) -> Response {
    let response = match result {
        Ok(forwarded) => forwarded.into_response(),
        Err(error) => {
            if matches!(error, GatewayError::MalformedInput(_)) {
                tracing::info!(mode, request_id, error = %error, "Rejected request");
            } else {
                tracing::warn!(mode, request_id, error = %error, "Forwarding failed");
            }
            error.into_response()
        }
    };
    metrics::record_request(mode, response.status().as_u16(), started.elapsed());
    response
}

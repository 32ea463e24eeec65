//! Outbound GET against a destination.

use axum::body::Body;
use axum::http::{header, Method, Request};
use futures_util::future::BoxFuture;
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::time::Duration;

use crate::config::DownstreamConfig;
use crate::sequencer::types::{Destination, FetchError, Forwarded};

/// Header used to correlate inbound and outbound requests.
pub const X_REQUEST_ID: &str = "x-request-id";

/// One outbound call.
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    pub destination: &'a Destination,
    pub path: &'a str,
    pub request_id: Option<&'a str>,
    pub timeout: Duration,
}

impl FetchRequest<'_> {
    pub fn target(&self) -> String {
        format!("http://{}{}", self.destination, self.path)
    }
}

/// Performs a single GET and buffers the whole response.
///
/// Implementations must bound the call by `request.timeout` and report
/// failures as [`FetchError`] values, never by panicking.
pub trait Downstream: Send + Sync + 'static {
    fn fetch<'a>(&'a self, request: FetchRequest<'a>) -> BoxFuture<'a, Result<Forwarded, FetchError>>;
}

/// [`Downstream`] over plain HTTP using the hyper-util pooled client.
#[derive(Clone)]
pub struct HttpDownstream {
    client: Client<HttpConnector, Body>,
    max_response_bytes: usize,
}

impl HttpDownstream {
    pub fn new(config: &DownstreamConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.connect_timeout_secs)));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            client,
            max_response_bytes: config.max_response_bytes,
        }
    }

    async fn exchange(&self, target: &str, request_id: Option<&str>) -> Result<Forwarded, FetchError> {
        let mut builder = Request::builder()
            .method(Method::GET)
            .uri(target)
            .header(header::USER_AGENT, concat!("passthrough-gateway/", env!("CARGO_PKG_VERSION")));
        if let Some(id) = request_id {
            builder = builder.header(X_REQUEST_ID, id);
        }
        let request = builder.body(Body::empty()).map_err(|e| FetchError::InvalidTarget {
            target: target.to_string(),
            reason: e.to_string(),
        })?;

        let response: hyper::Response<Incoming> = self.client.request(request).await.map_err(|e| FetchError::Connect {
            target: target.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let body = axum::body::to_bytes(Body::new(response.into_body()), self.max_response_bytes)
            .await
            .map_err(|e| FetchError::Read {
                target: target.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Forwarded {
            status,
            content_type,
            body,
        })
    }
}

impl Downstream for HttpDownstream {
    fn fetch<'a>(&'a self, request: FetchRequest<'a>) -> BoxFuture<'a, Result<Forwarded, FetchError>> {
        Box::pin(async move {
            let target = request.target();
            let outcome =
                tokio::time::timeout(request.timeout, self.exchange(&target, request.request_id)).await;
            match outcome {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout {
                    target,
                    timeout: request.timeout,
                }),
            }
        })
    }
}

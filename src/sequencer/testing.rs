//! Scripted in-memory downstream for unit tests.

use axum::body::Bytes;
use axum::http::StatusCode;
use futures_util::future::BoxFuture;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use crate::sequencer::downstream::{Downstream, FetchRequest};
use crate::sequencer::types::{FetchError, Forwarded};

/// How the fake destination answers a path.
#[derive(Debug, Clone)]
pub(crate) enum Script {
    Respond {
        after: Duration,
        status: u16,
        body: &'static str,
    },
    Refuse,
    /// Connects, then loses the body mid-read.
    ReadFail,
    Hang,
    /// Kills the calling task, as a buggy client would.
    Panic,
}

#[derive(Debug, Clone)]
pub(crate) struct CallRecord {
    pub destination: String,
    pub path: String,
    pub started: Instant,
    pub finished: Instant,
}

pub(crate) struct ScriptedDownstream {
    script: Box<dyn Fn(&str) -> Script + Send + Sync>,
    calls: Mutex<Vec<CallRecord>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedDownstream {
    pub(crate) fn new(script: impl Fn(&str) -> Script + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            script: Box::new(script),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    /// Every path answers `200 ok` after `after`.
    pub(crate) fn ok(after: Duration) -> Arc<Self> {
        Self::new(move |_| Script::Respond {
            after,
            status: 200,
            body: "ok",
        })
    }

    /// Completed calls, in completion order.
    pub(crate) fn calls(&self) -> Vec<CallRecord> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn answer(&self, path: &str, target: &str) -> Result<Forwarded, FetchError> {
        match (self.script)(path) {
            Script::Respond { after, status, body } => {
                tokio::time::sleep(after).await;
                Ok(Forwarded {
                    status: StatusCode::from_u16(status).unwrap(),
                    content_type: Some("text/plain".to_string()),
                    body: Bytes::from_static(body.as_bytes()),
                })
            }
            Script::Refuse => Err(FetchError::Connect {
                target: target.to_string(),
                reason: "connection refused".to_string(),
            }),
            Script::ReadFail => Err(FetchError::Read {
                target: target.to_string(),
                reason: "connection closed before message completed".to_string(),
            }),
            Script::Hang => futures_util::future::pending().await,
            Script::Panic => panic!("scripted downstream failure for {}", target),
        }
    }
}

impl Downstream for ScriptedDownstream {
    fn fetch<'a>(&'a self, request: FetchRequest<'a>) -> BoxFuture<'a, Result<Forwarded, FetchError>> {
        Box::pin(async move {
            let started = Instant::now();
            let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);

            let target = request.target();
            let outcome = match tokio::time::timeout(request.timeout, self.answer(request.path, &target)).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout {
                    target: target.clone(),
                    timeout: request.timeout,
                }),
            };

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.calls.lock().unwrap().push(CallRecord {
                destination: request.destination.to_string(),
                path: request.path.to_string(),
                started,
                finished: Instant::now(),
            });
            outcome
        })
    }
}

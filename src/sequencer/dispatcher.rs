//! Caller-facing entry point to the serialized path.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::SharedConfig;
use crate::observability::metrics;
use crate::sequencer::envelope::RequestEnvelope;
use crate::sequencer::registry::Registry;
use crate::sequencer::types::{validate_path, Destination, Forwarded, GatewayError};
use crate::sequencer::worker::deadline_after;

/// How many times a request may be re-routed to a successor worker.
const MAX_ROUTING_ATTEMPTS: usize = 3;

/// Queues requests on their destination's worker and waits, bounded, for the answer.
pub struct Dispatcher {
    registry: Arc<Registry>,
    config: SharedConfig,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>, config: SharedConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Forward `path` to `destination` behind every earlier request to it.
    ///
    /// `pacing` is the gap the worker leaves after this request completes
    /// before it starts the next one. Blocks while the worker's queue is full.
    /// The wait for the answer starts once the request is queued and is
    /// bounded by `sequencer.dispatch_timeout_secs`; a result that arrives
    /// later is discarded by the worker.
    pub async fn dispatch(
        &self,
        destination: &Destination,
        path: &str,
        pacing: Duration,
        request_id: Option<&str>,
    ) -> Result<Forwarded, GatewayError> {
        validate_path(path)?;

        let timeout = self.config.load().sequencer.dispatch_timeout();
        let mut deadline: Option<Instant> = None;

        for attempt in 1..=MAX_ROUTING_ATTEMPTS {
            let (envelope, response) =
                RequestEnvelope::new(destination.clone(), path, pacing, request_id.map(str::to_owned));

            let worker = self.registry.get_or_create(destination);
            if worker.enqueue(envelope).await.is_err() {
                // A worker that exited without deregistering must not keep
                // its destination locked out.
                if self.registry.remove(destination, worker.generation()) {
                    tracing::warn!(
                        destination = %destination,
                        generation = worker.generation(),
                        "Evicted stale worker with a closed queue"
                    );
                }
                tracing::debug!(
                    destination = %destination,
                    generation = worker.generation(),
                    attempt,
                    "Worker queue closed, re-routing to its successor"
                );
                continue;
            }

            let deadline = *deadline.get_or_insert_with(|| deadline_after(timeout));
            match tokio::time::timeout_at(deadline, response).await {
                Err(_) => {
                    tracing::warn!(
                        destination = %destination,
                        request_id = request_id.unwrap_or("-"),
                        timeout_secs = timeout.as_secs(),
                        "Timed out waiting for worker"
                    );
                    metrics::record_dispatch_timeout();
                    return Err(GatewayError::DispatchTimeout(timeout, destination.clone()));
                }
                Ok(Err(_)) => return Err(GatewayError::SinkClosed(destination.clone())),
                Ok(Ok(Err(GatewayError::WorkerRetired(_)))) => {
                    tracing::debug!(
                        destination = %destination,
                        attempt,
                        "Worker retired before serving request, re-routing"
                    );
                    continue;
                }
                Ok(Ok(result)) => return result,
            }
        }

        Err(GatewayError::WorkerRetired(destination.clone()))
    }
}

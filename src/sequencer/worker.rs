//! Per-destination worker loop.
//!
//! One task per destination drains that destination's queue, so at most one
//! downstream call to it is ever in flight. Each envelope's pacing interval
//! is slept *after* its call completes, before the next envelope is taken.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep, sleep_until, Instant};

use crate::config::{LifetimeMode, SequencerConfig};
use crate::observability::metrics;
use crate::sequencer::downstream::{Downstream, FetchRequest};
use crate::sequencer::envelope::RequestEnvelope;
use crate::sequencer::registry::Registry;
use crate::sequencer::types::{Destination, GatewayError};

/// Stand-in for "never" when a deadline would overflow the clock.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `now + after`, saturating instead of panicking on huge durations.
pub(crate) fn deadline_after(after: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(after).unwrap_or_else(|| now + FAR_FUTURE)
}

/// Settings captured when a worker is spawned; later reloads do not touch it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct WorkerSettings {
    pub queue_capacity: usize,
    pub downstream_timeout: Duration,
    pub lifetime: Duration,
    pub lifetime_mode: LifetimeMode,
}

impl From<&SequencerConfig> for WorkerSettings {
    fn from(config: &SequencerConfig) -> Self {
        Self {
            queue_capacity: config.queue_capacity,
            downstream_timeout: config.downstream_timeout(),
            lifetime: config.worker_lifetime(),
            lifetime_mode: config.lifetime_mode,
        }
    }
}

pub(crate) struct Worker {
    destination: Destination,
    generation: u64,
    registry: Arc<Registry>,
    downstream: Arc<dyn Downstream>,
    settings: WorkerSettings,
    processed: Arc<AtomicU64>,
}

impl Worker {
    pub(crate) fn new(
        destination: Destination,
        generation: u64,
        registry: Arc<Registry>,
        downstream: Arc<dyn Downstream>,
        settings: WorkerSettings,
        processed: Arc<AtomicU64>,
    ) -> Self {
        Self {
            destination,
            generation,
            registry,
            downstream,
            settings,
            processed,
        }
    }

    pub(crate) async fn run(self, mut inbound: mpsc::Receiver<RequestEnvelope>) {
        let mut pacing = Duration::ZERO;
        let mut deadline = deadline_after(self.settings.lifetime);

        loop {
            if !pacing.is_zero() {
                tracing::debug!(
                    destination = %self.destination,
                    pacing_ms = pacing.as_millis() as u64,
                    "Metered connection, waiting before next request"
                );
                sleep(pacing).await;
                pacing = Duration::ZERO;
            }

            let envelope = tokio::select! {
                biased;
                received = inbound.recv() => match received {
                    Some(envelope) => envelope,
                    None => {
                        tracing::debug!(destination = %self.destination, "Queue closed, worker exiting");
                        self.registry.remove(&self.destination, self.generation);
                        metrics::record_worker_retired();
                        return;
                    }
                },
                _ = sleep_until(deadline) => {
                    self.retire(&mut inbound);
                    return;
                }
            };

            pacing = self.process(envelope).await;

            if self.settings.lifetime_mode == LifetimeMode::Idle {
                deadline = deadline_after(self.settings.lifetime);
            }
        }
    }

    /// Serve one envelope and return the gap to leave before the next one.
    async fn process(&self, envelope: RequestEnvelope) -> Duration {
        if envelope.destination != self.destination {
            tracing::error!(
                worker = %self.destination,
                requested = %envelope.destination,
                "Request does not belong to this worker, discarding"
            );
            let error = GatewayError::DestinationMismatch {
                worker: self.destination.clone(),
                requested: envelope.destination.clone(),
            };
            envelope.respond(Err(error));
            return Duration::ZERO;
        }

        metrics::record_queue_wait(envelope.enqueued_at.elapsed());
        let request_id = envelope.request_id.as_deref().unwrap_or("-");

        // Still forwarded: the call may change destination state.
        if envelope.is_abandoned() {
            tracing::debug!(
                destination = %self.destination,
                request_id,
                "Caller stopped waiting while queued"
            );
        }

        tracing::debug!(
            destination = %self.destination,
            request_id,
            path = %envelope.path,
            pacing_ms = envelope.pacing.as_millis() as u64,
            "Forwarding request"
        );

        let started = Instant::now();
        let result = self
            .downstream
            .fetch(FetchRequest {
                destination: &self.destination,
                path: &envelope.path,
                request_id: envelope.request_id.as_deref(),
                timeout: self.settings.downstream_timeout,
            })
            .await;
        self.processed.fetch_add(1, Ordering::Relaxed);

        let response = match result {
            Ok(forwarded) => {
                metrics::record_downstream_call("ok", started.elapsed());
                tracing::debug!(
                    destination = %self.destination,
                    request_id,
                    status = %forwarded.status,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Done"
                );
                Ok(forwarded)
            }
            Err(e) => {
                metrics::record_downstream_call("error", started.elapsed());
                tracing::warn!(
                    destination = %self.destination,
                    request_id,
                    error = %e,
                    "Error with serialized request"
                );
                Err(GatewayError::Downstream(e))
            }
        };

        let pacing = envelope.pacing;
        let request_id = envelope.request_id.clone();
        if !envelope.respond(response) {
            tracing::debug!(
                destination = %self.destination,
                request_id = request_id.as_deref().unwrap_or("-"),
                "Caller stopped waiting, discarding late result"
            );
        }
        pacing
    }

    /// Leave the registry, then answer anything that slipped into the queue.
    fn retire(&self, inbound: &mut mpsc::Receiver<RequestEnvelope>) {
        self.registry.remove(&self.destination, self.generation);
        inbound.close();

        let mut abandoned = 0usize;
        while let Ok(envelope) = inbound.try_recv() {
            envelope.respond(Err(GatewayError::WorkerRetired(self.destination.clone())));
            abandoned += 1;
        }

        tracing::info!(
            destination = %self.destination,
            generation = self.generation,
            abandoned,
            "Worker lifetime expired, closing"
        );
        metrics::record_worker_retired();
    }
}

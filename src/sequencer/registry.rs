//! Destination → worker registry.
//!
//! # Responsibilities
//! - Hand out the one live worker handle for a destination
//! - Spawn that worker exactly once, even under racing first requests
//! - Let a retiring worker remove its own entry, and only its own
//!
//! # Design Decisions
//! - Sharded concurrent map; no lock spans more than one destination
//! - Get-or-create goes through the map's entry API (atomic load-or-store)
//! - The registry holds queue senders only; each worker task owns its loop

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::config::SharedConfig;
use crate::observability::metrics;
use crate::sequencer::downstream::Downstream;
use crate::sequencer::envelope::RequestEnvelope;
use crate::sequencer::types::Destination;
use crate::sequencer::worker::{Worker, WorkerSettings};

/// Cheap, cloneable handle to a destination's worker queue.
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    destination: Destination,
    generation: u64,
    tx: mpsc::Sender<RequestEnvelope>,
    started_at: Instant,
    processed: Arc<AtomicU64>,
}

impl WorkerHandle {
    /// Queue an envelope, waiting while the queue is full.
    ///
    /// Hands the envelope back if the worker has already retired.
    pub async fn enqueue(&self, envelope: RequestEnvelope) -> Result<(), RequestEnvelope> {
        self.tx.send(envelope).await.map_err(|rejected| rejected.0)
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Distinguishes successive workers for the same destination.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Envelopes waiting in the queue.
    pub fn queue_depth(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn queue_capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    /// Downstream calls completed by this worker.
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }
}

/// Point-in-time view of one worker, for the admin API.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerSnapshot {
    pub destination: String,
    pub generation: u64,
    pub queue_depth: usize,
    pub queue_capacity: usize,
    pub processed: u64,
    pub age_secs: u64,
}

impl From<&WorkerHandle> for WorkerSnapshot {
    fn from(handle: &WorkerHandle) -> Self {
        Self {
            destination: handle.destination.to_string(),
            generation: handle.generation,
            queue_depth: handle.queue_depth(),
            queue_capacity: handle.queue_capacity(),
            processed: handle.processed(),
            age_secs: handle.started_at.elapsed().as_secs(),
        }
    }
}

/// Registry of per-destination workers.
pub struct Registry {
    workers: DashMap<Destination, WorkerHandle>,
    downstream: Arc<dyn Downstream>,
    config: SharedConfig,
    next_generation: AtomicU64,
}

impl Registry {
    pub fn new(downstream: Arc<dyn Downstream>, config: SharedConfig) -> Arc<Self> {
        Arc::new(Self {
            workers: DashMap::new(),
            downstream,
            config,
            next_generation: AtomicU64::new(1),
        })
    }

    /// Return the destination's worker, spawning it on first use.
    pub fn get_or_create(self: &Arc<Self>, destination: &Destination) -> WorkerHandle {
        if let Some(existing) = self.workers.get(destination) {
            return existing.clone();
        }

        match self.workers.entry(destination.clone()) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(slot) => {
                let settings = WorkerSettings::from(&self.config.load().sequencer);
                let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
                let (tx, rx) = mpsc::channel(settings.queue_capacity);
                let handle = WorkerHandle {
                    destination: destination.clone(),
                    generation,
                    tx,
                    started_at: Instant::now(),
                    processed: Arc::new(AtomicU64::new(0)),
                };
                slot.insert(handle.clone());

                tracing::info!(
                    destination = %destination,
                    generation,
                    queue_capacity = settings.queue_capacity,
                    "Starting worker to serialize requests"
                );
                metrics::record_worker_spawned();

                let worker = Worker::new(
                    destination.clone(),
                    generation,
                    Arc::clone(self),
                    Arc::clone(&self.downstream),
                    settings,
                    Arc::clone(&handle.processed),
                );
                tokio::spawn(worker.run(rx));

                handle
            }
        }
    }

    /// Drop the entry for `destination` if it still belongs to `generation`.
    pub(crate) fn remove(&self, destination: &Destination, generation: u64) -> bool {
        self.workers
            .remove_if(destination, |_, handle| handle.generation == generation)
            .is_some()
    }

    pub fn get(&self, destination: &Destination) -> Option<WorkerHandle> {
        self.workers.get(destination).map(|entry| entry.clone())
    }

    /// Number of live workers.
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Total workers spawned since startup.
    pub fn spawned(&self) -> u64 {
        self.next_generation.load(Ordering::Relaxed) - 1
    }

    pub fn snapshot(&self) -> Vec<WorkerSnapshot> {
        let mut workers: Vec<WorkerSnapshot> = self
            .workers
            .iter()
            .map(|entry| WorkerSnapshot::from(entry.value()))
            .collect();
        workers.sort_by(|a, b| a.destination.cmp(&b.destination));
        workers
    }
}

//! Per-destination request serialization.
//!
//! # Data Flow
//! ```text
//! caller
//!     → dispatcher.rs (build envelope, bounded wait)
//!     → registry.rs (get-or-create the destination's worker)
//!     → worker.rs queue (FIFO, bounded: callers block when full)
//!     → worker.rs loop (pacing sleep → downstream GET → respond)
//!     → envelope.rs response sink (single slot, never blocks the worker)
//!     → caller
//!
//! delayed.rs: caller → GET first → sleep → GET second → caller
//!             (no registry, no worker)
//! ```
//!
//! # Design Decisions
//! - One task per destination gives ordering without locks
//! - A request's pacing interval delays the request after it
//! - Worker-side failures travel back as data in the response envelope
//! - A late result for a caller that gave up is dropped, not queued

pub mod delayed;
pub mod dispatcher;
pub mod downstream;
pub mod envelope;
pub mod registry;
pub mod types;
mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use delayed::DelayedFlow;
pub use dispatcher::Dispatcher;
pub use downstream::{Downstream, FetchRequest, HttpDownstream};
pub use envelope::{RequestEnvelope, ResponseEnvelope};
pub use registry::{Registry, WorkerHandle, WorkerSnapshot};
pub use types::{Destination, FetchError, Forwarded, GatewayError};

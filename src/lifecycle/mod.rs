//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     broadcast → HTTP server, admin server, config reload task stop
//! ```
//!
//! # Design Decisions
//! - Destination workers are not drained: all state is in-memory and
//!   disappears with the process

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;

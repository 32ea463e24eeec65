//! Passthrough gateway library.
//!
//! Forwards GET requests to arbitrary destinations, optionally serializing
//! them per destination, pacing them, or running them as a delayed pair.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod sequencer;

pub use config::schema::GatewayConfig;
pub use http::{AppState, HttpServer};
pub use lifecycle::Shutdown;

//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace and timeout layers)
//!     → request.rs (split route parameters from the downstream path)
//!     → handlers.rs (pick simple / sequenced / metered / delayed)
//!     → sequencer (dispatcher, delayed flow or direct fetch)
//!     → response.rs (relay downstream response or map the error)
//!     → Send to client
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::MakeGatewayRequestId;
pub use server::{AppState, HttpServer};

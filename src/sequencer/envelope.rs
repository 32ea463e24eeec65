//! Messages exchanged between the dispatcher and a destination's worker.

use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::sequencer::types::{Destination, Forwarded, GatewayError};

/// Exactly one of these is delivered per [`RequestEnvelope`].
pub type ResponseEnvelope = Result<Forwarded, GatewayError>;

/// A queued forwarding request.
#[derive(Debug)]
pub struct RequestEnvelope {
    pub destination: Destination,
    /// Path and query sent to the destination, always starting with `/`.
    pub path: String,
    /// Minimum gap the worker leaves after this request before taking the next one.
    pub pacing: Duration,
    pub request_id: Option<String>,
    pub enqueued_at: Instant,
    respond_to: oneshot::Sender<ResponseEnvelope>,
}

impl RequestEnvelope {
    /// Build an envelope together with the receiving half of its response sink.
    pub fn new(
        destination: Destination,
        path: impl Into<String>,
        pacing: Duration,
        request_id: Option<String>,
    ) -> (Self, oneshot::Receiver<ResponseEnvelope>) {
        let (respond_to, rx) = oneshot::channel();
        let envelope = Self {
            destination,
            path: path.into(),
            pacing,
            request_id,
            enqueued_at: Instant::now(),
            respond_to,
        };
        (envelope, rx)
    }

    /// Deliver the result, consuming the envelope.
    ///
    /// Never blocks. Returns `false` when the caller already stopped waiting,
    /// in which case the result is discarded.
    pub fn respond(self, response: ResponseEnvelope) -> bool {
        self.respond_to.send(response).is_ok()
    }

    /// True once the caller has dropped its receiver.
    pub fn is_abandoned(&self) -> bool {
        self.respond_to.is_closed()
    }
}

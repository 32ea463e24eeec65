//! Two-phase "fire, wait, fetch" requests.
//!
//! Some destinations only report a valid result some time after the command
//! that changes it. The flow sends the command, sleeps, then sends the
//! follow-up request and returns its response. Both calls run directly in the
//! caller's task; they never pass through a destination worker.

use std::sync::Arc;
use std::time::Duration;

use crate::config::SharedConfig;
use crate::sequencer::downstream::{Downstream, FetchRequest};
use crate::sequencer::types::{validate_path, Destination, Forwarded, GatewayError};

pub struct DelayedFlow {
    downstream: Arc<dyn Downstream>,
    config: SharedConfig,
}

impl DelayedFlow {
    pub fn new(downstream: Arc<dyn Downstream>, config: SharedConfig) -> Self {
        Self { downstream, config }
    }

    /// Call `first_path`, wait `delay`, call `second_path`.
    ///
    /// A failed first call returns [`GatewayError::FirstPhase`] without
    /// sleeping or sending the second call. The first response's body is read
    /// to confirm the exchange completed and then dropped; its status is not
    /// inspected.
    pub async fn run(
        &self,
        destination: &Destination,
        first_path: &str,
        second_path: &str,
        delay: Duration,
        request_id: Option<&str>,
    ) -> Result<Forwarded, GatewayError> {
        let settings = self.config.load().delayed.clone();
        if delay > settings.max_delay() {
            return Err(GatewayError::MalformedInput(format!(
                "delay {:?} exceeds the maximum of {:?}",
                delay,
                settings.max_delay()
            )));
        }
        validate_path(first_path)?;
        validate_path(second_path)?;

        tracing::info!(
            destination = %destination,
            request_id = request_id.unwrap_or("-"),
            delay_ms = delay.as_millis() as u64,
            "Executing delayed request/response"
        );

        let initial = self
            .downstream
            .fetch(FetchRequest {
                destination,
                path: first_path,
                request_id,
                timeout: settings.request_timeout(),
            })
            .await
            .map_err(|e| {
                tracing::warn!(destination = %destination, error = %e, "Initial request failed");
                GatewayError::FirstPhase(e)
            })?;

        tracing::debug!(
            destination = %destination,
            status = %initial.status,
            bytes = initial.body.len(),
            "Initial request completed"
        );

        tokio::time::sleep(delay).await;

        let response = self
            .downstream
            .fetch(FetchRequest {
                destination,
                path: second_path,
                request_id,
                timeout: settings.request_timeout(),
            })
            .await
            .map_err(|e| {
                tracing::warn!(destination = %destination, error = %e, "Second request failed");
                GatewayError::SecondPhase(e)
            })?;

        tracing::debug!(
            destination = %destination,
            status = %response.status,
            bytes = response.body.len(),
            "Second request completed"
        );
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{self, GatewayConfig};
    use crate::sequencer::testing::{Script, ScriptedDownstream};
    use crate::sequencer::types::FetchError;
    use tokio::time::Instant;

    fn flow(downstream: Arc<ScriptedDownstream>) -> DelayedFlow {
        DelayedFlow::new(downstream, config::shared(GatewayConfig::default()))
    }

    fn projector() -> Arc<ScriptedDownstream> {
        ScriptedDownstream::new(|path| match path {
            "/on" => Script::Respond { after: Duration::from_millis(100), status: 200, body: "ok" },
            "/status" => Script::Respond { after: Duration::from_millis(100), status: 200, body: r#"{"state":"on"}"# },
            _ => Script::Refuse,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_second_response_after_delay() {
        let downstream = projector();
        let t0 = Instant::now();

        let response = flow(downstream.clone())
            .run(&Destination::parse("h1").unwrap(), "/on", "/status", Duration::from_secs(2), None)
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, r#"{"state":"on"}"#);

        let calls = downstream.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].path, "/on");
        assert_eq!(calls[1].path, "/status");
        assert!(calls[1].started - calls[0].finished >= Duration::from_secs(2));
        assert!(t0.elapsed() >= Duration::from_millis(2200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_phase_connection_failure_skips_sleep_and_second_call() {
        let downstream = ScriptedDownstream::new(|path| match path {
            "/on" => Script::Refuse,
            _ => Script::Respond { after: Duration::ZERO, status: 200, body: "unexpected" },
        });
        let t0 = Instant::now();

        let result = flow(downstream.clone())
            .run(&Destination::parse("h1").unwrap(), "/on", "/status", Duration::from_secs(2), None)
            .await;

        assert!(matches!(result, Err(GatewayError::FirstPhase(FetchError::Connect { .. }))));
        assert_eq!(downstream.calls().len(), 1);
        assert!(t0.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_phase_read_failure_skips_second_call() {
        let downstream = ScriptedDownstream::new(|path| match path {
            "/on" => Script::ReadFail,
            _ => Script::Respond { after: Duration::ZERO, status: 200, body: "unexpected" },
        });
        let t0 = Instant::now();

        let result = flow(downstream.clone())
            .run(&Destination::parse("h1").unwrap(), "/on", "/status", Duration::from_secs(2), None)
            .await;

        assert!(matches!(result, Err(GatewayError::FirstPhase(FetchError::Read { .. }))));
        assert_eq!(downstream.calls().len(), 1);
        assert!(t0.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_phase_failure_is_tagged() {
        let downstream = ScriptedDownstream::new(|path| match path {
            "/on" => Script::Respond { after: Duration::ZERO, status: 200, body: "ok" },
            _ => Script::Refuse,
        });
        let t0 = Instant::now();

        let result = flow(downstream.clone())
            .run(&Destination::parse("h1").unwrap(), "/on", "/status", Duration::from_secs(2), None)
            .await;

        assert!(matches!(result, Err(GatewayError::SecondPhase(FetchError::Connect { .. }))));
        assert_eq!(downstream.calls().len(), 2);
        assert!(t0.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_status_on_first_call_still_proceeds() {
        let downstream = ScriptedDownstream::new(|path| match path {
            "/on" => Script::Respond { after: Duration::ZERO, status: 500, body: "busy" },
            _ => Script::Respond { after: Duration::ZERO, status: 200, body: "on" },
        });

        let response = flow(downstream)
            .run(&Destination::parse("h1").unwrap(), "/on", "/status", Duration::from_millis(500), None)
            .await
            .unwrap();
        assert_eq!(response.body, "on");
    }

    #[tokio::test]
    async fn test_delay_above_maximum_is_rejected() {
        let downstream = projector();

        let result = flow(downstream.clone())
            .run(&Destination::parse("h1").unwrap(), "/on", "/status", Duration::from_secs(26), None)
            .await;

        assert!(matches!(result, Err(GatewayError::MalformedInput(_))));
        assert!(downstream.calls().is_empty());
    }
}

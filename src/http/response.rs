//! Outbound response construction.
//!
//! # Responsibilities
//! - Relay a downstream status, content type and body to the caller
//! - Map gateway errors to a status code and a JSON message
//!
//! # Design Decisions
//! - Downstream bodies are relayed byte for byte
//! - A content type the client cannot represent as a header is dropped
//! - Error bodies are `{"error": "<message>"}`; the request ID travels in
//!   the `x-request-id` response header

use axum::{
    body::Body,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::sequencer::{Forwarded, GatewayError};

impl IntoResponse for Forwarded {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        if let Some(value) = self
            .content_type
            .as_deref()
            .and_then(|ct| HeaderValue::from_str(ct).ok())
        {
            response.headers_mut().insert(header::CONTENT_TYPE, value);
        }
        response
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::http::StatusCode;
    use crate::sequencer::FetchError;

    #[tokio::test]
    async fn test_forwarded_relays_status_type_and_body() {
        let response = Forwarded {
            status: StatusCode::ACCEPTED,
            content_type: Some("application/json".into()),
            body: Bytes::from_static(br#"{"state":"on"}"#),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(body, r#"{"state":"on"}"#);
    }

    #[tokio::test]
    async fn test_error_is_json_message() {
        let error = GatewayError::SecondPhase(FetchError::Connect {
            target: "http://h1/status".into(),
            reason: "connection refused".into(),
        });
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let message = value["error"].as_str().unwrap();
        assert!(message.contains("second request failed"));
        assert!(message.contains("http://h1/status"));
    }
}

//! `POST /inbound`: the message transport.
//!
//! The request body is the raw message. Envelope addresses come from the
//! `from`/`to` query parameters, then `X-Envelope-From`/`X-Envelope-To`
//! request headers, then the message's own `From`/`To` headers.
//!
//! A body over the configured limit is refused with the same JSON shape as
//! any other reject.

use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use serde::Deserialize;

use super::AppState;
use crate::intake::Decision;
use crate::message::{InboundMessage, RawMessage};

#[derive(Debug, Default, Deserialize)]
pub struct Envelope {
    pub from: Option<String>,
    pub to: Option<String>,
}

pub async fn receive(
    State(state): State<AppState>,
    Query(envelope): Query<Envelope>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> impl IntoResponse {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            tracing::warn!(error = %rejection.body_text(), "Inbound message not read");
            return (
                rejection.status(),
                Json(serde_json::json!({ "status": "rejected", "reason": rejection.body_text() })),
            );
        }
    };
    let message = RawMessage::new("", "", body.to_vec());
    let from = envelope_address(envelope.from, &headers, "x-envelope-from")
        .or_else(|| message.headers().get("from").map(str::to_string))
        .unwrap_or_default();
    let to = envelope_address(envelope.to, &headers, "x-envelope-to")
        .or_else(|| message.headers().get("to").map(str::to_string))
        .unwrap_or_default();
    let message = message.with_envelope(from, to);

    match state.intake.process(&message, &state.config).await {
        Decision::Accept => (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({ "status": "accepted" })),
        ),
        Decision::Reject(reason) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({ "status": "rejected", "reason": reason })),
        ),
    }
}

fn envelope_address(query: Option<String>, headers: &HeaderMap, name: &str) -> Option<String> {
    query
        .or_else(|| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn query_wins_over_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-envelope-from", HeaderValue::from_static("h@example.com"));
        assert_eq!(
            envelope_address(Some("q@example.com".into()), &headers, "x-envelope-from"),
            Some("q@example.com".into())
        );
        assert_eq!(
            envelope_address(None, &headers, "x-envelope-from"),
            Some("h@example.com".into())
        );
    }

    #[test]
    fn blank_address_is_absent() {
        assert_eq!(envelope_address(Some("  ".into()), &HeaderMap::new(), "x"), None);
    }
}

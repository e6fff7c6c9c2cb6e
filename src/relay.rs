//! Single-shot delivery of a normalized record to the downstream API.

use std::fmt;
use std::time::Duration;

use crate::config::{DEFAULT_RELAY_TIMEOUT, RelayConfig};
use crate::error::RelayError;
use crate::normalize::NormalizedRecord;

/// Path the records are posted to, relative to the API endpoint.
pub const EMAILS_PATH: &str = "/api/v1/emails";

/// Result of one relay attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// 2xx response.
    Delivered { status: u16, body: String },
    /// Any other completed response.
    Rejected { status: u16, body: String },
    /// No response: connection, DNS, TLS or timeout failure.
    Unreachable { error: String },
}

impl RelayOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }

    /// `Ok(status)` for a delivered record, the relay error otherwise.
    pub fn into_result(self) -> Result<u16, RelayError> {
        match self {
            Self::Delivered { status, .. } => Ok(status),
            Self::Rejected { status, body } => Err(RelayError::Rejected { status, body }),
            Self::Unreachable { error } => Err(RelayError::Unreachable(error)),
        }
    }
}

impl fmt::Display for RelayOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delivered { status, .. } => write!(f, "delivered ({status})"),
            Self::Rejected { status, .. } => write!(f, "rejected ({status})"),
            Self::Unreachable { error } => write!(f, "unreachable: {error}"),
        }
    }
}

/// Posts records with bearer auth. No retries.
#[derive(Debug, Clone)]
pub struct RelayClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl Default for RelayClient {
    fn default() -> Self {
        Self::new(DEFAULT_RELAY_TIMEOUT)
    }
}

impl RelayClient {
    pub fn new(timeout: Duration) -> Self {
        Self::with_client(reqwest::Client::new(), timeout)
    }

    pub fn with_client(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub fn emails_url(endpoint: &str) -> String {
        format!("{}{EMAILS_PATH}", endpoint.trim_end_matches('/'))
    }

    /// POST `record` as JSON to `{endpoint}/api/v1/emails`.
    pub async fn deliver(&self, record: &NormalizedRecord, config: &RelayConfig) -> RelayOutcome {
        let (endpoint, token) = match config.require() {
            Ok(pair) => pair,
            Err(e) => {
                return RelayOutcome::Unreachable {
                    error: e.to_string(),
                };
            }
        };

        let result = self
            .client
            .post(Self::emails_url(endpoint))
            .bearer_auth(token)
            .timeout(self.timeout)
            .json(record)
            .send()
            .await;

        let resp = match result {
            Ok(resp) => resp,
            Err(e) => {
                return RelayOutcome::Unreachable {
                    error: describe_transport_error(&e, self.timeout),
                };
            }
        };

        let status = resp.status();
        let body = read_body(resp, self.timeout).await;
        if status.is_success() {
            RelayOutcome::Delivered {
                status: status.as_u16(),
                body,
            }
        } else {
            RelayOutcome::Rejected {
                status: status.as_u16(),
                body,
            }
        }
    }
}

/// Response body as text. A failed read is logged and yields an empty body;
/// the status has already decided the outcome.
pub async fn read_body(resp: reqwest::Response, timeout: Duration) -> String {
    let url = resp.url().to_string();
    let status = resp.status().as_u16();
    match resp.text().await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(
                %url,
                status,
                error = %describe_transport_error(&e, timeout),
                "Failed to read response body"
            );
            String::new()
        }
    }
}

/// Human-readable transport failure, with timeouts called out explicitly.
///
/// reqwest's own message only names the request; the cause (refused
/// connection, DNS, TLS) lives in the source chain, so the chain is joined
/// with `": "`.
pub fn describe_transport_error(err: &reqwest::Error, timeout: Duration) -> String {
    if err.is_timeout() {
        return format!("request timed out after {}ms", timeout.as_millis());
    }
    error_chain(err)
}

/// `Display` of `err` followed by each distinct source.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !text.is_empty() && !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

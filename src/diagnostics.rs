//! Endpoint diagnostics. Checks the downstream API configuration and
//! probes `{endpoint}/health`.
//!
//! Shape problems are reported before any network call:
//! 1. endpoint missing
//! 2. token missing
//! 3. host is an IP literal or `localhost`
//! 4. endpoint is not a domain-qualified URL
//! 5. otherwise `GET /health` with bearer auth under a hard timeout
//!
//! Every call builds a fresh `HealthResult`; nothing is cached.

use std::net::IpAddr;
use std::time::Duration;

use regex::Regex;
use serde::Serialize;

use crate::config::{DEFAULT_PROBE_TIMEOUT, RelayConfig};
use crate::relay::{describe_transport_error, read_body};

/// Path probed on the downstream API.
pub const HEALTH_PATH: &str = "/health";

/// User agent sent with the probe.
pub const PROBE_USER_AGENT: &str = "mail-relay-health-check";

/// Probe responses longer than this are cut before being reported.
pub const MAX_RESPONSE_CHARS: usize = 2048;

/// Outcome of one diagnostics run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthResult {
    pub success: bool,
    pub message: String,
    pub debug_info: Option<DebugInfo>,
}

/// Request details attached to a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DebugInfo {
    pub url: String,
    pub method: String,
    #[serde(flatten)]
    pub detail: DebugDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DebugDetail {
    /// The probe completed with an HTTP response.
    Response { status: u16, response: String },
    /// Validation or network failure.
    Failure { error: String, solution: String },
}

impl DebugInfo {
    fn get(url: &str, detail: DebugDetail) -> Self {
        Self {
            url: url.to_string(),
            method: "GET".into(),
            detail,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match &self.detail {
            DebugDetail::Response { status, .. } => Some(*status),
            DebugDetail::Failure { .. } => None,
        }
    }

    pub fn solution(&self) -> Option<&str> {
        match &self.detail {
            DebugDetail::Failure { solution, .. } => Some(solution),
            DebugDetail::Response { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.detail {
            DebugDetail::Failure { error, .. } => Some(error),
            DebugDetail::Response { .. } => None,
        }
    }
}

impl HealthResult {
    fn failure(message: impl Into<String>, debug_info: Option<DebugInfo>) -> Self {
        Self {
            success: false,
            message: message.into(),
            debug_info,
        }
    }
}

pub struct EndpointDiagnostics {
    client: reqwest::Client,
    timeout: Duration,
    domain_url: Regex,
}

impl Default for EndpointDiagnostics {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_TIMEOUT)
    }
}

impl EndpointDiagnostics {
    pub fn new(timeout: Duration) -> Self {
        Self::with_client(reqwest::Client::new(), timeout)
    }

    pub fn with_client(client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            client,
            timeout,
            domain_url: Regex::new(r"^https?://[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").unwrap(),
        }
    }

    /// Validate the configuration and probe the endpoint.
    pub async fn check(&self, config: &RelayConfig) -> HealthResult {
        let Some(endpoint) = config.endpoint() else {
            return HealthResult::failure("API endpoint not configured", None);
        };
        let Ok((_, token)) = config.require() else {
            return HealthResult::failure("API token not configured", None);
        };

        let health_url = format!("{}{HEALTH_PATH}", endpoint.trim_end_matches('/'));

        if is_non_domain_host(endpoint) {
            return HealthResult::failure(
                "The relay can only reach domain-named hosts",
                Some(DebugInfo::get(
                    &health_url,
                    DebugDetail::Failure {
                        error: "The hosting runtime cannot reach IP addresses or localhost; \
                                the endpoint must use a domain name"
                            .into(),
                        solution: "Set API_ENDPOINT to a domain URL, e.g. https://your-domain.com \
                                   or https://api.example.com"
                            .into(),
                    },
                )),
            );
        }

        if !self.domain_url.is_match(endpoint) {
            return HealthResult::failure(
                "API endpoint format is invalid",
                Some(DebugInfo::get(
                    &health_url,
                    DebugDetail::Failure {
                        error: "API_ENDPOINT must be a complete domain URL".into(),
                        solution: "Use the form https://your-domain.com or http://your-domain.com"
                            .into(),
                    },
                )),
            );
        }

        self.probe(&health_url, token).await
    }

    async fn probe(&self, health_url: &str, token: &str) -> HealthResult {
        let result = self
            .client
            .get(health_url)
            .bearer_auth(token)
            .header(reqwest::header::USER_AGENT, PROBE_USER_AGENT)
            .timeout(self.timeout)
            .send()
            .await;

        let resp = match result {
            Ok(resp) => resp,
            Err(e) => {
                let error = describe_transport_error(&e, self.timeout);
                tracing::warn!(url = health_url, %error, "Health probe failed");
                return HealthResult::failure(
                    format!("Unable to connect to API server: {error}"),
                    Some(DebugInfo::get(
                        health_url,
                        DebugDetail::Failure {
                            error,
                            solution: "Check that the API server is running and reachable \
                                       at the configured domain"
                                .into(),
                        },
                    )),
                );
            }
        };

        let status = resp.status();
        let body = read_body(resp, self.timeout).await;
        let debug_info = Some(DebugInfo::get(
            health_url,
            DebugDetail::Response {
                status: status.as_u16(),
                response: truncate_chars(&body, MAX_RESPONSE_CHARS),
            },
        ));

        tracing::debug!(url = health_url, status = status.as_u16(), "Health probe completed");

        if status.is_success() {
            HealthResult {
                success: true,
                message: format!("API server responded normally (status: {})", status.as_u16()),
                debug_info,
            }
        } else {
            HealthResult::failure(
                format!("API server returned an error (status: {})", status.as_u16()),
                debug_info,
            )
        }
    }
}

/// True when the endpoint's host is an IP literal or `localhost`.
///
/// A host made only of dotted numeric labels counts as an IP literal even
/// when it is not a valid address (`999.1.1.1`).
pub fn is_non_domain_host(endpoint: &str) -> bool {
    let Some(host) = endpoint_host(endpoint) else {
        return false;
    };
    let host = host.trim_start_matches('[').trim_end_matches(']');
    host.eq_ignore_ascii_case("localhost")
        || host.parse::<IpAddr>().is_ok()
        || is_dotted_numeric(host)
}

/// Host part of `endpoint`. Falls back to a plain split of the authority when
/// the URL parser rejects the host.
fn endpoint_host(endpoint: &str) -> Option<String> {
    if let Ok(url) = reqwest::Url::parse(endpoint) {
        return url.host_str().map(str::to_string);
    }
    let (_, rest) = endpoint.split_once("://")?;
    let authority = rest.split(['/', '?', '#']).next()?;
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, h)| h);
    let host = if host_port.starts_with('[') {
        host_port.split_once(']').map_or(host_port, |(h, _)| h)
    } else {
        host_port.split(':').next().unwrap_or(host_port)
    };
    (!host.is_empty()).then(|| host.to_string())
}

fn is_dotted_numeric(host: &str) -> bool {
    let labels: Vec<&str> = host.split('.').collect();
    labels.len() == 4
        && labels
            .iter()
            .all(|l| !l.is_empty() && l.bytes().all(|b| b.is_ascii_digit()))
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

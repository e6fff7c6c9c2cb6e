//! Configuration types.

use std::net::SocketAddr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::error::{ConfigError, Result};

/// Default upper bound for one relay call.
pub const DEFAULT_RELAY_TIMEOUT: Duration = Duration::from_secs(30);

/// Hard bound for the diagnostics probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Largest inbound message accepted by the transport.
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 25 * 1024 * 1024;

const DEFAULT_BIND: &str = "0.0.0.0:8787";

/// Downstream API settings. Read-only for the lifetime of the process.
///
/// Both fields are optional here so that a half-configured deployment still
/// starts: the intake path rejects every message and the diagnostics probe
/// reports what is missing.
#[derive(Debug, Clone, Default)]
pub struct RelayConfig {
    /// Base URL of the downstream API, without trailing slash.
    pub api_endpoint: Option<String>,
    /// Bearer token for the downstream API.
    pub api_token: Option<SecretString>,
}

impl RelayConfig {
    pub fn new(api_endpoint: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            api_endpoint: non_empty(api_endpoint.into()).map(|e| e.trim_end_matches('/').to_string()),
            api_token: non_empty(api_token.into()).map(SecretString::from),
        }
    }

    /// Build config from `API_ENDPOINT` and `API_TOKEN`.
    /// Unset or blank variables are treated as absent.
    pub fn from_env() -> Self {
        Self::new(
            std::env::var("API_ENDPOINT").unwrap_or_default(),
            std::env::var("API_TOKEN").unwrap_or_default(),
        )
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.api_endpoint.as_deref()
    }

    pub fn token_configured(&self) -> bool {
        self.api_token.is_some()
    }

    /// Return `(endpoint, token)` or the first missing setting.
    pub fn require(&self) -> std::result::Result<(&str, &str), ConfigError> {
        let endpoint = self
            .endpoint()
            .ok_or_else(|| ConfigError::missing("API_ENDPOINT", "API endpoint not configured"))?;
        let token = self
            .api_token
            .as_ref()
            .map(|t| t.expose_secret())
            .ok_or_else(|| ConfigError::missing("API_TOKEN", "API token not configured"))?;
        Ok((endpoint, token))
    }
}

/// HTTP service settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub relay_timeout: Duration,
    pub probe_timeout: Duration,
    pub max_message_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: ([0, 0, 0, 0], 8787).into(),
            relay_timeout: DEFAULT_RELAY_TIMEOUT,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
        }
    }
}

impl ServerConfig {
    /// Build config from `MAIL_RELAY_BIND`, `MAIL_RELAY_TIMEOUT_SECS`,
    /// `MAIL_RELAY_PROBE_TIMEOUT_SECS` and `MAIL_RELAY_MAX_MESSAGE_BYTES`.
    pub fn from_env() -> Result<Self> {
        let bind_raw = std::env::var("MAIL_RELAY_BIND").unwrap_or_else(|_| DEFAULT_BIND.into());
        let bind = bind_raw
            .parse()
            .map_err(|e| ConfigError::InvalidValue {
                key: "MAIL_RELAY_BIND".into(),
                message: format!("{bind_raw}: {e}"),
            })?;

        Ok(Self {
            bind,
            relay_timeout: secs_from_env("MAIL_RELAY_TIMEOUT_SECS", DEFAULT_RELAY_TIMEOUT)?,
            probe_timeout: secs_from_env("MAIL_RELAY_PROBE_TIMEOUT_SECS", DEFAULT_PROBE_TIMEOUT)?,
            max_message_bytes: match std::env::var("MAIL_RELAY_MAX_MESSAGE_BYTES") {
                Ok(raw) => parse_positive("MAIL_RELAY_MAX_MESSAGE_BYTES", &raw)?,
                Err(_) => DEFAULT_MAX_MESSAGE_BYTES,
            },
        })
    }
}

fn secs_from_env(key: &str, default: Duration) -> std::result::Result<Duration, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => parse_positive(key, &raw).map(Duration::from_secs),
        Err(_) => Ok(default),
    }
}

fn parse_positive<T>(key: &str, raw: &str) -> std::result::Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    raw.trim()
        .parse::<T>()
        .ok()
        .filter(|n| *n > T::default())
        .ok_or_else(|| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a positive number, got {raw:?}"),
        })
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

//! Error types for the mail relay.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

impl ConfigError {
    pub fn missing(key: &str, hint: &str) -> Self {
        Self::MissingRequired {
            key: key.to_string(),
            hint: hint.to_string(),
        }
    }
}

/// Failure of a single content source (raw stream, text or HTML accessor).
///
/// Always recovered inside the extractor; never surfaced to the transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("source unavailable: {0}")]
    Unavailable(String),

    #[error("read failed: {0}")]
    Read(String),

    #[error("decode failed: {0}")]
    Decode(String),
}

/// Relay call failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    #[error("API request failed: {status}")]
    Rejected { status: u16, body: String },

    #[error("API unreachable: {0}")]
    Unreachable(String),
}

/// Reasons an intake cycle ends in a reject.
///
/// The `Display` output is the reason string handed back to the transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntakeError {
    #[error("{0}")]
    Configuration(String),

    #[error("API request failed: {status}")]
    RelayRejected { status: u16 },

    #[error("API unreachable: {0}")]
    RelayUnreachable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RelayError> for IntakeError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::Rejected { status, .. } => Self::RelayRejected { status },
            RelayError::Unreachable(msg) => Self::RelayUnreachable(msg),
        }
    }
}

/// Result type alias for the relay.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_reason_embeds_status() {
        let err: IntakeError = RelayError::Rejected {
            status: 503,
            body: "down".into(),
        }
        .into();
        assert_eq!(err.to_string(), "API request failed: 503");
    }

    #[test]
    fn unreachable_reason_embeds_error() {
        let err: IntakeError = RelayError::Unreachable("connection refused".into()).into();
        assert_eq!(err.to_string(), "API unreachable: connection refused");
    }

    #[test]
    fn config_error_converts_to_top_level() {
        let err: Error = ConfigError::InvalidValue {
            key: "MAIL_RELAY_BIND".into(),
            message: "nope".into(),
        }
        .into();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(
            err.to_string(),
            "Configuration error: Invalid configuration value for MAIL_RELAY_BIND: nope"
        );
    }

    #[test]
    fn missing_config_message_has_hint() {
        let err = ConfigError::missing("API_TOKEN", "Set the bearer token.");
        assert_eq!(
            err.to_string(),
            "Missing required configuration: API_TOKEN. Set the bearer token."
        );
    }
}

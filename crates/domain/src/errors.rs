//! Error types used throughout the launch client

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

/// Categories of launch-client errors for retry and display logic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Authorization handshake failures (discovery, exchange, state, context)
    Authorization,
    /// Bearer token rejected and could not be renewed
    Authentication,
    /// Server rejected a write (version conflict or validation failure)
    Conflict,
    /// Transport-level failures (connect, timeout)
    Network,
    /// Server errors (5xx)
    Server,
    /// Client errors (4xx other than auth and conflict)
    Client,
    /// Local configuration or input problems
    Config,
}

/// Main error type for the SMART launch client
#[derive(Error, Debug)]
pub enum SmartError {
    #[error("SMART discovery failed for {issuer}: {message}")]
    Discovery { issuer: String, message: String },

    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    #[error("Token refresh failed: {0}")]
    TokenRefresh(String),

    #[error("Authentication failed - please reauthorize ({0})")]
    AuthenticationExpired(String),

    #[error("Missing authorization context: {0}")]
    MissingContext(String),

    #[error("Invalid state parameter")]
    InvalidState,

    #[error("Resource conflict ({status}): {message}")]
    ResourceConflict {
        status: u16,
        message: String,
        /// `OperationOutcome.issue` entries returned by the server
        issues: Vec<Value>,
        /// Full response body (JSON when parseable, otherwise a string value)
        body: Value,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("{url} returned status {status}")]
    Http { status: u16, url: String, body: String },

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SmartError {
    /// Build the error for a non-success FHIR response.
    ///
    /// 409, 412 and 422 become [`SmartError::ResourceConflict`] with the
    /// server's issue list attached; everything else is [`SmartError::Http`].
    pub fn from_status(status: u16, url: impl Into<String>, body: String) -> Self {
        match status {
            409 | 412 | 422 => Self::resource_conflict(status, body),
            _ => Self::Http { status, url: url.into(), body },
        }
    }

    fn resource_conflict(status: u16, body: String) -> Self {
        let parsed: Value = serde_json::from_str(&body).unwrap_or(Value::String(body));
        let issues = parsed.get("issue").and_then(Value::as_array).cloned().unwrap_or_default();

        let details: Vec<&str> = issues
            .iter()
            .filter_map(|issue| {
                issue
                    .get("diagnostics")
                    .and_then(Value::as_str)
                    .or_else(|| issue.pointer("/details/text").and_then(Value::as_str))
            })
            .collect();

        let message = if details.is_empty() {
            match status {
                422 => "resource failed server validation".to_string(),
                _ => "resource version does not match the server".to_string(),
            }
        } else {
            details.join("; ")
        };

        Self::ResourceConflict { status, message, issues, body: parsed }
    }

    /// HTTP status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } | Self::ResourceConflict { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the server rejected the bearer token (HTTP 401)
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Get the error category for this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Discovery { .. }
            | Self::TokenExchange(_)
            | Self::TokenRefresh(_)
            | Self::MissingContext(_)
            | Self::InvalidState => ErrorCategory::Authorization,
            Self::AuthenticationExpired(_) => ErrorCategory::Authentication,
            Self::ResourceConflict { .. } => ErrorCategory::Conflict,
            Self::Network(_) | Self::Timeout(_) => ErrorCategory::Network,
            Self::Http { status, .. } if *status == 401 || *status == 403 => {
                ErrorCategory::Authentication
            }
            Self::Http { status, .. } if *status >= 500 => ErrorCategory::Server,
            Self::Http { .. } => ErrorCategory::Client,
            Self::Config(_) | Self::InvalidInput(_) | Self::Serialization(_) => {
                ErrorCategory::Config
            }
        }
    }

    /// Transient failures that a transport-level retry may resolve
    pub fn should_retry(&self) -> bool {
        matches!(self.category(), ErrorCategory::Network | ErrorCategory::Server)
    }
}

impl From<serde_json::Error> for SmartError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias for launch-client operations
pub type Result<T> = std::result::Result<T, SmartError>;

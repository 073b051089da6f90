//! Conversions from external infrastructure errors into domain errors.

use reqwest::Error as HttpError;
use smartlaunch_common::auth::OAuthClientError;
use smartlaunch_domain::SmartError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub SmartError);

impl From<InfraError> for SmartError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<SmartError> for InfraError {
    fn from(value: SmartError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoSmartError {
    fn into_smart(self) -> SmartError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → SmartError */
/* -------------------------------------------------------------------------- */

impl IntoSmartError for HttpError {
    fn into_smart(self) -> SmartError {
        if self.is_timeout() {
            return SmartError::Network("HTTP request timed out".into());
        }

        #[cfg(not(target_arch = "wasm32"))]
        if self.is_connect() {
            return SmartError::Network("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            let url = self.url().map(ToString::to_string).unwrap_or_default();
            let reason = status.canonical_reason().unwrap_or("unknown status");
            return SmartError::from_status(status.as_u16(), url, reason.to_string());
        }

        if self.is_decode() || self.is_body() {
            return SmartError::Serialization(self.to_string());
        }

        SmartError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_smart())
    }
}

/* -------------------------------------------------------------------------- */
/* OAuthClientError → SmartError (with the operation that failed) */
/* -------------------------------------------------------------------------- */

/// Map a discovery failure for `issuer`.
pub fn discovery_error(issuer: &str, err: OAuthClientError) -> SmartError {
    SmartError::Discovery { issuer: issuer.to_string(), message: err.to_string() }
}

/// Map an authorization-code exchange failure.
pub fn exchange_error(err: OAuthClientError) -> SmartError {
    SmartError::TokenExchange(err.to_string())
}

/// Map a refresh-token exchange failure.
pub fn refresh_error(err: OAuthClientError) -> SmartError {
    SmartError::TokenRefresh(err.to_string())
}

/// Map a failure to build the authorization request.
pub fn authorization_error(err: OAuthClientError) -> SmartError {
    match err {
        OAuthClientError::ConfigError(message) => SmartError::Config(message),
        other => SmartError::Config(other.to_string()),
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

//! OAuth 2.0 and SMART App Launch types
//!
//! Token sets carry the SMART launch context (`patient`, `encounter`) that the
//! authorization server returns alongside the access token.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OAuth 2.0 access and refresh tokens with SMART launch context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    /// Bearer token for FHIR requests
    pub access_token: String,

    /// Refresh token; absent when `offline_access`/`online_access` was not
    /// granted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// ID token (JWT) when `openid` was granted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,

    /// Token type (always "Bearer" for SMART)
    pub token_type: String,

    /// Access token lifetime in seconds (0 when the server omits it)
    pub expires_in: i64,

    /// Absolute expiration timestamp (UTC)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// Granted scopes (space-separated)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Patient in context at launch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient: Option<String>,

    /// Encounter in context at launch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encounter: Option<String>,
}

impl TokenSet {
    /// Create a new `TokenSet` with calculated expiration time
    ///
    /// The `expires_at` timestamp is derived from `expires_in` when positive.
    #[must_use]
    pub fn new(
        access_token: String,
        refresh_token: Option<String>,
        id_token: Option<String>,
        expires_in: i64,
        scope: Option<String>,
    ) -> Self {
        let expires_at = if expires_in > 0 {
            Some(Utc::now() + chrono::Duration::seconds(expires_in))
        } else {
            None
        };

        Self {
            access_token,
            refresh_token,
            id_token,
            token_type: "Bearer".to_string(),
            expires_in,
            expires_at,
            scope,
            patient: None,
            encounter: None,
        }
    }

    /// Attach SMART launch context
    #[must_use]
    pub fn with_context(mut self, patient: Option<String>, encounter: Option<String>) -> Self {
        self.patient = patient;
        self.encounter = encounter;
        self
    }
}

/// Token endpoint response (RFC 6749 §5.1 plus SMART context parameters)
///
/// `access_token` is optional here so a success response without one can be
/// reported precisely instead of as a parse failure.
#[derive(Debug, Default, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
    pub token_type: Option<String>,
    pub expires_in: Option<i64>,
    pub scope: Option<String>,
    pub patient: Option<String>,
    pub encounter: Option<String>,
}

impl TokenResponse {
    /// Convert into a `TokenSet`, or `None` when `access_token` is missing or
    /// empty.
    #[must_use]
    pub fn into_token_set(self) -> Option<TokenSet> {
        let access_token = self.access_token.filter(|token| !token.is_empty())?;
        let mut tokens = TokenSet::new(
            access_token,
            self.refresh_token,
            self.id_token,
            self.expires_in.unwrap_or_default(),
            self.scope,
        )
        .with_context(self.patient, self.encounter);
        if let Some(token_type) = self.token_type {
            tokens.token_type = token_type;
        }
        Some(tokens)
    }
}

/// Static client identity for a public SMART client
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    /// OAuth client ID registered with the EHR
    pub client_id: String,

    /// Redirect URI registered with the EHR
    pub redirect_uri: String,

    /// Scopes to request
    pub scopes: Vec<String>,
}

impl OAuthConfig {
    /// Create a new OAuth configuration
    #[must_use]
    pub fn new(client_id: String, redirect_uri: String, scopes: Vec<String>) -> Self {
        Self { client_id, redirect_uri, scopes }
    }

    /// Get scopes as space-separated string
    #[must_use]
    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }
}

/// `.well-known/smart-configuration` document
///
/// Only the two endpoints are required; a document missing either fails to
/// deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartConfiguration {
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub code_challenge_methods_supported: Vec<String>,
    #[serde(default)]
    pub scopes_supported: Vec<String>,
    #[serde(default)]
    pub grant_types_supported: Vec<String>,
}

impl SmartConfiguration {
    /// Whether the server advertises S256 PKCE.
    ///
    /// An empty list means the server did not say; callers proceed with S256.
    #[must_use]
    pub fn supports_s256(&self) -> bool {
        self.code_challenge_methods_supported.is_empty()
            || self.code_challenge_methods_supported.iter().any(|method| method == "S256")
    }
}

/// OAuth error response from authorization server
///
/// Standard OAuth 2.0 error response format (RFC 6749 §5.2).
#[derive(Debug, Deserialize)]
pub struct OAuthError {
    pub error: String,
    pub error_description: Option<String>,
}

impl fmt::Display for OAuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_description {
            Some(desc) => write!(f, "{}: {}", self.error, desc),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for OAuthError {}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::types.
    use super::*;

    /// Validates `TokenSet::new` behavior for the token set creation scenario.
    ///
    /// Assertions:
    /// - Confirms `token_set.access_token` equals `"access_token_123"`.
    /// - Ensures `token_set.expires_at.is_some()` evaluates to true.
    /// - Confirms `token_set.token_type` equals `"Bearer"`.
    /// - Ensures launch context starts empty.
    #[test]
    fn test_token_set_creation() {
        let token_set = TokenSet::new(
            "access_token_123".to_string(),
            Some("refresh_token_456".to_string()),
            None,
            3600,
            Some("openid fhirUser".to_string()),
        );

        assert_eq!(token_set.access_token, "access_token_123");
        assert_eq!(token_set.refresh_token, Some("refresh_token_456".to_string()));
        assert!(token_set.expires_at.is_some());
        assert_eq!(token_set.token_type, "Bearer");
        assert!(token_set.patient.is_none());
        assert!(token_set.encounter.is_none());
    }

    /// Validates the SMART token response conversion scenario.
    ///
    /// Assertions:
    /// - Confirms patient and encounter context are carried over.
    /// - Confirms the refresh token is carried over.
    /// - Confirms a missing `expires_in` yields no expiry timestamp.
    #[test]
    fn test_token_response_conversion() {
        let response: TokenResponse = serde_json::from_str(
            r#"{
                "access_token": "access123",
                "token_type": "Bearer",
                "refresh_token": "refresh456",
                "scope": "launch openid",
                "patient": "12724066",
                "encounter": "97939518"
            }"#,
        )
        .unwrap();

        let token_set = response.into_token_set().unwrap();

        assert_eq!(token_set.access_token, "access123");
        assert_eq!(token_set.refresh_token.as_deref(), Some("refresh456"));
        assert_eq!(token_set.patient.as_deref(), Some("12724066"));
        assert_eq!(token_set.encounter.as_deref(), Some("97939518"));
        assert_eq!(token_set.expires_in, 0);
        assert!(token_set.expires_at.is_none());
    }

    /// Validates the missing access token scenario.
    ///
    /// Assertions:
    /// - Ensures a response without `access_token` converts to `None`.
    /// - Ensures an empty `access_token` converts to `None`.
    #[test]
    fn test_token_response_without_access_token() {
        let missing: TokenResponse = serde_json::from_str(r#"{"token_type":"Bearer"}"#).unwrap();
        assert!(missing.into_token_set().is_none());

        let empty = TokenResponse { access_token: Some(String::new()), ..Default::default() };
        assert!(empty.into_token_set().is_none());
    }

    /// Validates the smart configuration parsing scenario.
    ///
    /// Assertions:
    /// - Confirms both endpoints are read.
    /// - Ensures S256 support is detected.
    /// - Ensures a document missing `token_endpoint` fails to parse.
    #[test]
    fn test_smart_configuration_parsing() {
        let config: SmartConfiguration = serde_json::from_str(
            r#"{
                "authorization_endpoint": "https://auth.example/authorize",
                "token_endpoint": "https://auth.example/token",
                "capabilities": ["launch-ehr", "client-public"],
                "code_challenge_methods_supported": ["S256"]
            }"#,
        )
        .unwrap();

        assert_eq!(config.authorization_endpoint, "https://auth.example/authorize");
        assert_eq!(config.token_endpoint, "https://auth.example/token");
        assert!(config.supports_s256());

        let incomplete = serde_json::from_str::<SmartConfiguration>(
            r#"{"authorization_endpoint": "https://auth.example/authorize"}"#,
        );
        assert!(incomplete.is_err());
    }

    /// Validates `OAuthConfig::scope_string`.
    ///
    /// Assertions:
    /// - Confirms scopes are joined with single spaces.
    #[test]
    fn test_oauth_config_scope_string() {
        let config = OAuthConfig::new(
            "client123".to_string(),
            "http://127.0.0.1:5173".to_string(),
            vec!["openid".to_string(), "launch".to_string()],
        );

        assert_eq!(config.scope_string(), "openid launch");
    }

    /// Validates the oauth error display scenario.
    ///
    /// Assertions:
    /// - Ensures description is appended when present.
    /// - Confirms the bare code is shown otherwise.
    #[test]
    fn test_oauth_error_display() {
        let error = OAuthError {
            error: "invalid_grant".to_string(),
            error_description: Some("The refresh token is invalid".to_string()),
        };
        assert_eq!(error.to_string(), "invalid_grant: The refresh token is invalid");

        let error = OAuthError { error: "invalid_request".to_string(), error_description: None };
        assert_eq!(error.to_string(), "invalid_request");
    }
}

//! SMART-on-FHIR OAuth 2.0 client with PKCE support
//!
//! Handles the network side of the SMART App Launch handshake:
//! - Discovery of `.well-known/smart-configuration`
//! - Authorization URL building
//! - Authorization code exchange
//! - Token refresh (with refresh token rotation)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use tracing::{debug, instrument, warn};
use url::Url;

use super::traits::OAuthClientTrait;
use super::types::{OAuthConfig, OAuthError, SmartConfiguration, TokenResponse, TokenSet};

/// Default request timeout for discovery and token calls
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Error type for OAuth client operations
#[derive(Debug)]
pub enum OAuthClientError {
    /// HTTP request failed
    RequestFailed(reqwest::Error),

    /// OAuth server returned an RFC 6749 error body
    OAuthError(OAuthError),

    /// Server returned a non-success status without an OAuth error body
    HttpStatus { status: u16, body: String },

    /// Token response lacked `access_token`
    MissingAccessToken,

    /// Failed to parse response
    ParseError(String),

    /// No refresh token available
    NoRefreshToken,

    /// Invalid configuration
    ConfigError(String),
}

impl OAuthClientError {
    /// HTTP status carried by the error, if any
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RequestFailed(e) => e.status().map(|status| status.as_u16()),
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl std::fmt::Display for OAuthClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RequestFailed(e) => write!(f, "HTTP request failed: {e}"),
            Self::OAuthError(e) => write!(f, "OAuth error: {e}"),
            Self::HttpStatus { status, body } => write!(f, "HTTP {status}: {body}"),
            Self::MissingAccessToken => write!(f, "Token response did not include access_token"),
            Self::ParseError(msg) => write!(f, "Parse error: {msg}"),
            Self::NoRefreshToken => write!(f, "No refresh token available"),
            Self::ConfigError(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

impl std::error::Error for OAuthClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::RequestFailed(e) => Some(e),
            Self::OAuthError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for OAuthClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::RequestFailed(err)
    }
}

/// SMART-on-FHIR OAuth 2.0 client for public (secretless) apps
///
/// Endpoints are not configured up front; they come from discovery against
/// the launching EHR's issuer.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    config: OAuthConfig,
    client: Client,
}

impl OAuthClient {
    /// Create a new OAuth client with the default timeout
    ///
    /// # Examples
    /// ```
    /// use smartlaunch_common::auth::{OAuthClient, OAuthConfig};
    ///
    /// let config = OAuthConfig::new(
    ///     "client_id".to_string(),
    ///     "http://127.0.0.1:5173".to_string(),
    ///     vec!["openid".to_string(), "launch".to_string()],
    /// );
    /// let client = OAuthClient::new(config);
    /// assert_eq!(client.redirect_uri(), "http://127.0.0.1:5173");
    /// ```
    #[must_use]
    pub fn new(config: OAuthConfig) -> Self {
        Self::with_timeout(config, DEFAULT_TIMEOUT)
    }

    /// Create a new OAuth client with a custom request timeout
    #[must_use]
    pub fn with_timeout(config: OAuthConfig, timeout: Duration) -> Self {
        let client = Client::builder().timeout(timeout).build().unwrap_or_else(|_| Client::new());
        Self { config, client }
    }

    /// Create a new OAuth client around an existing `reqwest::Client`
    #[must_use]
    pub fn with_client(config: OAuthConfig, client: Client) -> Self {
        Self { config, client }
    }

    /// Fetch `<issuer>/.well-known/smart-configuration`
    ///
    /// # Errors
    /// Returns error if the request fails, the server answers non-2xx, or the
    /// document is missing either endpoint
    #[instrument(skip(self))]
    pub async fn discover(&self, issuer: &str) -> Result<SmartConfiguration, OAuthClientError> {
        let url = format!("{}/.well-known/smart-configuration", issuer.trim_end_matches('/'));
        debug!(%url, "fetching SMART configuration");

        let response =
            self.client.get(&url).header(reqwest::header::ACCEPT, "application/json").send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            warn!(status = status.as_u16(), "SMART configuration request failed");
            return Err(OAuthClientError::HttpStatus { status: status.as_u16(), body });
        }

        serde_json::from_str(&body).map_err(|e| OAuthClientError::ParseError(e.to_string()))
    }

    /// Build the authorization URL the user agent is sent to
    ///
    /// # Arguments
    /// * `authorization_endpoint` - From discovery
    /// * `aud` - The FHIR server (issuer) the token is requested for
    /// * `launch` - Opaque launch context from the EHR
    /// * `code_challenge` - PKCE challenge (S256)
    /// * `state` - CSRF token stored alongside the verifier
    ///
    /// # Errors
    /// Returns error if the authorization endpoint is not an absolute URL
    pub fn build_authorization_url(
        &self,
        authorization_endpoint: &str,
        aud: &str,
        launch: &str,
        code_challenge: &str,
        state: &str,
    ) -> Result<String, OAuthClientError> {
        Url::parse(authorization_endpoint).map_err(|e| {
            OAuthClientError::ConfigError(format!(
                "invalid authorization endpoint {authorization_endpoint}: {e}"
            ))
        })?;

        let scope_string = self.config.scope_string();
        let params = [
            ("response_type", "code"),
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("scope", scope_string.as_str()),
            ("state", state),
            ("aud", aud),
            ("launch", launch),
            ("code_challenge", code_challenge),
            ("code_challenge_method", "S256"),
        ];

        let query_string = params
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let separator = if authorization_endpoint.contains('?') { '&' } else { '?' };
        Ok(format!("{authorization_endpoint}{separator}{query_string}"))
    }

    /// Exchange authorization code for tokens
    ///
    /// # Returns
    /// `TokenSet` with the access token and any refresh token, patient and
    /// encounter context the server returned
    ///
    /// # Errors
    /// Returns error if the exchange fails or no `access_token` comes back
    #[instrument(skip(self, code, code_verifier))]
    pub async fn exchange_code(
        &self,
        token_endpoint: &str,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenSet, OAuthClientError> {
        let request_body = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("code_verifier", code_verifier),
        ];

        let response = self.client.post(token_endpoint).form(&request_body).send().await?;
        let tokens = Self::parse_token_response(response).await?;
        debug!(
            patient = tokens.patient.as_deref().unwrap_or_default(),
            has_refresh_token = tokens.refresh_token.is_some(),
            "authorization code exchanged"
        );
        Ok(tokens)
    }

    /// Refresh access token using refresh token
    ///
    /// A `refresh_token` in the response replaces the old one (rotation); the
    /// caller is responsible for persisting it.
    ///
    /// # Errors
    /// Returns error if no refresh token is provided, the refresh fails, or
    /// no `access_token` comes back
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh_access_token(
        &self,
        token_endpoint: &str,
        refresh_token: &str,
    ) -> Result<TokenSet, OAuthClientError> {
        if refresh_token.is_empty() {
            return Err(OAuthClientError::NoRefreshToken);
        }

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.config.client_id.as_str()),
        ];

        let response = self.client.post(token_endpoint).form(&params).send().await?;
        let tokens = Self::parse_token_response(response).await?;
        debug!(rotated = tokens.refresh_token.is_some(), "access token refreshed");
        Ok(tokens)
    }

    async fn parse_token_response(response: Response) -> Result<TokenSet, OAuthClientError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "token endpoint returned an error");
            return Err(match serde_json::from_str::<OAuthError>(&body) {
                Ok(error) => OAuthClientError::OAuthError(error),
                Err(_) => OAuthClientError::HttpStatus { status: status.as_u16(), body },
            });
        }

        let token_response: TokenResponse =
            serde_json::from_str(&body).map_err(|e| OAuthClientError::ParseError(e.to_string()))?;

        token_response.into_token_set().ok_or(OAuthClientError::MissingAccessToken)
    }

    /// Get the configured redirect URI
    #[must_use]
    pub fn redirect_uri(&self) -> &str {
        &self.config.redirect_uri
    }

    /// Get a reference to the OAuth configuration
    #[must_use]
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }
}

#[async_trait]
impl OAuthClientTrait for OAuthClient {
    async fn discover(&self, issuer: &str) -> Result<SmartConfiguration, OAuthClientError> {
        self.discover(issuer).await
    }

    fn authorization_url(
        &self,
        authorization_endpoint: &str,
        aud: &str,
        launch: &str,
        code_challenge: &str,
        state: &str,
    ) -> Result<String, OAuthClientError> {
        self.build_authorization_url(authorization_endpoint, aud, launch, code_challenge, state)
    }

    async fn exchange_code(
        &self,
        token_endpoint: &str,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenSet, OAuthClientError> {
        self.exchange_code(token_endpoint, code, code_verifier).await
    }

    async fn refresh_access_token(
        &self,
        token_endpoint: &str,
        refresh_token: &str,
    ) -> Result<TokenSet, OAuthClientError> {
        self.refresh_access_token(token_endpoint, refresh_token).await
    }

    fn redirect_uri(&self) -> &str {
        self.redirect_uri()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::client.
    use super::*;

    fn create_test_config() -> OAuthConfig {
        OAuthConfig::new(
            "test_client_id".to_string(),
            "http://127.0.0.1:5173".to_string(),
            vec!["openid".to_string(), "launch".to_string()],
        )
    }

    /// Validates `OAuthClient::build_authorization_url` behavior for the
    /// SMART launch scenario.
    ///
    /// Assertions:
    /// - Ensures the URL starts with the authorization endpoint.
    /// - Ensures every SMART parameter is present and percent-encoded.
    /// - Ensures `code_challenge_method=S256` is sent.
    #[test]
    fn test_build_authorization_url() {
        let client = OAuthClient::new(create_test_config());

        let url = client
            .build_authorization_url(
                "https://auth.example/authorize",
                "https://ehr.example/fhir",
                "launch-123",
                "challenge-abc",
                "state-xyz",
            )
            .unwrap();

        assert!(url.starts_with("https://auth.example/authorize?"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("client_id=test_client_id"));
        assert!(url.contains("redirect_uri=http%3A%2F%2F127.0.0.1%3A5173"));
        assert!(url.contains("scope=openid%20launch"));
        assert!(url.contains("state=state-xyz"));
        assert!(url.contains("aud=https%3A%2F%2Fehr.example%2Ffhir"));
        assert!(url.contains("launch=launch-123"));
        assert!(url.contains("code_challenge=challenge-abc"));
        assert!(url.contains("code_challenge_method=S256"));
    }

    /// Validates `OAuthClient::build_authorization_url` behavior for an
    /// endpoint that already carries a query string.
    ///
    /// Assertions:
    /// - Ensures parameters are appended with `&`.
    #[test]
    fn test_authorization_url_with_existing_query() {
        let client = OAuthClient::new(create_test_config());

        let url = client
            .build_authorization_url("https://auth.example/authorize?tenant=a", "aud", "l", "c", "s")
            .unwrap();

        assert!(url.starts_with("https://auth.example/authorize?tenant=a&response_type=code"));
    }

    /// Validates `OAuthClient::build_authorization_url` behavior for a
    /// relative endpoint.
    ///
    /// Assertions:
    /// - Ensures a `ConfigError` is returned.
    #[test]
    fn test_authorization_url_rejects_relative_endpoint() {
        let client = OAuthClient::new(create_test_config());

        let result = client.build_authorization_url("/authorize", "aud", "l", "c", "s");
        assert!(matches!(result, Err(OAuthClientError::ConfigError(_))));
    }

    /// Validates `OAuthClient::new` behavior for the oauth client config access
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms `client.config().client_id` equals `"test_client_id"`.
    /// - Confirms `client.redirect_uri()` equals `"http://127.0.0.1:5173"`.
    #[test]
    fn test_oauth_client_config_access() {
        let client = OAuthClient::new(create_test_config());

        assert_eq!(client.config().client_id, "test_client_id");
        assert_eq!(client.redirect_uri(), "http://127.0.0.1:5173");
    }

    /// Validates `OAuthClient::refresh_access_token` behavior for the refresh
    /// with empty token scenario.
    ///
    /// Assertions:
    /// - Ensures `matches!(result, Err(OAuthClientError::NoRefreshToken))`
    ///   evaluates to true.
    #[tokio::test]
    async fn test_refresh_with_empty_token() {
        let client = OAuthClient::new(create_test_config());

        let result = client.refresh_access_token("https://auth.example/token", "").await;
        assert!(matches!(result, Err(OAuthClientError::NoRefreshToken)));
    }

    /// Validates `OAuthClientError::status`.
    ///
    /// Assertions:
    /// - Confirms an HTTP status error reports its status.
    /// - Confirms protocol errors report none.
    #[test]
    fn test_error_status() {
        let error = OAuthClientError::HttpStatus { status: 404, body: String::new() };
        assert_eq!(error.status(), Some(404));
        assert_eq!(OAuthClientError::MissingAccessToken.status(), None);
    }
}

//! Mock implementations of common traits
//!
//! Provides mock objects for testing purposes.

// Allow missing error/panic docs for test mocks - they are designed to be simple
// and errors are clearly indicated by their return types
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::auth::{
    OAuthClient, OAuthClientError, OAuthClientTrait, OAuthConfig, SmartConfiguration, TokenSet,
};

/// Mock OAuth client that simulates the SMART handshake without network
/// calls.
///
/// Clones share state, so a test can keep a handle while the code under test
/// owns another.
#[derive(Clone, Debug, Default)]
pub struct MockOAuthClient {
    inner: Arc<MockOAuthState>,
}

#[derive(Debug, Default)]
struct MockOAuthState {
    discover_calls: AtomicUsize,
    exchange_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    exchange_response: Mutex<Option<TokenSet>>,
    refresh_response: Mutex<Option<TokenSet>>,
    refresh_should_fail: AtomicBool,
    exchange_should_fail: AtomicBool,
    discover_should_fail: AtomicBool,
    last_refresh_token: Mutex<Option<String>>,
    last_code_verifier: Mutex<Option<String>>,
}

impl MockOAuthClient {
    /// Authorization endpoint returned by `discover`
    pub const AUTHORIZATION_ENDPOINT: &'static str = "https://mock.auth.example/authorize";
    /// Token endpoint returned by `discover`
    pub const TOKEN_ENDPOINT: &'static str = "https://mock.auth.example/token";
    /// Redirect URI reported by the mock
    pub const REDIRECT_URI: &'static str = "http://127.0.0.1:5173";

    /// Create a new mock OAuth client with default state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the response returned by `exchange_code`.
    pub fn set_exchange_response(&self, tokens: TokenSet) {
        *self.inner.exchange_response.lock() = Some(tokens);
    }

    /// Configure the response returned by `refresh_access_token`.
    pub fn set_refresh_response(&self, tokens: TokenSet) {
        *self.inner.refresh_response.lock() = Some(tokens);
    }

    /// Force the refresh call to fail.
    pub fn set_refresh_should_fail(&self, should_fail: bool) {
        self.inner.refresh_should_fail.store(should_fail, Ordering::SeqCst);
    }

    /// Force the code exchange to fail.
    pub fn set_exchange_should_fail(&self, should_fail: bool) {
        self.inner.exchange_should_fail.store(should_fail, Ordering::SeqCst);
    }

    /// Force discovery to fail.
    pub fn set_discover_should_fail(&self, should_fail: bool) {
        self.inner.discover_should_fail.store(should_fail, Ordering::SeqCst);
    }

    /// Check whether refresh was called.
    #[must_use]
    pub fn was_refresh_called(&self) -> bool {
        self.refresh_calls() > 0
    }

    #[must_use]
    pub fn discover_calls(&self) -> usize {
        self.inner.discover_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn exchange_calls(&self) -> usize {
        self.inner.exchange_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn refresh_calls(&self) -> usize {
        self.inner.refresh_calls.load(Ordering::SeqCst)
    }

    /// Refresh token passed to the last `refresh_access_token` call.
    #[must_use]
    pub fn last_refresh_token(&self) -> Option<String> {
        self.inner.last_refresh_token.lock().clone()
    }

    /// Verifier passed to the last `exchange_code` call.
    #[must_use]
    pub fn last_code_verifier(&self) -> Option<String> {
        self.inner.last_code_verifier.lock().clone()
    }

    /// Construct a real OAuth client for hybrid tests.
    #[must_use]
    pub fn real_client() -> OAuthClient {
        let config = OAuthConfig::new(
            "test_client_id".to_string(),
            Self::REDIRECT_URI.to_string(),
            vec!["launch".to_string(), "openid".to_string()],
        );
        OAuthClient::new(config)
    }
}

#[async_trait]
impl OAuthClientTrait for MockOAuthClient {
    async fn discover(&self, issuer: &str) -> Result<SmartConfiguration, OAuthClientError> {
        self.inner.discover_calls.fetch_add(1, Ordering::SeqCst);
        if self.inner.discover_should_fail.load(Ordering::SeqCst) {
            return Err(OAuthClientError::HttpStatus { status: 404, body: "not found".to_string() });
        }

        Ok(SmartConfiguration {
            authorization_endpoint: Self::AUTHORIZATION_ENDPOINT.to_string(),
            token_endpoint: Self::TOKEN_ENDPOINT.to_string(),
            issuer: Some(issuer.to_string()),
            capabilities: vec!["launch-ehr".to_string(), "client-public".to_string()],
            code_challenge_methods_supported: vec!["S256".to_string()],
            scopes_supported: Vec::new(),
            grant_types_supported: Vec::new(),
        })
    }

    fn authorization_url(
        &self,
        authorization_endpoint: &str,
        aud: &str,
        launch: &str,
        code_challenge: &str,
        state: &str,
    ) -> Result<String, OAuthClientError> {
        Self::real_client().build_authorization_url(
            authorization_endpoint,
            aud,
            launch,
            code_challenge,
            state,
        )
    }

    async fn exchange_code(
        &self,
        _token_endpoint: &str,
        _code: &str,
        code_verifier: &str,
    ) -> Result<TokenSet, OAuthClientError> {
        self.inner.exchange_calls.fetch_add(1, Ordering::SeqCst);
        *self.inner.last_code_verifier.lock() = Some(code_verifier.to_string());

        if self.inner.exchange_should_fail.load(Ordering::SeqCst) {
            return Err(OAuthClientError::MissingAccessToken);
        }

        let configured = self.inner.exchange_response.lock().clone();
        Ok(configured.unwrap_or_else(|| {
            TokenSet::new(
                "mock_access_token".to_string(),
                Some("mock_refresh_token".to_string()),
                None,
                3600,
                Some("launch openid".to_string()),
            )
            .with_context(Some("mock-patient".to_string()), Some("mock-encounter".to_string()))
        }))
    }

    async fn refresh_access_token(
        &self,
        _token_endpoint: &str,
        refresh_token: &str,
    ) -> Result<TokenSet, OAuthClientError> {
        self.inner.refresh_calls.fetch_add(1, Ordering::SeqCst);
        *self.inner.last_refresh_token.lock() = Some(refresh_token.to_string());

        if refresh_token.is_empty() {
            return Err(OAuthClientError::NoRefreshToken);
        }
        if self.inner.refresh_should_fail.load(Ordering::SeqCst) {
            return Err(OAuthClientError::HttpStatus {
                status: 400,
                body: r#"{"error":"invalid_grant"}"#.to_string(),
            });
        }

        let configured = self.inner.refresh_response.lock().clone();
        Ok(configured.unwrap_or_else(|| {
            TokenSet::new(
                "refreshed_access_token".to_string(),
                Some("rotated_refresh_token".to_string()),
                None,
                3600,
                None,
            )
        }))
    }

    fn redirect_uri(&self) -> &str {
        Self::REDIRECT_URI
    }
}

//! Traits for OAuth and session storage operations
//!
//! These traits enable dependency injection and testing by abstracting
//! external dependencies (the EHR's authorization server, the host's session
//! storage).

use std::sync::Arc;

use async_trait::async_trait;

use super::client::OAuthClientError;
use super::session::SessionKey;
use super::types::{SmartConfiguration, TokenSet};

/// Trait for SMART OAuth client operations
#[async_trait]
pub trait OAuthClientTrait: Send + Sync {
    /// Fetch the issuer's SMART configuration
    ///
    /// # Errors
    /// Returns error if the request fails or the document is malformed
    async fn discover(&self, issuer: &str) -> Result<SmartConfiguration, OAuthClientError>;

    /// Build the authorization URL for a launch
    ///
    /// # Errors
    /// Returns error if the authorization endpoint is invalid
    fn authorization_url(
        &self,
        authorization_endpoint: &str,
        aud: &str,
        launch: &str,
        code_challenge: &str,
        state: &str,
    ) -> Result<String, OAuthClientError>;

    /// Exchange an authorization code for tokens
    ///
    /// # Errors
    /// Returns error if the exchange fails or no access token is issued
    async fn exchange_code(
        &self,
        token_endpoint: &str,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenSet, OAuthClientError>;

    /// Refresh access token using refresh token
    ///
    /// # Errors
    /// Returns error if refresh fails or token is invalid/revoked
    async fn refresh_access_token(
        &self,
        token_endpoint: &str,
        refresh_token: &str,
    ) -> Result<TokenSet, OAuthClientError>;

    /// Get the configured redirect URI
    fn redirect_uri(&self) -> &str;
}

/// Scoped key/value storage for transient launch state
///
/// Values live for one browser-tab-equivalent session: the verifier and
/// state between redirect and callback, the token endpoint and refresh token
/// for the life of the session.
pub trait SessionStore: Send + Sync {
    /// Read a value
    fn get(&self, key: SessionKey) -> Option<String>;

    /// Write a value, replacing any previous one
    fn set(&self, key: SessionKey, value: &str);

    /// Remove a value; removing an absent key is a no-op
    fn remove(&self, key: SessionKey);
}

impl<S: SessionStore + ?Sized> SessionStore for Arc<S> {
    fn get(&self, key: SessionKey) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: SessionKey, value: &str) {
        (**self).set(key, value);
    }

    fn remove(&self, key: SessionKey) {
        (**self).remove(key);
    }
}

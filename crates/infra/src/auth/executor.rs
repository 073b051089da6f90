//! Authenticated request execution with a single refresh-and-retry on 401.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use smartlaunch_common::auth::{OAuthClientTrait, SessionKey, SessionStore};
use smartlaunch_domain::{Result, SmartError};
use tracing::{debug, info, instrument, warn};

use crate::errors::refresh_error;

/// Called with the new access token after a successful refresh.
pub type TokenRefreshCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Runs FHIR calls with a bearer token, renewing it once when the server
/// answers 401.
///
/// The refresh token and token endpoint are read from the session store; a
/// rotated refresh token is written back to it.
pub struct AuthenticatedExecutor<C, S> {
    oauth: Arc<C>,
    store: Arc<S>,
}

impl<C, S> Clone for AuthenticatedExecutor<C, S> {
    fn clone(&self) -> Self {
        Self { oauth: Arc::clone(&self.oauth), store: Arc::clone(&self.store) }
    }
}

impl<C, S> fmt::Debug for AuthenticatedExecutor<C, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatedExecutor").finish_non_exhaustive()
    }
}

impl<C, S> AuthenticatedExecutor<C, S>
where
    C: OAuthClientTrait,
    S: SessionStore,
{
    pub fn new(oauth: Arc<C>, store: Arc<S>) -> Self {
        Self { oauth, store }
    }

    /// Run `request` with `access_token`.
    ///
    /// On HTTP 401 the token is refreshed exactly once, `on_refresh` is told
    /// the new token, and `request` runs once more. A failed refresh, or any
    /// failure of the retried request, is reported as
    /// [`SmartError::AuthenticationExpired`]. Other failures of the first
    /// attempt are returned unchanged.
    #[instrument(skip_all)]
    pub async fn execute<T, F, Fut>(
        &self,
        access_token: &str,
        on_refresh: Option<&TokenRefreshCallback>,
        request: F,
    ) -> Result<T>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match request(access_token.to_string()).await {
            Err(err) if err.is_unauthorized() => {
                info!("access token rejected, refreshing once");

                let new_token = self.refresh().await.map_err(|refresh_err| {
                    warn!(error = %refresh_err, "token refresh failed");
                    SmartError::AuthenticationExpired(refresh_err.to_string())
                })?;

                if let Some(callback) = on_refresh {
                    callback(&new_token);
                }

                request(new_token).await.map_err(|retry_err| {
                    warn!(error = %retry_err, "request failed after token refresh");
                    SmartError::AuthenticationExpired(retry_err.to_string())
                })
            }
            other => other,
        }
    }

    /// Exchange the stored refresh token for a new access token.
    ///
    /// # Errors
    /// [`SmartError::TokenRefresh`] when no refresh token or token endpoint
    /// is stored, or the token endpoint rejects the grant.
    pub async fn refresh(&self) -> Result<String> {
        let refresh_token = self
            .store
            .get(SessionKey::RefreshToken)
            .ok_or_else(|| SmartError::TokenRefresh("no refresh token available".into()))?;
        let token_endpoint = self
            .store
            .get(SessionKey::TokenEndpoint)
            .ok_or_else(|| SmartError::TokenRefresh("no token endpoint stored".into()))?;

        let tokens = self
            .oauth
            .refresh_access_token(&token_endpoint, &refresh_token)
            .await
            .map_err(refresh_error)?;

        if let Some(rotated) = tokens.refresh_token.as_deref() {
            debug!("storing rotated refresh token");
            self.store.set(SessionKey::RefreshToken, rotated);
        }

        Ok(tokens.access_token)
    }
}

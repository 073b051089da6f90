//! Session storage for the launch handshake
//!
//! Keys match the names the browser build of this client used in
//! `sessionStorage`, so a host backed by real session storage stays
//! compatible.

use std::collections::HashMap;
use std::fmt;

use parking_lot::Mutex;

use super::traits::SessionStore;

/// Keys the launch client reads and writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKey {
    CodeVerifier,
    TokenEndpoint,
    Issuer,
    RefreshToken,
    EncounterId,
    State,
}

impl SessionKey {
    /// Every key, in declaration order
    pub const ALL: [Self; 6] = [
        Self::CodeVerifier,
        Self::TokenEndpoint,
        Self::Issuer,
        Self::RefreshToken,
        Self::EncounterId,
        Self::State,
    ];

    /// Storage name of the key
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CodeVerifier => "smart_code_verifier",
            Self::TokenEndpoint => "smart_token_endpoint",
            Self::Issuer => "smart_iss",
            Self::RefreshToken => "smart_refresh_token",
            Self::EncounterId => "smart_encounter_id",
            Self::State => "smart_state",
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Process-local session store
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    values: Mutex<HashMap<&'static str, String>>,
}

impl InMemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.lock().is_empty()
    }

    /// Drop every stored value
    pub fn clear(&self) {
        self.values.lock().clear();
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, key: SessionKey) -> Option<String> {
        self.values.lock().get(key.as_str()).cloned()
    }

    fn set(&self, key: SessionKey, value: &str) {
        self.values.lock().insert(key.as_str(), value.to_string());
    }

    fn remove(&self, key: SessionKey) {
        self.values.lock().remove(key.as_str());
    }
}

/// One-time launch state written before the redirect and read at callback
#[derive(Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub issuer: String,
    pub token_endpoint: String,
    pub code_verifier: String,
    pub state: String,
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("issuer", &self.issuer)
            .field("token_endpoint", &self.token_endpoint)
            .field("code_verifier", &"<redacted>")
            .field("state", &"<redacted>")
            .finish()
    }
}

impl SessionContext {
    /// Persist every field
    pub fn save(&self, store: &dyn SessionStore) {
        store.set(SessionKey::Issuer, &self.issuer);
        store.set(SessionKey::TokenEndpoint, &self.token_endpoint);
        store.set(SessionKey::CodeVerifier, &self.code_verifier);
        store.set(SessionKey::State, &self.state);
    }

    /// Load the context; `None` when any field is missing
    #[must_use]
    pub fn load(store: &dyn SessionStore) -> Option<Self> {
        Some(Self {
            issuer: store.get(SessionKey::Issuer)?,
            token_endpoint: store.get(SessionKey::TokenEndpoint)?,
            code_verifier: store.get(SessionKey::CodeVerifier)?,
            state: store.get(SessionKey::State)?,
        })
    }

    /// Remove the single-use fields; the token endpoint stays for refreshes
    pub fn clear_one_time(store: &dyn SessionStore) {
        store.remove(SessionKey::CodeVerifier);
        store.remove(SessionKey::Issuer);
        store.remove(SessionKey::State);
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::session.
    use super::*;

    fn context() -> SessionContext {
        SessionContext {
            issuer: "https://ehr.example/fhir".to_string(),
            token_endpoint: "https://auth.example/token".to_string(),
            code_verifier: "verifier".to_string(),
            state: "state".to_string(),
        }
    }

    /// Validates the session context round trip through the store.
    ///
    /// Assertions:
    /// - Confirms a saved context loads back equal.
    /// - Confirms values are stored under their session key names.
    #[test]
    fn test_context_save_and_load() {
        let store = InMemorySessionStore::new();
        context().save(&store);

        assert_eq!(SessionContext::load(&store), Some(context()));
        assert_eq!(store.get(SessionKey::Issuer).as_deref(), Some("https://ehr.example/fhir"));
        assert_eq!(store.len(), 4);
    }

    /// Validates `SessionContext::load` with a missing field.
    ///
    /// Assertions:
    /// - Ensures a context missing the verifier does not load.
    #[test]
    fn test_context_missing_field() {
        let store = InMemorySessionStore::new();
        context().save(&store);
        store.remove(SessionKey::CodeVerifier);

        assert!(SessionContext::load(&store).is_none());
    }

    /// Validates `SessionContext::clear_one_time`.
    ///
    /// Assertions:
    /// - Ensures verifier, issuer and state are removed.
    /// - Ensures the token endpoint and refresh token survive.
    #[test]
    fn test_clear_one_time_keeps_token_endpoint() {
        let store = InMemorySessionStore::new();
        context().save(&store);
        store.set(SessionKey::RefreshToken, "refresh");

        SessionContext::clear_one_time(&store);

        assert!(store.get(SessionKey::CodeVerifier).is_none());
        assert!(store.get(SessionKey::Issuer).is_none());
        assert!(store.get(SessionKey::State).is_none());
        assert_eq!(
            store.get(SessionKey::TokenEndpoint).as_deref(),
            Some("https://auth.example/token")
        );
        assert_eq!(store.get(SessionKey::RefreshToken).as_deref(), Some("refresh"));
    }

    /// Validates that debug output redacts secrets.
    ///
    /// Assertions:
    /// - Ensures the verifier value does not appear in `{:?}` output.
    #[test]
    fn test_debug_redacts_verifier() {
        let rendered = format!("{:?}", context());
        assert!(!rendered.contains("verifier\""));
        assert!(rendered.contains("<redacted>"));
    }

    /// Validates the storage names of every key.
    ///
    /// Assertions:
    /// - Ensures every name carries the `smart_` prefix and is unique.
    #[test]
    fn test_key_names() {
        let names: std::collections::HashSet<_> =
            SessionKey::ALL.iter().map(|key| key.as_str()).collect();
        assert_eq!(names.len(), SessionKey::ALL.len());
        assert!(names.iter().all(|name| name.starts_with("smart_")));
        assert_eq!(SessionKey::Issuer.to_string(), "smart_iss");
    }
}

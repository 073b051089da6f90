//! SMART App Launch OAuth 2.0 + PKCE infrastructure
//!
//! This module provides the protocol pieces of a SMART-on-FHIR public client:
//! discovery, PKCE, authorization URL building, code exchange and refresh,
//! plus the session storage the handshake relies on between the redirect
//! and the callback.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │  LaunchOrchestrator  │  (smartlaunch-infra)
//! └──────────┬───────────┘
//!            │
//!            ├──► OAuthClient      (discovery, exchange, refresh)
//!            ├──► SessionStore     (verifier, state, token endpoint, refresh token)
//!            └──► PKCE utilities   (verifier, challenge, state)
//! ```
//!
//! # Usage Example
//!
//! ```no_run
//! use smartlaunch_common::auth::{OAuthClient, OAuthConfig, PKCEChallenge, generate_state};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = OAuthConfig::new(
//!     "my-client-id".to_string(),
//!     "http://127.0.0.1:5173".to_string(),
//!     vec!["launch".to_string(), "openid".to_string(), "fhirUser".to_string()],
//! );
//! let client = OAuthClient::new(config);
//!
//! let smart = client.discover("https://ehr.example/fhir").await?;
//! let pkce = PKCEChallenge::generate();
//! let state = generate_state();
//! let url = client.build_authorization_url(
//!     &smart.authorization_endpoint,
//!     "https://ehr.example/fhir",
//!     "launch-token",
//!     &pkce.code_challenge,
//!     &state,
//! )?;
//! println!("Redirect to {url}");
//! # Ok(())
//! # }
//! ```
//!
//! # Security Features
//!
//! - **PKCE**: Prevents authorization code interception
//! - **State Validation**: Fresh per launch, compared in constant time
//! - **No Client Secrets**: Safe for browser and desktop hosts

// Foundation tier: pure PKCE and protocol data types
pub mod pkce;
pub mod types;

// Platform tier: network client and session storage
#[cfg(feature = "platform")]
pub mod client;
#[cfg(feature = "platform")]
pub mod session;
#[cfg(feature = "platform")]
pub mod traits;

// Re-export commonly used types and functions
pub use pkce::PKCEChallenge;
pub use pkce::{generate_code_challenge, generate_code_verifier, generate_state, validate_state};
pub use types::{OAuthConfig, OAuthError, SmartConfiguration, TokenResponse, TokenSet};

#[cfg(feature = "platform")]
pub use client::{OAuthClient, OAuthClientError};
#[cfg(feature = "platform")]
pub use session::{InMemorySessionStore, SessionContext, SessionKey};
#[cfg(feature = "platform")]
pub use traits::{OAuthClientTrait, SessionStore};

//! PKCE (Proof Key for Code Exchange) implementation for OAuth 2.0
//!
//! Implements RFC 7636 for public clients that cannot hold a client secret.
//! The verifier is drawn from the RFC's unreserved character set at the
//! maximum permitted length.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Verifier length (RFC 7636 allows 43-128)
pub const CODE_VERIFIER_LENGTH: usize = 128;

/// Unreserved characters permitted in a code verifier
const VERIFIER_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

/// Generate a cryptographically secure code verifier
///
/// Returns 128 characters drawn uniformly from `[A-Za-z0-9-._~]`.
#[must_use]
pub fn generate_code_verifier() -> String {
    generate_code_verifier_with(&mut rand::thread_rng())
}

/// Generate a code verifier from the supplied RNG.
///
/// Deterministic for a seeded RNG, which keeps tests reproducible.
pub fn generate_code_verifier_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..CODE_VERIFIER_LENGTH)
        .map(|_| char::from(VERIFIER_CHARSET[rng.gen_range(0..VERIFIER_CHARSET.len())]))
        .collect()
}

/// Generate code challenge from verifier using SHA256
///
/// Per RFC 7636, the challenge is BASE64URL(SHA256(ASCII(code_verifier)))
#[must_use]
pub fn generate_code_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    let hash = hasher.finalize();
    URL_SAFE_NO_PAD.encode(hash)
}

/// Generate a random state token for CSRF protection
///
/// Returns a URL-safe base64-encoded random string of 32 bytes (43 characters).
#[must_use]
pub fn generate_state() -> String {
    let mut rng = rand::thread_rng();
    let random_bytes: Vec<u8> = (0..32).map(|_| rng.gen()).collect();
    URL_SAFE_NO_PAD.encode(random_bytes)
}

/// Validate that the state token matches
///
/// Compares in constant time with respect to the contents of equal-length
/// inputs.
///
/// # Arguments
/// * `expected` - The state that was sent in the authorization request
/// * `actual` - The state received in the callback
#[must_use]
pub fn validate_state(expected: &str, actual: &str) -> bool {
    let (expected, actual) = (expected.as_bytes(), actual.as_bytes());
    if expected.len() != actual.len() {
        return false;
    }
    expected.iter().zip(actual).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
}

/// PKCE pair for one authorization attempt
///
/// The verifier stays in session storage until the code exchange; the
/// challenge goes out in the authorization request.
#[derive(Debug, Clone)]
pub struct PKCEChallenge {
    /// Random string (128 chars from the unreserved set)
    pub code_verifier: String,

    /// SHA256 hash of code_verifier (base64url encoded)
    pub code_challenge: String,
}

impl PKCEChallenge {
    /// Generate a new PKCE pair with cryptographically secure randomness
    ///
    /// # Examples
    /// ```
    /// use smartlaunch_common::auth::pkce::PKCEChallenge;
    ///
    /// let challenge = PKCEChallenge::generate();
    /// assert_eq!(challenge.code_verifier.len(), 128);
    /// assert_eq!(challenge.code_challenge.len(), 43);
    /// ```
    #[must_use]
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::thread_rng())
    }

    /// Generate a PKCE pair from the supplied RNG
    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let code_verifier = generate_code_verifier_with(rng);
        let code_challenge = generate_code_challenge(&code_verifier);
        Self { code_verifier, code_challenge }
    }

    /// Get the challenge method (always "S256" for SHA256)
    #[must_use]
    pub fn challenge_method(&self) -> &str {
        "S256"
    }
}

//! Foundation-tier surface of the auth module
//!
//! Only PKCE helpers and protocol data types are used here, so this file
//! builds with `--no-default-features --features foundation`.

use smartlaunch_common::auth::{
    generate_code_challenge, generate_state, validate_state, PKCEChallenge, SmartConfiguration,
    TokenResponse,
};

/// Validates the pure PKCE scenario.
///
/// Assertions:
/// - The generated challenge is the S256 digest of the generated verifier.
/// - Fresh states differ and validate only against themselves.
#[test]
fn pkce_and_state_need_no_network_stack() {
    let pkce = PKCEChallenge::generate();
    assert_eq!(pkce.code_challenge, generate_code_challenge(&pkce.code_verifier));
    assert_eq!(pkce.challenge_method(), "S256");

    let state = generate_state();
    assert_ne!(state, generate_state());
    assert!(validate_state(&state, &state));
    assert!(!validate_state(&state, "other"));
}

/// Validates the protocol document parsing scenario.
///
/// Assertions:
/// - A token response converts into a token set with launch context.
/// - A discovery document advertising S256 is recognized.
#[test]
fn protocol_types_parse_without_client() {
    let response: TokenResponse = serde_json::from_str(
        r#"{ "access_token": "at", "token_type": "Bearer", "patient": "p1" }"#,
    )
    .unwrap();
    let tokens = response.into_token_set().expect("access token present");
    assert_eq!(tokens.patient.as_deref(), Some("p1"));

    let smart: SmartConfiguration = serde_json::from_str(
        r#"{
            "authorization_endpoint": "https://ehr.example/authorize",
            "token_endpoint": "https://ehr.example/token",
            "code_challenge_methods_supported": ["S256"]
        }"#,
    )
    .unwrap();
    assert!(smart.supports_s256());
}

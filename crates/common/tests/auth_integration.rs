//! Integration tests for auth module
//!
//! Tests SMART discovery, PKCE, code exchange and refresh against a mock
//! authorization server.

#![cfg(feature = "platform")]

use smartlaunch_common::auth::{
    generate_code_challenge, generate_code_verifier, generate_state, validate_state, OAuthClient,
    OAuthClientError, OAuthClientTrait, OAuthConfig, PKCEChallenge,
};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client() -> OAuthClient {
    let config = OAuthConfig::new(
        "test_client_id".to_string(),
        "http://127.0.0.1:5173".to_string(),
        vec!["launch".to_string(), "openid".to_string(), "offline_access".to_string()],
    );
    let http = reqwest::Client::builder().no_proxy().build().expect("client should build");
    OAuthClient::with_client(config, http)
}

/// Validates PKCE challenge generation and format.
///
/// # Test Steps
/// 1. Generate a code verifier (128 chars from the unreserved set)
/// 2. Generate its SHA256 challenge
/// 3. Verify `PKCEChallenge` agrees with the free functions
#[tokio::test(flavor = "multi_thread")]
async fn test_pkce_challenge_generation() {
    let verifier = generate_code_verifier();
    assert_eq!(verifier.len(), 128);
    assert!(verifier.chars().all(|c| c.is_ascii_alphanumeric() || "-._~".contains(c)));

    let challenge = generate_code_challenge(&verifier);
    assert_eq!(challenge.len(), 43);

    let pkce = PKCEChallenge::generate();
    assert_eq!(generate_code_challenge(&pkce.code_verifier), pkce.code_challenge);
    assert_eq!(pkce.challenge_method(), "S256");
}

/// Validates OAuth state parameter generation and validation for CSRF
/// protection.
///
/// # Test Steps
/// 1. Generate two state values
/// 2. Verify they differ and are long enough
/// 3. Verify only exact matches validate
#[tokio::test(flavor = "multi_thread")]
async fn test_state_generation_and_validation() {
    let state1 = generate_state();
    let state2 = generate_state();

    assert_ne!(state1, state2);
    assert!(state1.len() >= 32);
    assert!(validate_state(&state1, &state1));
    assert!(!validate_state(&state1, &state2));
}

/// Validates discovery against an issuer with a trailing slash.
///
/// # Test Steps
/// 1. Serve a SMART configuration at the well-known path
/// 2. Discover using `<issuer>/`
/// 3. Verify both endpoints and capabilities are read
#[tokio::test]
async fn test_discovery_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fhir/.well-known/smart-configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "authorization_endpoint": format!("{}/authorize", server.uri()),
            "token_endpoint": format!("{}/token", server.uri()),
            "capabilities": ["launch-ehr", "client-public"],
            "code_challenge_methods_supported": ["S256"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client();
    let smart = client.discover(&format!("{}/fhir/", server.uri())).await.unwrap();

    assert_eq!(smart.authorization_endpoint, format!("{}/authorize", server.uri()));
    assert_eq!(smart.token_endpoint, format!("{}/token", server.uri()));
    assert!(smart.capabilities.contains(&"launch-ehr".to_string()));
}

/// Validates discovery failures.
///
/// # Test Steps
/// 1. Serve a 404 for one issuer and a document without `token_endpoint`
///    for another
/// 2. Verify the first maps to `HttpStatus` and the second to `ParseError`
#[tokio::test]
async fn test_discovery_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing/.well-known/smart-configuration"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/partial/.well-known/smart-configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "authorization_endpoint": "https://auth.example/authorize"
        })))
        .mount(&server)
        .await;

    let client = test_client();

    let missing = client.discover(&format!("{}/missing", server.uri())).await;
    assert!(matches!(missing, Err(OAuthClientError::HttpStatus { status: 404, .. })));

    let partial = client.discover(&format!("{}/partial", server.uri())).await;
    assert!(matches!(partial, Err(OAuthClientError::ParseError(_))));
}

/// Validates the authorization code exchange.
///
/// # Test Steps
/// 1. Expect a form POST carrying every authorization_code grant parameter
/// 2. Return a SMART token response with patient and encounter context
/// 3. Verify the token set carries the context and refresh token
#[tokio::test]
async fn test_exchange_code_sends_pkce_grant() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth-code-1"))
        .and(body_string_contains("code_verifier=verifier-abc"))
        .and(body_string_contains("client_id=test_client_id"))
        .and(body_string_contains("redirect_uri=http%3A%2F%2F127.0.0.1%3A5173"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "access-1",
            "token_type": "Bearer",
            "expires_in": 570,
            "scope": "launch openid offline_access",
            "refresh_token": "refresh-1",
            "patient": "12724066",
            "encounter": "97939518"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client();
    let tokens = client
        .exchange_code(&format!("{}/token", server.uri()), "auth-code-1", "verifier-abc")
        .await
        .unwrap();

    assert_eq!(tokens.access_token, "access-1");
    assert_eq!(tokens.refresh_token.as_deref(), Some("refresh-1"));
    assert_eq!(tokens.patient.as_deref(), Some("12724066"));
    assert_eq!(tokens.encounter.as_deref(), Some("97939518"));
    assert!(tokens.expires_at.is_some());
}

/// Validates token endpoint error handling.
///
/// # Test Steps
/// 1. Return an RFC 6749 error body with 400
/// 2. Return a 200 without `access_token`
/// 3. Verify `OAuthError` and `MissingAccessToken` respectively
#[tokio::test]
async fn test_exchange_code_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rejecting/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "code expired"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/empty/token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"token_type": "Bearer"})),
        )
        .mount(&server)
        .await;

    let client = test_client();

    let rejected = client
        .exchange_code(&format!("{}/rejecting/token", server.uri()), "code", "verifier")
        .await;
    match rejected {
        Err(OAuthClientError::OAuthError(error)) => {
            assert_eq!(error.error, "invalid_grant");
            assert_eq!(error.error_description.as_deref(), Some("code expired"));
        }
        other => panic!("expected OAuthError, got {other:?}"),
    }

    let empty =
        client.exchange_code(&format!("{}/empty/token", server.uri()), "code", "verifier").await;
    assert!(matches!(empty, Err(OAuthClientError::MissingAccessToken)));
}

/// Validates refresh token rotation.
///
/// # Test Steps
/// 1. Expect a refresh_token grant with the old token
/// 2. Return a new access token and a rotated refresh token
/// 3. Verify both are surfaced
#[tokio::test]
async fn test_refresh_rotates_refresh_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=old-refresh"))
        .and(body_string_contains("client_id=test_client_id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "access-2",
            "token_type": "Bearer",
            "refresh_token": "new-refresh"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client();
    let tokens = OAuthClientTrait::refresh_access_token(
        &client,
        &format!("{}/token", server.uri()),
        "old-refresh",
    )
    .await
    .unwrap();

    assert_eq!(tokens.access_token, "access-2");
    assert_eq!(tokens.refresh_token.as_deref(), Some("new-refresh"));
}

/// Validates refresh without `access_token` in the response.
///
/// # Test Steps
/// 1. Return a 200 carrying only a refresh token
/// 2. Verify `MissingAccessToken`
#[tokio::test]
async fn test_refresh_without_access_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"refresh_token": "only-refresh"})),
        )
        .mount(&server)
        .await;

    let client = test_client();
    let result = client.refresh_access_token(&format!("{}/token", server.uri()), "old").await;

    assert!(matches!(result, Err(OAuthClientError::MissingAccessToken)));
}

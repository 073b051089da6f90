//! # SMART Launch Infrastructure
//!
//! I/O side of the SMART-on-FHIR launch client.
//!
//! This crate contains:
//! - HTTP transport with retry and timeout
//! - Bearer-token execution with one refresh-and-retry on 401
//! - FHIR Patient and Observation access
//! - The EHR launch orchestrator
//! - Configuration loading and tracing setup
//!
//! ## Architecture
//! - Pure types and rules live in `smartlaunch-domain`
//! - OAuth, PKCE and session storage live in `smartlaunch-common`

pub mod auth;
pub mod config;
pub mod errors;
pub mod fhir;
pub mod http;
pub mod launch;
pub mod observability;

pub use auth::{AuthenticatedExecutor, TokenRefreshCallback};
pub use errors::InfraError;
pub use fhir::{observations_from_bundle, FhirClient};
pub use http::{HttpClient, HttpClientBuilder};
pub use launch::{AuthorizedSession, LaunchOrchestrator, Navigator, RecordingNavigator};
pub use observability::{init_tracing, init_tracing_with_level, LogFormat};

//! Common building blocks shared across SmartLaunch crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: PKCE primitives and OAuth/SMART data types
//! - `platform`: the OAuth client, session storage and traits (default)
//! - `observability`: tracing instrumentation
//! - `test-utils`: mock implementations for downstream tests

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier (client and session storage need `platform`)
// -------------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod auth;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(all(feature = "platform", any(feature = "test-utils", test)))]
pub mod testing;

//! Testing utilities and helpers
//!
//! - **[`mocks`]**: Mock implementations of the auth traits
//!
//! ## Usage
//!
//! ```rust
//! use smartlaunch_common::testing::MockOAuthClient;
//!
//! let oauth = MockOAuthClient::new();
//! oauth.set_refresh_should_fail(true);
//! assert!(!oauth.was_refresh_called());
//! ```

pub mod mocks;

pub use mocks::MockOAuthClient;

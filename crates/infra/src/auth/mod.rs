//! Bearer-token request execution

pub mod executor;

pub use executor::{AuthenticatedExecutor, TokenRefreshCallback};

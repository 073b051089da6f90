//! Infrastructure error conversions

pub mod conversions;

pub use conversions::{
    authorization_error, discovery_error, exchange_error, refresh_error, InfraError,
};

//! # SmartLaunch Domain
//!
//! Business domain types and models for the SMART-on-FHIR launch client.
//!
//! This crate contains:
//! - Domain error types and Result definitions
//! - Configuration structures
//! - FHIR helpers (observation grouping and merging, patient demographics)
//! - Launch parameters and status
//!
//! ## Architecture
//! - No dependencies on other SmartLaunch crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
pub use utils::quantity::{parse_value_and_unit, ParsedQuantity};

//! FHIR resource access

pub mod client;

pub use client::{observations_from_bundle, FhirClient};

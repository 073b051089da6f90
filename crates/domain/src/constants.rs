//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! launch client.

// Client registration defaults
pub const DEFAULT_CLIENT_ID: &str = "36b8595f-9eb7-416e-ae7e-9135473eb3cd";
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:5173";
pub const DEFAULT_SCOPES: &[&str] = &[
    "openid",
    "fhirUser",
    "launch",
    "offline_access",
    "user/Patient.crus",
    "user/Observation.crus",
];

// HTTP defaults
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_HTTP_MAX_ATTEMPTS: usize = 3;
pub const DEFAULT_HTTP_BASE_BACKOFF_MS: u64 = 200;

// Terminology systems
pub const LOINC_SYSTEM: &str = "http://loinc.org";
pub const UCUM_SYSTEM: &str = "http://unitsofmeasure.org";
pub const OBSERVATION_CATEGORY_SYSTEM: &str =
    "http://terminology.hl7.org/CodeSystem/observation-category";
pub const VITAL_SIGNS_CATEGORY_CODE: &str = "vital-signs";

// UCUM codes for temperature
pub const UCUM_CELSIUS: &str = "Cel";
pub const UCUM_FAHRENHEIT: &str = "[degF]";

// Display fallbacks
pub const UNKNOWN_CATEGORY: &str = "Unknown";
pub const NOT_AVAILABLE: &str = "N/A";

//! Domain types and models
//!
//! FHIR resources are carried as `serde_json::Value`; these modules hold the
//! logic the launch client applies to them.

pub mod launch;
pub mod observation;
pub mod patient;

pub use launch::{LaunchParams, LaunchStatus, LaunchTrigger};
pub use observation::{
    category_of, display_value, group_by_category, if_match_header, is_complete_observation,
    merge_for_update, version_id, ObservationDraft, ObservationEdit, ObservationGroups,
    MERGEABLE_FIELDS,
};
pub use patient::PatientSummary;

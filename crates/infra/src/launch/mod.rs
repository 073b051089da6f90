//! SMART launch flow

pub mod navigator;
pub mod orchestrator;

pub use navigator::{Navigator, RecordingNavigator};
pub use orchestrator::{AuthorizedSession, LaunchOrchestrator};

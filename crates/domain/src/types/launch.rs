//! Launch request types: inbound query parameters, triggers, and the
//! orchestrator's status.

use serde::{Deserialize, Serialize};

/// Query parameters the EHR (or the authorization server) sends the app.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchParams {
    pub iss: Option<String>,
    pub launch: Option<String>,
    pub code: Option<String>,
    pub state: Option<String>,
}

impl LaunchParams {
    /// Collect the launch parameters from decoded query pairs; unknown keys
    /// are ignored and empty values count as absent.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let value: String = value.into();
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "iss" => params.iss = Some(value),
                "launch" => params.launch = Some(value),
                "code" => params.code = Some(value),
                "state" => params.state = Some(value),
                _ => {}
            }
        }
        params
    }

    /// Which flow these parameters start, if any.
    ///
    /// A callback (`code` + `state`) always wins; a launch requires `iss` +
    /// `launch` with neither `code` nor `state` present.
    pub fn trigger(&self) -> Option<LaunchTrigger> {
        match (&self.iss, &self.launch, &self.code, &self.state) {
            (_, _, Some(code), Some(state)) => {
                Some(LaunchTrigger::Callback { code: code.clone(), state: state.clone() })
            }
            (Some(iss), Some(launch), None, None) => {
                Some(LaunchTrigger::Launch { iss: iss.clone(), launch: launch.clone() })
            }
            _ => None,
        }
    }
}

/// The flow a set of launch parameters starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchTrigger {
    /// EHR launch: begin authorization against `iss`
    Launch { iss: String, launch: String },
    /// Authorization server redirected back with a code
    Callback { code: String, state: String },
}

/// Orchestrator state machine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "lowercase")]
pub enum LaunchStatus {
    #[default]
    Initial,
    Authorizing,
    Authorized,
    Error(String),
}

impl LaunchStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Authorized | Self::Error(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_trigger() {
        let params = LaunchParams::from_pairs([
            ("iss", "https://ehr.example/fhir"),
            ("launch", "abc"),
            ("utm", "ignored"),
        ]);
        assert_eq!(
            params.trigger(),
            Some(LaunchTrigger::Launch {
                iss: "https://ehr.example/fhir".to_string(),
                launch: "abc".to_string()
            })
        );
    }

    #[test]
    fn test_callback_trigger() {
        let params = LaunchParams::from_pairs([("code", "c1"), ("state", "s1")]);
        assert_eq!(
            params.trigger(),
            Some(LaunchTrigger::Callback { code: "c1".to_string(), state: "s1".to_string() })
        );
    }

    #[test]
    fn test_partial_parameters_do_not_trigger() {
        assert_eq!(LaunchParams::from_pairs([("iss", "x")]).trigger(), None);
        assert_eq!(LaunchParams::from_pairs([("code", "c1")]).trigger(), None);
        assert_eq!(
            LaunchParams::from_pairs([("iss", "x"), ("launch", "y"), ("state", "s")]).trigger(),
            None
        );
        assert_eq!(LaunchParams::from_pairs([("iss", ""), ("launch", "y")]).trigger(), None);
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&LaunchStatus::Error("boom".to_string())).unwrap();
        assert_eq!(json, r#"{"status":"error","message":"boom"}"#);
        assert!(LaunchStatus::Authorized.is_terminal());
        assert!(!LaunchStatus::Authorizing.is_terminal());
    }
}

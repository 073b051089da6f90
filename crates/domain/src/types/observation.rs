//! Observation helpers: category grouping, update merging, and edit/draft
//! assembly.
//!
//! Observations stay opaque `serde_json::Value` documents so that fields the
//! client does not model survive a read-modify-write untouched.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value};

use crate::constants::{
    LOINC_SYSTEM, NOT_AVAILABLE, OBSERVATION_CATEGORY_SYSTEM, UCUM_CELSIUS, UCUM_FAHRENHEIT,
    UCUM_SYSTEM, UNKNOWN_CATEGORY, VITAL_SIGNS_CATEGORY_CODE,
};
use crate::errors::{Result, SmartError};
use crate::utils::quantity::{normalize_unit, parse_value_and_unit};

/// Fields a partial update may overwrite on the current server resource.
pub const MERGEABLE_FIELDS: [&str; 3] = ["status", "code", "valueQuantity"];

/// Observations grouped by category display name.
///
/// Categories keep the order in which they were first seen; observations
/// keep their input order inside each category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationGroups {
    groups: Vec<(String, Vec<Value>)>,
}

impl ObservationGroups {
    pub fn get(&self, category: &str) -> Option<&[Value]> {
        self.groups
            .iter()
            .find(|(name, _)| name == category)
            .map(|(_, observations)| observations.as_slice())
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Value])> {
        self.groups.iter().map(|(name, observations)| (name.as_str(), observations.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Flatten back into one sequence, category by category.
    pub fn flatten(&self) -> Vec<Value> {
        self.groups.iter().flat_map(|(_, observations)| observations.iter().cloned()).collect()
    }

    fn push(&mut self, category: &str, observation: Value) {
        match self.groups.iter_mut().find(|(name, _)| name == category) {
            Some((_, observations)) => observations.push(observation),
            None => self.groups.push((category.to_string(), vec![observation])),
        }
    }
}

/// Category key of an observation: the display of the first coding of the
/// first category, or `"Unknown"`.
pub fn category_of(observation: &Value) -> &str {
    observation
        .pointer("/category/0/coding/0/display")
        .and_then(Value::as_str)
        .filter(|display| !display.is_empty())
        .unwrap_or(UNKNOWN_CATEGORY)
}

/// Group observations by [`category_of`].
pub fn group_by_category<I>(observations: I) -> ObservationGroups
where
    I: IntoIterator<Item = Value>,
{
    let mut groups = ObservationGroups::default();
    for observation in observations {
        let category = category_of(&observation).to_string();
        groups.push(&category, observation);
    }
    groups
}

/// `meta.versionId` of a resource, if the server supplied one.
pub fn version_id(resource: &Value) -> Option<&str> {
    resource.pointer("/meta/versionId").and_then(Value::as_str)
}

/// Weak ETag for `If-Match` built from the resource's version.
pub fn if_match_header(resource: &Value) -> Option<String> {
    version_id(resource).map(|version| format!("W/\"{version}\""))
}

/// Whether `changes` is a complete Observation document rather than a patch.
pub fn is_complete_observation(changes: &Value) -> bool {
    changes.get("resourceType").and_then(Value::as_str) == Some("Observation")
}

/// Build the body for a read-modify-write update of `current`.
///
/// A complete Observation replaces the resource but keeps the server's `id`
/// and `meta`. A partial object only contributes [`MERGEABLE_FIELDS`]; when
/// it sets `valueQuantity`, server-generated narrative is dropped so the
/// server regenerates it.
pub fn merge_for_update(current: &Value, changes: &Value) -> Value {
    if is_complete_observation(changes) {
        let mut updated = changes.clone();
        if let Some(object) = updated.as_object_mut() {
            for field in ["id", "meta"] {
                match current.get(field) {
                    Some(value) => {
                        object.insert(field.to_string(), value.clone());
                    }
                    None => {
                        object.remove(field);
                    }
                }
            }
        }
        return updated;
    }

    let mut updated = current.clone();
    let Some(object) = updated.as_object_mut() else {
        return updated;
    };

    for field in MERGEABLE_FIELDS {
        if let Some(value) = changes.get(field).filter(|value| is_present(value)) {
            object.insert(field.to_string(), value.clone());
        }
    }

    let sets_quantity = changes.get("valueQuantity").is_some_and(is_present);
    let generated_text =
        object.get("text").and_then(|text| text.get("status")).and_then(Value::as_str)
            == Some("generated");
    if sets_quantity && generated_text {
        object.remove("text");
    }

    updated
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(text) => !text.is_empty(),
        _ => true,
    }
}

/// Values entered for an existing observation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservationEdit {
    pub status: Option<String>,
    pub code: Option<String>,
    pub code_text: Option<String>,
    /// Free text such as `"37.3 degC"`
    pub value: Option<String>,
}

impl ObservationEdit {
    /// Assemble the partial update for `current` from the edited fields.
    ///
    /// Only changed fields are included. A new value keeps the other
    /// `valueQuantity` fields, and a `final` observation becomes `corrected`.
    pub fn build_patch(&self, current: &Value) -> Value {
        let mut patch = Map::new();

        if let Some(status) = non_empty(self.status.as_deref()) {
            if current.get("status").and_then(Value::as_str) != Some(status) {
                patch.insert("status".to_string(), json!(status));
            }
        }

        let code = non_empty(self.code.as_deref());
        let code_text = non_empty(self.code_text.as_deref());
        if code.is_some() || code_text.is_some() {
            let current_code = |pointer: &str| current.pointer(pointer).cloned();
            patch.insert(
                "code".to_string(),
                json!({
                    "coding": [{
                        "system": LOINC_SYSTEM,
                        "code": code.map(Value::from).or_else(|| current_code("/code/coding/0/code")),
                        "display": code_text
                            .map(Value::from)
                            .or_else(|| current_code("/code/coding/0/display")),
                    }],
                    "text": code_text.map(Value::from).or_else(|| current_code("/code/text")),
                }),
            );
        }

        let parsed = parse_value_and_unit(self.value.as_deref().unwrap_or_default());
        if let Some(value) = parsed.value {
            let mut quantity = current
                .get("valueQuantity")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            quantity.insert("value".to_string(), json!(value));
            quantity.entry("system").or_insert_with(|| json!(UCUM_SYSTEM));

            let current_unit = current
                .pointer("/valueQuantity/unit")
                .and_then(Value::as_str)
                .map(normalize_unit);
            for ucum in [UCUM_CELSIUS, UCUM_FAHRENHEIT] {
                if parsed.unit == ucum || current_unit == Some(ucum) {
                    quantity.insert("unit".to_string(), json!(ucum));
                    quantity.insert("code".to_string(), json!(ucum));
                    break;
                }
            }

            if !quantity.contains_key("code") {
                if let Some(unit) = quantity.get("unit").cloned() {
                    quantity.insert("code".to_string(), unit);
                }
            }
            patch.insert("valueQuantity".to_string(), Value::Object(quantity));

            if current.get("status").and_then(Value::as_str) == Some("final") {
                patch.insert("status".to_string(), json!("corrected"));
            }
        }

        Value::Object(patch)
    }
}

/// Input for a brand-new observation in a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationDraft {
    /// Category display name the observation is filed under
    pub category: String,
    pub code: String,
    pub code_text: Option<String>,
    pub value: String,
    pub unit: String,
    pub status: String,
}

impl ObservationDraft {
    /// Build the Observation document to POST.
    ///
    /// # Errors
    /// Returns `SmartError::InvalidInput` when the code is empty or the
    /// value is not a number.
    pub fn into_resource(
        self,
        patient_id: &str,
        encounter_id: Option<&str>,
        effective: DateTime<Utc>,
    ) -> Result<Value> {
        let code = self.code.trim();
        if code.is_empty() {
            return Err(SmartError::InvalidInput("observation code is required".to_string()));
        }
        let value = self
            .value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| {
                SmartError::InvalidInput(format!("observation value '{}' is not a number", self.value))
            })?;

        let display = non_empty(self.code_text.as_deref()).unwrap_or(code);
        let unit = self.unit.trim();

        let mut resource = json!({
            "resourceType": "Observation",
            "status": self.status,
            "category": [{
                "coding": [{
                    "system": OBSERVATION_CATEGORY_SYSTEM,
                    "code": VITAL_SIGNS_CATEGORY_CODE,
                    "display": self.category,
                }]
            }],
            "code": {
                "coding": [{ "system": LOINC_SYSTEM, "code": code, "display": display }],
                "text": display,
            },
            "subject": { "reference": format!("Patient/{patient_id}") },
            "effectiveDateTime": effective.to_rfc3339_opts(SecondsFormat::Millis, true),
            "valueQuantity": {
                "value": value,
                "unit": unit,
                "system": UCUM_SYSTEM,
                "code": normalize_unit(unit),
            },
        });

        if let (Some(encounter), Some(object)) = (encounter_id, resource.as_object_mut()) {
            object.insert(
                "encounter".to_string(),
                json!({ "reference": format!("Encounter/{encounter}") }),
            );
        }

        Ok(resource)
    }
}

/// Human-readable value of an observation.
pub fn display_value(observation: &Value) -> String {
    if let Some(quantity) = observation.get("valueQuantity") {
        let value = match quantity.get("value") {
            Some(Value::Number(number)) => number.to_string(),
            Some(Value::String(text)) => text.clone(),
            _ => String::new(),
        };
        let unit = quantity.get("unit").and_then(Value::as_str).unwrap_or_default();
        return format!("{value} {unit}").trim_end().to_string();
    }
    if let Some(concept) = observation.get("valueCodeableConcept") {
        return concept
            .pointer("/coding/0/display")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
    }
    NOT_AVAILABLE.to_string()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

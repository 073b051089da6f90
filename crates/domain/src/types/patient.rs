//! Patient demographics extracted from a FHIR Patient resource.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::NOT_AVAILABLE;

/// Display-ready demographics; missing values are `"N/A"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientSummary {
    pub id: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: String,
    pub gender: String,
    pub mrn: String,
    pub address: String,
    pub phone: String,
    pub email: String,
}

impl PatientSummary {
    pub fn from_resource(patient: &Value) -> Self {
        let text = |pointer: &str| {
            patient
                .pointer(pointer)
                .and_then(Value::as_str)
                .filter(|value| !value.is_empty())
                .map_or_else(|| NOT_AVAILABLE.to_string(), ToString::to_string)
        };

        let first_name = patient
            .pointer("/name/0/given")
            .and_then(Value::as_array)
            .map(|given| given.iter().filter_map(Value::as_str).collect::<Vec<_>>().join(" "))
            .filter(|joined| !joined.is_empty())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());

        Self {
            id: patient.get("id").and_then(Value::as_str).map(ToString::to_string),
            first_name,
            last_name: text("/name/0/family"),
            birth_date: text("/birthDate"),
            gender: text("/gender"),
            mrn: medical_record_number(patient).unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            address: text("/address/0/text"),
            phone: telecom(patient, "phone").unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            email: telecom(patient, "email").unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        }
    }

    /// Full name as `"<given> <family>"`.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Age in whole years on `today`, if the birth date parses.
    pub fn age_on(&self, today: NaiveDate) -> Option<i32> {
        let birth = NaiveDate::parse_from_str(&self.birth_date, "%Y-%m-%d").ok()?;
        let mut age = today.year() - birth.year();
        if (today.month(), today.day()) < (birth.month(), birth.day()) {
            age -= 1;
        }
        Some(age)
    }
}

fn medical_record_number(patient: &Value) -> Option<String> {
    patient
        .get("identifier")?
        .as_array()?
        .iter()
        .find(|identifier| {
            identifier.pointer("/type/coding/0/code").and_then(Value::as_str) == Some("MR")
        })
        .and_then(|identifier| identifier.get("value"))
        .and_then(Value::as_str)
        .map(ToString::to_string)
}

fn telecom(patient: &Value, system: &str) -> Option<String> {
    patient
        .get("telecom")?
        .as_array()?
        .iter()
        .find(|contact| contact.get("system").and_then(Value::as_str) == Some(system))
        .and_then(|contact| contact.get("value"))
        .and_then(Value::as_str)
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn patient() -> Value {
        json!({
            "resourceType": "Patient",
            "id": "12724066",
            "name": [{ "family": "Smart", "given": ["Nancy", "Ann"] }],
            "birthDate": "1980-08-11",
            "gender": "female",
            "identifier": [
                { "type": { "coding": [{ "code": "DL" }] }, "value": "D123" },
                { "type": { "coding": [{ "code": "MR" }] }, "value": "MRN-42" }
            ],
            "address": [{ "text": "1 Main St, Kansas City" }],
            "telecom": [
                { "system": "phone", "value": "555-0100" },
                { "system": "email", "value": "nancy@example.org" }
            ]
        })
    }

    #[test]
    fn test_summary_fields() {
        let summary = PatientSummary::from_resource(&patient());
        assert_eq!(summary.id.as_deref(), Some("12724066"));
        assert_eq!(summary.full_name(), "Nancy Ann Smart");
        assert_eq!(summary.mrn, "MRN-42");
        assert_eq!(summary.address, "1 Main St, Kansas City");
        assert_eq!(summary.phone, "555-0100");
        assert_eq!(summary.email, "nancy@example.org");
    }

    #[test]
    fn test_missing_fields_are_not_available() {
        let summary = PatientSummary::from_resource(&json!({ "resourceType": "Patient" }));
        assert_eq!(summary.first_name, "N/A");
        assert_eq!(summary.last_name, "N/A");
        assert_eq!(summary.mrn, "N/A");
        assert_eq!(summary.email, "N/A");
        assert_eq!(summary.age_on(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()), None);
    }

    #[test]
    fn test_age_before_and_after_birthday() {
        let summary = PatientSummary::from_resource(&patient());
        assert_eq!(summary.age_on(NaiveDate::from_ymd_opt(2024, 8, 10).unwrap()), Some(43));
        assert_eq!(summary.age_on(NaiveDate::from_ymd_opt(2024, 8, 11).unwrap()), Some(44));
    }
}

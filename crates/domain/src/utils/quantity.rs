//! Quantity value parsing for observation edits.
//!
//! Turns free-text entries such as `"37.3 degC"` or `"120 mmHg"` into a
//! numeric value plus a UCUM-normalized unit.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::{UCUM_CELSIUS, UCUM_FAHRENHEIT};

// The unit may not start with a digit, otherwise "70" splits into 7 + "0".
static VALUE_WITH_UNIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([+-]?[\d.]+)\s*([^\d.\s].*)$")
        .expect("VALUE_WITH_UNIT should compile - this is a bug")
});

static LEADING_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)")
        .expect("LEADING_NUMBER should compile - this is a bug")
});

/// A parsed numeric value with its (possibly empty) unit.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedQuantity {
    pub value: Option<f64>,
    pub unit: String,
}

/// Parse `"<number> <unit>"`, a bare number, or nothing.
///
/// Temperature units are mapped to their UCUM codes (`Cel`, `[degF]`).
pub fn parse_value_and_unit(input: &str) -> ParsedQuantity {
    let input = input.trim();
    if input.is_empty() {
        return ParsedQuantity { value: None, unit: String::new() };
    }

    if let Some(captures) = VALUE_WITH_UNIT.captures(input) {
        if let Some(value) = leading_number(&captures[1]) {
            return ParsedQuantity {
                value: Some(value),
                unit: normalize_unit(captures[2].trim()).to_string(),
            };
        }
    }

    ParsedQuantity { value: leading_number(input), unit: String::new() }
}

/// Numeric prefix of `text`; `"1.5.2"` reads as 1.5.
fn leading_number(text: &str) -> Option<f64> {
    LEADING_NUMBER
        .find(text)
        .and_then(|found| found.as_str().parse::<f64>().ok())
        .filter(|value| value.is_finite())
}

/// Map common temperature spellings to UCUM; other units pass through.
pub fn normalize_unit(unit: &str) -> &str {
    match unit {
        "degC" | "°C" | "celsius" | "C" => UCUM_CELSIUS,
        "degF" | "°F" | "fahrenheit" | "F" => UCUM_FAHRENHEIT,
        other => other,
    }
}

//! Domain utilities

pub mod quantity;

pub use quantity::{normalize_unit, parse_value_and_unit, ParsedQuantity};

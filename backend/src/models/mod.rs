//! Domain models shared by the transformer and the output sinks.
//!
//! - [`CellValue`] - One converted output value (text, integer or float)
//! - [`Record`] - The ordered item list produced for one input row
//! - [`Column`] - One output column of a table layout

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Cell Values
// =============================================================================

/// A converted value ready for an output table.
///
/// Serialized untagged, so JSON sinks emit plain strings and numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Int(i) => write!(f, "{}", i),
            CellValue::Float(x) => write!(f, "{}", x),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Int(i)
    }
}

impl From<f64> for CellValue {
    fn from(x: f64) -> Self {
        CellValue::Float(x)
    }
}

/// The converted item list for one row, in emitted-column order.
pub type Record = Vec<CellValue>;

// =============================================================================
// Table Layout
// =============================================================================

/// One column of an output table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Heading text.
    pub name: String,
    /// Display width, passed through from the field spec.
    pub width: i64,
    /// Whether cells hold formula templates with a `{row}` placeholder.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub formula: bool,
}

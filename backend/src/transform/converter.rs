//! Converter registry.
//!
//! A type tag in a field spec resolves to a [`ConverterKind`]. Parsing turns
//! the kind plus its parameters into a [`Converter`], which carries exactly
//! what that kind needs and is applied to each raw value through one
//! exhaustive match.

use std::fmt;
use std::rc::Rc;

use super::lookup::LookupTable;
use crate::models::{CellValue, Record};

/// Cell text used when a converter is configured without its parameters.
pub const CONVERTER_ERROR: &str = "invalid parameter in config file";

/// Every converter a field spec can name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConverterKind {
    Default,
    SecondsToDays,
    SecondsToHours,
    Float,
    Int,
    DateFromTimestamp,
    SubRecord,
    Formula,
    Lookup,
    Constant,
}

impl ConverterKind {
    pub const ALL: [ConverterKind; 10] = [
        ConverterKind::Default,
        ConverterKind::SecondsToDays,
        ConverterKind::SecondsToHours,
        ConverterKind::Float,
        ConverterKind::Int,
        ConverterKind::DateFromTimestamp,
        ConverterKind::SubRecord,
        ConverterKind::Formula,
        ConverterKind::Lookup,
        ConverterKind::Constant,
    ];

    /// Resolve a type tag. Matching ignores case; unknown and empty tags are `Default`.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "seconds-to-days" | "sec2day" => ConverterKind::SecondsToDays,
            "seconds-to-hours" | "sec2hour" => ConverterKind::SecondsToHours,
            "float" => ConverterKind::Float,
            "int" => ConverterKind::Int,
            "date-from-timestamp" | "time2date" => ConverterKind::DateFromTimestamp,
            "subrecord" | "subfile" => ConverterKind::SubRecord,
            "formula" | "func" => ConverterKind::Formula,
            "lookup" => ConverterKind::Lookup,
            "constant" => ConverterKind::Constant,
            _ => ConverterKind::Default,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConverterKind::Default => "default",
            ConverterKind::SecondsToDays => "seconds-to-days",
            ConverterKind::SecondsToHours => "seconds-to-hours",
            ConverterKind::Float => "float",
            ConverterKind::Int => "int",
            ConverterKind::DateFromTimestamp => "date-from-timestamp",
            ConverterKind::SubRecord => "subrecord",
            ConverterKind::Formula => "formula",
            ConverterKind::Lookup => "lookup",
            ConverterKind::Constant => "constant",
        }
    }

    /// Kinds that turn one raw string into one value with no parameters.
    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            ConverterKind::Default
                | ConverterKind::SecondsToDays
                | ConverterKind::SecondsToHours
                | ConverterKind::Float
                | ConverterKind::Int
                | ConverterKind::DateFromTimestamp
        )
    }

    /// Convert a raw string with a scalar kind. Other kinds keep the text.
    pub fn convert_scalar(self, input: &str) -> CellValue {
        match self {
            ConverterKind::SecondsToDays => seconds_to_days(input),
            ConverterKind::SecondsToHours => seconds_to_hours(input),
            ConverterKind::Float => to_float(input),
            ConverterKind::Int => to_int(input),
            ConverterKind::DateFromTimestamp => date_from_timestamp(input),
            _ => CellValue::from(input),
        }
    }
}

impl fmt::Display for ConverterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Scalar conversions
// =============================================================================

/// Whole seconds as `"DDd HHh MMs"` (the last group counts minutes).
pub fn seconds_to_days(input: &str) -> CellValue {
    match input.parse::<i64>() {
        Ok(seconds) => {
            let days = seconds / 86400;
            let hours = seconds % 86400 / 3600;
            let mins = seconds % 86400 % 3600 / 60;
            CellValue::Text(format!("{:02}d {:02}h {:02}s", days, hours, mins))
        }
        Err(_) => CellValue::from(input),
    }
}

pub fn seconds_to_hours(input: &str) -> CellValue {
    match input.parse::<f64>() {
        Ok(seconds) => CellValue::Float(seconds / 3600.0),
        Err(_) => CellValue::from(input),
    }
}

pub fn to_float(input: &str) -> CellValue {
    input
        .parse::<f64>()
        .map(CellValue::Float)
        .unwrap_or_else(|_| CellValue::from(input))
}

pub fn to_int(input: &str) -> CellValue {
    input
        .parse::<i64>()
        .map(CellValue::Int)
        .unwrap_or_else(|_| CellValue::from(input))
}

/// Keep the date part of a `"date time"` value, e.g. `"27/May/21 2:11 AM"`.
pub fn date_from_timestamp(input: &str) -> CellValue {
    CellValue::from(input.split(' ').next().unwrap_or(""))
}

// =============================================================================
// Configured converters
// =============================================================================

/// A resolved lookup: where the key comes from, which table, which column.
#[derive(Debug, Clone)]
pub struct LookupRef {
    /// Index of the key value in the item list being built
    pub source: usize,
    pub table: Rc<LookupTable>,
    /// 0-based index into the matched value row (key column excluded)
    pub column: usize,
}

impl LookupRef {
    /// Resolve the lookup against the items converted so far.
    ///
    /// A missing key item, a miss, or an out-of-range column all yield an
    /// empty result, which is then replaced by the table default.
    pub fn resolve(&self, items: &[CellValue]) -> String {
        let resolved = items
            .get(self.source)
            .and_then(|key| self.table.find(&key.to_string()))
            .and_then(|row| row.get(self.column))
            .cloned()
            .unwrap_or_default();

        if resolved.is_empty() {
            self.table.default_value.clone()
        } else {
            resolved
        }
    }
}

/// A field's converter with its parse-time parameters
#[derive(Debug, Clone)]
pub enum Converter {
    Default,
    SecondsToDays,
    SecondsToHours,
    Float,
    Int,
    DateFromTimestamp,
    /// Repeating-group column routed to the named child table
    SubRecord { table: String },
    /// Spreadsheet formula with a `{row}` placeholder
    Formula { template: String },
    Lookup(LookupRef),
    Constant { value: String },
}

impl Converter {
    /// The converter for a scalar kind; non-scalar kinds fall back to `Default`.
    pub fn scalar(kind: ConverterKind) -> Self {
        match kind {
            ConverterKind::SecondsToDays => Converter::SecondsToDays,
            ConverterKind::SecondsToHours => Converter::SecondsToHours,
            ConverterKind::Float => Converter::Float,
            ConverterKind::Int => Converter::Int,
            ConverterKind::DateFromTimestamp => Converter::DateFromTimestamp,
            _ => Converter::Default,
        }
    }

    pub fn constant(value: impl Into<String>) -> Self {
        Converter::Constant { value: value.into() }
    }

    pub fn kind(&self) -> ConverterKind {
        match self {
            Converter::Default => ConverterKind::Default,
            Converter::SecondsToDays => ConverterKind::SecondsToDays,
            Converter::SecondsToHours => ConverterKind::SecondsToHours,
            Converter::Float => ConverterKind::Float,
            Converter::Int => ConverterKind::Int,
            Converter::DateFromTimestamp => ConverterKind::DateFromTimestamp,
            Converter::SubRecord { .. } => ConverterKind::SubRecord,
            Converter::Formula { .. } => ConverterKind::Formula,
            Converter::Lookup(_) => ConverterKind::Lookup,
            Converter::Constant { .. } => ConverterKind::Constant,
        }
    }

    /// Sub-record values go to a child table, never to the item list.
    pub fn emits_item(&self) -> bool {
        !matches!(self, Converter::SubRecord { .. })
    }

    /// Convert one raw value.
    ///
    /// When `emit` is set the converted value is appended to `items`. The
    /// return value, if any, replaces the raw value for later readers of
    /// this column; only lookups produce one.
    pub fn apply(&self, items: &mut Record, input: &str, emit: bool) -> Option<String> {
        match self {
            Converter::Default
            | Converter::SecondsToDays
            | Converter::SecondsToHours
            | Converter::Float
            | Converter::Int
            | Converter::DateFromTimestamp => {
                if emit {
                    items.push(self.kind().convert_scalar(input));
                }
                None
            }
            Converter::SubRecord { .. } => None,
            Converter::Formula { template } => {
                if emit {
                    items.push(CellValue::Text(template.clone()));
                }
                None
            }
            Converter::Constant { value } => {
                if emit {
                    items.push(CellValue::Text(value.clone()));
                }
                None
            }
            Converter::Lookup(lookup) => {
                let resolved = lookup.resolve(items);
                if emit {
                    items.push(lookup.table.value_kind.convert_scalar(&resolved));
                }
                Some(resolved)
            }
        }
    }
}

/// Get a description of all converter types for the CLI
pub fn converters_description() -> String {
    r#"Field spec format: inputName,outputName[,width[,type[,params...]]]

| Type | Alias | Output | Parameters |
|------|-------|--------|------------|
| default | - | raw text | - |
| seconds-to-days | sec2day | "DDd HHh MMs" text | - |
| seconds-to-hours | sec2hour | seconds / 3600 as float | - |
| float | - | float, raw text if unparsable | - |
| int | - | integer, raw text if unparsable | - |
| date-from-timestamp | time2date | text before the first space | - |
| subrecord | subfile | rows in a child table, no column | child table name |
| formula | func | formula text, {row} = output row | formula (may contain commas) |
| lookup | - | value from a lookup table | key field output name, table name, column number (1-based, key column = 1) |
| constant | - | fixed text | the text |

Examples:
  Issue key,Key,12
  Time Spent,Spent,14,sec2day
  ,Total,10,formula,=SUM(C{row},D{row})
  Status,Category,20,lookup,Status,StatusMap,2
  Log Work,,20,subrecord,JiraLogTime"#
        .to_string()
}

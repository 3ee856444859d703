//! Field spec parsing.
//!
//! Each spec line describes one output column:
//!
//! ```text
//! inputName, outputName [, width [, type [, params...]]]
//! ```
//!
//! Parameters depend on the type:
//!
//! - `subrecord`: the child table name
//! - `formula`: everything after the type, commas included
//! - `lookup`: key field output name, lookup table name, 1-based column
//!   number counting the key column (so the first value column is 2)
//! - `constant`: the text
//!
//! A malformed field is never dropped. It becomes a `constant` whose text is
//! the diagnostic, so the column layout stays stable and the problem shows
//! up in the output itself. Lines with fewer than two tokens are skipped.

use std::collections::HashMap;
use std::rc::Rc;

use super::converter::{Converter, ConverterKind, LookupRef, CONVERTER_ERROR};
use super::lookup::LookupTable;
use crate::logs::{log_detail, log_error, log_warning};
use crate::models::{Column, Record};

/// Display width used when a spec omits it.
pub const DEFAULT_WIDTH: i64 = 20;

/// One configured output column and the rule producing its value
#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// Source column name; may be empty
    pub input_name: String,
    /// Column heading; empty means the value is not emitted
    pub output_name: String,
    pub width: i64,
    /// The type tag as written
    pub type_tag: String,
    pub converter: Converter,
    /// Why the field was degraded to a constant, if it was
    pub diagnostic: Option<String>,
}

impl FieldSpec {
    pub fn new(input_name: impl Into<String>, output_name: impl Into<String>) -> Self {
        Self {
            input_name: input_name.into(),
            output_name: output_name.into(),
            width: DEFAULT_WIDTH,
            type_tag: String::new(),
            converter: Converter::Default,
            diagnostic: None,
        }
    }

    pub fn kind(&self) -> ConverterKind {
        self.converter.kind()
    }

    /// Whether the field contributes a value to the item list.
    pub fn emits(&self) -> bool {
        !self.output_name.is_empty() && self.converter.emits_item()
    }

    /// Repeating-group fields bind to every matching header column.
    pub fn is_repeating(&self) -> bool {
        matches!(self.converter, Converter::SubRecord { .. })
    }

    pub fn is_degraded(&self) -> bool {
        self.diagnostic.is_some()
    }

    /// Convert a raw value, appending to `items` if the field emits.
    pub fn convert(&self, items: &mut Record, input: &str) -> Option<String> {
        self.converter.apply(items, input, self.emits())
    }

    fn degrade(&mut self, message: String) {
        log_error(format!("Processing field: {} return error: {}", self.output_name, message));
        self.converter = Converter::constant(message.as_str());
        self.diagnostic = Some(message);
    }
}

/// Parsed fields in declared order, with name indexes
#[derive(Debug, Clone, Default)]
pub struct FieldSet {
    fields: Vec<FieldSpec>,
    /// Input name → every field reading that column
    by_input: HashMap<String, Vec<usize>>,
    /// Field index → index in the item list, for fields that emit
    item_positions: Vec<Option<usize>>,
    item_count: usize,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field, indexing it by input name and item position.
    pub fn push(&mut self, field: FieldSpec) {
        let index = self.fields.len();
        if !field.input_name.is_empty() {
            self.by_input.entry(field.input_name.clone()).or_default().push(index);
        }
        if field.emits() {
            self.item_positions.push(Some(self.item_count));
            self.item_count += 1;
        } else {
            self.item_positions.push(None);
        }
        self.fields.push(field);
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn get(&self, index: usize) -> Option<&FieldSpec> {
        self.fields.get(index)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of values each converted record holds.
    pub fn item_count(&self) -> usize {
        self.item_count
    }

    /// Indexes of the fields reading an input column.
    pub fn fields_reading(&self, input_name: &str) -> &[usize] {
        self.by_input.get(input_name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Item-list position of a field, if it emits.
    pub fn item_position(&self, index: usize) -> Option<usize> {
        self.item_positions.get(index).copied().flatten()
    }

    /// First field with this output name.
    pub fn find_output(&self, output_name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.output_name == output_name)
    }

    /// Item-list position of the first field with this output name.
    pub fn output_position(&self, output_name: &str) -> Option<usize> {
        self.find_output(output_name).and_then(|i| self.item_position(i))
    }

    /// Column layout of the emitted values.
    pub fn columns(&self) -> Vec<Column> {
        self.fields
            .iter()
            .filter(|f| f.emits())
            .map(|f| Column {
                name: f.output_name.clone(),
                width: f.width,
                formula: matches!(f.converter, Converter::Formula { .. }),
            })
            .collect()
    }

    /// Fields that were degraded to a diagnostic constant.
    pub fn degraded(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.is_degraded())
    }

    /// Convert a positional row: field `i` reads `raw[i]`.
    pub fn convert_raw(&self, raw: &[String]) -> Record {
        let mut items: Record = Vec::with_capacity(self.item_count);
        for (field, value) in self.fields.iter().zip(raw) {
            field.convert(&mut items, value);
        }
        items
    }
}

/// Parse spec lines into a field set. Lookups may only reference fields
/// declared on earlier lines.
pub fn parse_field_specs<S: AsRef<str>>(
    lines: &[S],
    lookups: &HashMap<String, Rc<LookupTable>>,
) -> FieldSet {
    let mut set = FieldSet::new();
    for line in lines {
        let line = line.as_ref();
        if let Some(field) = parse_field_spec(line, &set, lookups) {
            log_detail(format!(
                "Field [{}] -> [{}] width {} type {}",
                field.input_name,
                field.output_name,
                field.width,
                field.kind()
            ));
            set.push(field);
        }
    }
    set
}

/// Parse one spec line against the fields declared so far.
///
/// Returns `None` only for lines with fewer than two tokens.
pub fn parse_field_spec(
    line: &str,
    declared: &FieldSet,
    lookups: &HashMap<String, Rc<LookupTable>>,
) -> Option<FieldSpec> {
    let tokens: Vec<&str> = line.split(',').collect();
    if tokens.len() < 2 {
        log_error(format!(
            "incorrect field format, {:?} must have at least 2 parameters separated by `,`",
            line
        ));
        return None;
    }

    let mut field = FieldSpec::new(tokens[0].trim(), tokens[1].trim());

    if let Some(width) = tokens.get(2).map(|t| t.trim()) {
        match width.parse::<i64>() {
            Ok(w) => field.width = w,
            Err(_) => log_warning(format!(
                "Field [{}]: width {:?} is not a number, using {}",
                field.output_name, width, DEFAULT_WIDTH
            )),
        }
    }

    let Some(tag) = tokens.get(3).map(|t| t.trim()) else {
        return Some(field);
    };
    field.type_tag = tag.to_string();

    let kind = ConverterKind::from_tag(tag);
    let params = &tokens[4.min(tokens.len())..];

    let converter = match kind {
        ConverterKind::SubRecord => match params {
            [table] if !table.trim().is_empty() => Ok(Converter::SubRecord { table: table.trim().to_string() }),
            _ => Err(format!("invalid parameter size for {}, sub-record needs one table name", field.output_name)),
        },
        ConverterKind::Formula => {
            let template = params.join(",");
            let template = template.trim();
            if template.is_empty() {
                Err(format!("missing formula for {}", field.output_name))
            } else {
                Ok(Converter::Formula { template: template.to_string() })
            }
        }
        ConverterKind::Lookup => parse_lookup(&field.output_name, params, declared, lookups).map(Converter::Lookup),
        ConverterKind::Constant => match params {
            [value] => Ok(Converter::constant(value.trim())),
            _ => Err(CONVERTER_ERROR.to_string()),
        },
        scalar => {
            if !params.is_empty() {
                log_warning(format!(
                    "Field [{}]: type {} takes no parameters, ignoring {:?}",
                    field.output_name, scalar, params
                ));
            }
            Ok(Converter::scalar(scalar))
        }
    };

    match converter {
        Ok(converter) => field.converter = converter,
        Err(message) => field.degrade(message),
    }
    Some(field)
}

/// Validate lookup parameters: column number, then table, then key field.
fn parse_lookup(
    output_name: &str,
    params: &[&str],
    declared: &FieldSet,
    lookups: &HashMap<String, Rc<LookupTable>>,
) -> Result<LookupRef, String> {
    let [key_field, table_name, column] = params else {
        return Err(format!("invalid parameter size for {}", output_name));
    };
    let (key_field, table_name, column) = (key_field.trim(), table_name.trim(), column.trim());

    // Column numbers are 1-based and count the key column; value rows do not.
    let column_number: i64 = column
        .parse()
        .map_err(|_| format!("invalid lookup column number {}", column))?;
    let column_index = column_number - 2;
    if column_index < 0 {
        return Err(format!("incorrect map index value {}", column));
    }

    let table = lookups
        .get(table_name)
        .ok_or_else(|| format!("undefined lookup map {}", table_name))?;
    if let Some(error) = table.load_error() {
        return Err(error.to_string());
    }

    let key_index = declared
        .find_output(key_field)
        .ok_or_else(|| format!("the field not defined yet {}", key_field))?;
    let source = declared
        .item_position(key_index)
        .ok_or_else(|| format!("the field {} has no value to look up", key_field))?;

    Ok(LookupRef {
        source,
        table: Rc::clone(table),
        column: column_index as usize,
    })
}

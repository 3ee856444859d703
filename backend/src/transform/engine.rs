//! Row transformation.
//!
//! The header is resolved once into a [`HeaderLayout`]. Each data row then
//! runs through every field in declared order, producing the item list for
//! the primary table and appending child rows for repeating groups.

use std::collections::HashMap;

use super::converter::Converter;
use super::field::FieldSet;
use super::plan::ConversionPlan;
use super::subrecord::{split, SubRecordSpec, VALUE_FIELD};
use crate::error::{TransformError, TransformResult};
use crate::logs::log_debug;
use crate::models::Record;

const BOM: char = '\u{feff}';

/// Where a field reads its input
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InputBinding {
    /// Column absent from the header; the field reads an empty string
    #[default]
    Unset,
    Single(usize),
    /// Every header position of a repeating group, in header order
    Repeating(Vec<usize>),
}

/// Field bindings resolved from a header row
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeaderLayout {
    bindings: Vec<InputBinding>,
    /// Header name → position; a repeated name keeps its last position
    columns: HashMap<String, usize>,
    matched: usize,
}

impl HeaderLayout {
    /// Bind fields to header positions.
    ///
    /// A leading byte-order mark on the first cell is ignored. Repeating
    /// fields collect every matching position; other fields keep the last.
    pub fn resolve(header: &[String], fields: &FieldSet) -> Self {
        let mut layout = Self {
            bindings: vec![InputBinding::Unset; fields.len()],
            columns: HashMap::with_capacity(header.len()),
            matched: 0,
        };

        for (pos, cell) in header.iter().enumerate() {
            let name = if pos == 0 { cell.trim_start_matches(BOM) } else { cell.as_str() };
            layout.columns.insert(name.to_string(), pos);

            let readers = fields.fields_reading(name);
            if readers.is_empty() {
                continue;
            }
            layout.matched += 1;

            for &index in readers {
                let repeating = fields.get(index).is_some_and(|f| f.is_repeating());
                let binding = &mut layout.bindings[index];
                if repeating {
                    match binding {
                        InputBinding::Repeating(positions) => positions.push(pos),
                        _ => *binding = InputBinding::Repeating(vec![pos]),
                    }
                } else {
                    *binding = InputBinding::Single(pos);
                }
            }
        }
        layout
    }

    pub fn binding(&self, index: usize) -> &InputBinding {
        self.bindings.get(index).unwrap_or(&InputBinding::Unset)
    }

    /// Number of header cells read by at least one field.
    pub fn matched(&self) -> usize {
        self.matched
    }

    /// Position of a header column by name.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.get(name).copied()
    }
}

/// Converts rows against a plan, accumulating child-table rows
#[derive(Debug)]
pub struct RecordTransformer<'p> {
    plan: &'p ConversionPlan,
    layout: HeaderLayout,
    children: Vec<Vec<Record>>,
}

impl<'p> RecordTransformer<'p> {
    pub fn new(plan: &'p ConversionPlan, header: &[String]) -> Self {
        Self {
            plan,
            layout: HeaderLayout::resolve(header, &plan.fields),
            children: vec![Vec::new(); plan.sub_records.len()],
        }
    }

    pub fn layout(&self) -> &HeaderLayout {
        &self.layout
    }

    /// Convert one data row into its primary item list.
    ///
    /// Fails when a bound column lies beyond the row or a repeating group
    /// targets an undeclared child table.
    pub fn transform(&mut self, row: &[String]) -> TransformResult<Record> {
        let Self { plan, layout, children } = self;
        let plan: &ConversionPlan = plan;
        let fields = &plan.fields;

        // Lookup results replace their column's value for later readers.
        let mut values: Vec<String> = row.to_vec();
        let mut items = Record::with_capacity(fields.item_count());

        for (index, field) in fields.fields().iter().enumerate() {
            if let Converter::SubRecord { table } = &field.converter {
                let target = plan
                    .sub_record_index(table)
                    .ok_or_else(|| TransformError::UnknownSubRecord(table.clone()))?;
                if let InputBinding::Repeating(positions) = layout.binding(index) {
                    let spec = &plan.sub_records[target];
                    for &pos in positions {
                        let cell = values.get(pos).map(String::as_str).unwrap_or("");
                        if let Some(child) = child_row(spec, cell, &values, layout) {
                            children[target].push(child);
                        }
                    }
                }
                continue;
            }

            let position = match layout.binding(index) {
                InputBinding::Single(pos) => Some(*pos),
                _ => None,
            };
            let raw = match position {
                Some(pos) => values.get(pos).cloned().ok_or_else(|| TransformError::RowTooShort {
                    field: field.output_name.clone(),
                    position: pos,
                    len: row.len(),
                })?,
                None => String::new(),
            };

            if let Some(resolved) = field.convert(&mut items, &raw) {
                if let Some(pos) = position.filter(|_| !resolved.is_empty()) {
                    values[pos] = resolved;
                }
            }
        }

        Ok(items)
    }

    /// Child rows accumulated so far for a table.
    pub fn child_rows(&self, name: &str) -> &[Record] {
        self.plan
            .sub_record_index(name)
            .and_then(|i| self.children.get(i))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Each declared child table with its rows, in declaration order.
    pub fn into_child_tables(self) -> Vec<(&'p SubRecordSpec, Vec<Record>)> {
        self.plan.sub_records.iter().zip(self.children).collect()
    }
}

/// Build one child row from a repeating-group cell.
///
/// `value` fields receive the split cell; other fields copy the current row
/// value of the column with the same name. Returns `None` if a split fails.
fn child_row(spec: &SubRecordSpec, cell: &str, values: &[String], layout: &HeaderLayout) -> Option<Record> {
    let mut raw = Vec::with_capacity(spec.fields.len());
    for field in spec.fields.fields() {
        if field.input_name == VALUE_FIELD {
            match split(&spec.name, cell, &field.output_name) {
                Ok(part) => raw.push(part),
                Err(e) => {
                    log_debug(format!("[{}] skipped repetition {:?}: {}", spec.name, cell, e));
                    return None;
                }
            }
        } else {
            let known = layout
                .column(&field.input_name)
                .and_then(|pos| values.get(pos))
                .cloned()
                .unwrap_or_default();
            raw.push(known);
        }
    }
    Some(spec.fields.convert_raw(&raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SubFileConfig;
    use crate::models::CellValue;
    use crate::transform::field::parse_field_specs;
    use crate::transform::filter::FilterSet;
    use crate::transform::lookup::{LookupTable, MatchMode};
    use std::rc::Rc;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn plan(fields: &[&str], subfiles: &[(&str, &[&str])]) -> ConversionPlan {
        let mut status = LookupTable::new("StatusMap", MatchMode::Exact).with_default("Other");
        status
            .load_rows(vec![strings(&["Open", "A", "B", "C"]), strings(&["Done", "Closed"])], false)
            .unwrap();
        let mut lookups = HashMap::new();
        lookups.insert("StatusMap".to_string(), Rc::new(status));

        let sub_records = subfiles
            .iter()
            .map(|(name, child_fields)| {
                let config = SubFileConfig {
                    name: name.to_string(),
                    sheet_name: name.to_string(),
                    output: format!("{}.csv", name),
                    fields: strings(child_fields),
                };
                SubRecordSpec::from_config(&config, &lookups)
            })
            .collect();

        let fields = parse_field_specs(fields, &lookups);
        ConversionPlan::from_parts(fields, sub_records, lookups, FilterSet::default())
    }

    #[test]
    fn test_header_resolution() {
        let plan = plan(&["Key,Key", "Log Work,,20,subrecord,JiraLogTime", "Missing,Missing"], &[("JiraLogTime", &["value,Hours"])]);
        let header = strings(&["\u{feff}Key", "Log Work", "Summary", "Log Work"]);
        let layout = HeaderLayout::resolve(&header, &plan.fields);

        assert_eq!(layout.binding(0), &InputBinding::Single(0));
        assert_eq!(layout.binding(1), &InputBinding::Repeating(vec![1, 3]));
        assert_eq!(layout.binding(2), &InputBinding::Unset);
        assert_eq!(layout.binding(99), &InputBinding::Unset);
        assert_eq!(layout.matched(), 3);
        assert_eq!(layout.column("Summary"), Some(2));
    }

    #[test]
    fn test_header_resolution_is_idempotent() {
        let plan = plan(&["Key,Key", "Log Work,,20,subrecord,JiraLogTime"], &[("JiraLogTime", &["value,Hours"])]);
        let header = strings(&["Key", "Log Work", "Log Work"]);
        let first = HeaderLayout::resolve(&header, &plan.fields);
        let second = HeaderLayout::resolve(&header, &plan.fields);
        assert_eq!(first, second);
    }

    #[test]
    fn test_duplicate_plain_column_last_wins() {
        let plan = plan(&["Sprint,Sprint"], &[]);
        let layout = HeaderLayout::resolve(&strings(&["Sprint", "Key", "Sprint"]), &plan.fields);
        assert_eq!(layout.binding(0), &InputBinding::Single(2));
    }

    #[test]
    fn test_two_fields_share_one_column() {
        let plan = plan(&["Spent,Raw", "Spent,Days,12,sec2day"], &[]);
        let mut transformer = RecordTransformer::new(&plan, &strings(&["Spent"]));
        let items = transformer.transform(&strings(&["90061"])).unwrap();
        assert_eq!(items, vec![CellValue::from("90061"), CellValue::from("01d 01h 01s")]);
    }

    #[test]
    fn test_lookup_round_trip() {
        let plan = plan(&["Category,Category", "Status,Status,20,lookup,Category,StatusMap,4"], &[]);
        let mut transformer = RecordTransformer::new(&plan, &strings(&["Category", "Status"]));
        let items = transformer.transform(&strings(&["Open", "raw"])).unwrap();
        assert_eq!(items[1], CellValue::from("C"));
    }

    #[test]
    fn test_lookup_result_replaces_column_for_later_fields() {
        let plan = plan(
            &[
                "Category,Category",
                "Status,,20,lookup,Category,StatusMap,2",
                "Status,Status",
            ],
            &[],
        );
        let mut transformer = RecordTransformer::new(&plan, &strings(&["Category", "Status"]));
        let items = transformer.transform(&strings(&["Done", "raw"])).unwrap();
        assert_eq!(items, vec![CellValue::from("Done"), CellValue::from("Closed")]);
    }

    #[test]
    fn test_missing_column_reads_empty() {
        let plan = plan(&["Key,Key", "Nowhere,Nowhere,5,int"], &[]);
        let mut transformer = RecordTransformer::new(&plan, &strings(&["Key"]));
        let items = transformer.transform(&strings(&["K-1"])).unwrap();
        assert_eq!(items, vec![CellValue::from("K-1"), CellValue::from("")]);
    }

    #[test]
    fn test_short_row_is_structural_error() {
        let plan = plan(&["Key,Key", "Status,Status"], &[]);
        let mut transformer = RecordTransformer::new(&plan, &strings(&["Key", "Status"]));
        let err = transformer.transform(&strings(&["K-1"])).unwrap_err();
        assert_eq!(
            err,
            TransformError::RowTooShort { field: "Status".into(), position: 1, len: 1 }
        );
    }

    #[test]
    fn test_child_rows_from_repeating_group() {
        let plan = plan(
            &["Issue key,Key", "Log Work,,20,subrecord,JiraLogTime", "Summary,Summary"],
            &[("JiraLogTime", &["Issue key,Key", "Summary,Title", "value,Date,12,time2date", "value,Hours,8,int"])],
        );
        let header = strings(&["Issue key", "Log Work", "Log Work", "Summary", "Log Work"]);
        let mut transformer = RecordTransformer::new(&plan, &header);

        let items = transformer
            .transform(&strings(&[
                "K-1",
                "fixed;05/Jan/21 8:45 AM;uid:1;14400",
                "",
                "Crash",
                "a;b;06/Jan/21 9:00 AM;uid:2;3600",
            ]))
            .unwrap();
        assert_eq!(items, vec![CellValue::from("K-1"), CellValue::from("Crash")]);

        let rows = transformer.child_rows("JiraLogTime");
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            vec![CellValue::from("K-1"), CellValue::from("Crash"), CellValue::from("05/Jan/21"), CellValue::Int(14400)]
        );
        assert_eq!(rows[1][2], CellValue::from("06/Jan/21"));
        assert_eq!(rows[1][3], CellValue::Int(3600));
    }

    #[test]
    fn test_bad_repetition_dropped_alone() {
        let plan = plan(
            &["Log Work,,20,subrecord,JiraLogTime"],
            &[("JiraLogTime", &["value,Hours"])],
        );
        let header = strings(&["Log Work", "Log Work", "Log Work"]);
        let mut transformer = RecordTransformer::new(&plan, &header);
        transformer.transform(&strings(&["too;short", "c;d;u;60", ""])).unwrap();

        assert_eq!(transformer.child_rows("JiraLogTime"), &[vec![CellValue::from("60")]]);
    }

    #[test]
    fn test_unknown_sub_record_fails() {
        let plan = plan(&["Comment,,20,subrecord,Comments"], &[]);
        let mut transformer = RecordTransformer::new(&plan, &strings(&["Comment"]));
        let err = transformer.transform(&strings(&["hello"])).unwrap_err();
        assert_eq!(err, TransformError::UnknownSubRecord("Comments".into()));
    }

    #[test]
    fn test_into_child_tables_keeps_declaration_order() {
        let plan = plan(
            &["Log Work,,20,subrecord,JiraLogTime"],
            &[("Comments", &["value,Body"]), ("JiraLogTime", &["value,Hours"])],
        );
        let mut transformer = RecordTransformer::new(&plan, &strings(&["Log Work"]));
        transformer.transform(&strings(&["c;d;u;60"])).unwrap();

        let tables = transformer.into_child_tables();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].0.name, "Comments");
        assert!(tables[0].1.is_empty());
        assert_eq!(tables[1].1.len(), 1);
    }
}

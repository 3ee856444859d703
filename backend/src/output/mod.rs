//! Output tables.
//!
//! A [`TableSink`] receives converted records for one table. The output
//! path's extension picks the sink:
//!
//! - `.xlsx` - [`XlsxWorkbookWriter`], an Excel workbook shared by every
//!   table that names the same file
//! - `.json` - [`JsonWorkbookWriter`], a JSON workbook keyed by sheet name
//! - anything else - [`CsvTableWriter`], one delimited file per table
//!
//! Every sink buffers its rows and touches the file only on finish.
//!
//! Formula cells hold a `{row}` placeholder that the sink replaces with the
//! spreadsheet row the record lands on. The heading is row 1.

pub mod delimited;
pub mod workbook;
pub mod xlsx;

pub use delimited::CsvTableWriter;
pub use workbook::JsonWorkbookWriter;
pub use xlsx::XlsxWorkbookWriter;

use std::path::Path;

use crate::error::{OutputError, OutputResult};
use crate::models::{CellValue, Column};

/// Spreadsheet row holding the column headings.
pub const HEADING_ROW: usize = 1;

/// Placeholder replaced by the current row number in formula cells.
pub const ROW_PLACEHOLDER: &str = "{row}";

/// Destination for the rows of one output table
pub trait TableSink {
    /// Append one record. Rejects records whose length differs from the layout.
    fn write_row(&mut self, items: &[CellValue]) -> OutputResult<()>;

    /// Records accepted so far.
    fn rows_written(&self) -> usize;

    /// Flush and close the table.
    fn finish(self: Box<Self>) -> OutputResult<()>;
}

/// Open the sink for a table, chosen by the path's extension.
pub fn open_table(path: &str, sheet_name: &str, columns: Vec<Column>) -> OutputResult<Box<dyn TableSink>> {
    if has_extension(path, "xlsx") {
        Ok(Box::new(XlsxWorkbookWriter::new(path, sheet_name, columns)))
    } else if has_extension(path, "json") {
        Ok(Box::new(JsonWorkbookWriter::new(path, sheet_name, columns)))
    } else {
        Ok(Box::new(CsvTableWriter::new(path, columns)?))
    }
}

fn has_extension(path: &str, extension: &str) -> bool {
    Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

/// Replace every `{row}` in a formula template.
pub fn expand_formula(template: &str, row: usize) -> String {
    template.replace(ROW_PLACEHOLDER, &row.to_string())
}

/// Spreadsheet row of the `index`-th data record (0-based).
pub fn data_row_number(index: usize) -> usize {
    HEADING_ROW + index + 1
}

/// Check a record against the layout and expand its formula cells.
pub(crate) fn prepare_row(columns: &[Column], items: &[CellValue], row: usize) -> OutputResult<Vec<CellValue>> {
    if items.len() != columns.len() {
        return Err(OutputError::ColumnMismatch {
            expected: columns.len(),
            actual: items.len(),
        });
    }

    Ok(columns
        .iter()
        .zip(items)
        .map(|(column, item)| match item {
            CellValue::Text(template) if column.formula => CellValue::Text(expand_formula(template, row)),
            other => other.clone(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> Vec<Column> {
        vec![
            Column { name: "Key".into(), width: 12, formula: false },
            Column { name: "Total".into(), width: 10, formula: true },
        ]
    }

    #[test]
    fn test_expand_formula() {
        assert_eq!(expand_formula("=SUM(C{row},D{row})", 7), "=SUM(C7,D7)");
        assert_eq!(expand_formula("no placeholder", 7), "no placeholder");
    }

    #[test]
    fn test_first_data_row_is_two() {
        assert_eq!(data_row_number(0), 2);
        assert_eq!(data_row_number(9), 11);
    }

    #[test]
    fn test_prepare_row_only_expands_formula_columns() {
        let items = vec![CellValue::from("{row}"), CellValue::from("=B{row}*2")];
        let row = prepare_row(&columns(), &items, 3).unwrap();
        assert_eq!(row, vec![CellValue::from("{row}"), CellValue::from("=B3*2")]);
    }

    #[test]
    fn test_prepare_row_rejects_wrong_length() {
        let err = prepare_row(&columns(), &[CellValue::from("K-1")], 2).unwrap_err();
        assert!(matches!(err, OutputError::ColumnMismatch { expected: 2, actual: 1 }));
    }

    #[test]
    fn test_open_table_picks_writer_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let json = dir.path().join("out.JSON");
        let mut sink = open_table(&json.display().to_string(), "Issues", columns()).unwrap();
        sink.write_row(&[CellValue::from("K-1"), CellValue::from("=B{row}")]).unwrap();
        sink.finish().unwrap();
        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&json).unwrap()).unwrap();
        assert_eq!(value["Issues"]["rows"][0][1], "=B2");

        let csv = dir.path().join("out.csv");
        let sink = open_table(&csv.display().to_string(), "Issues", columns()).unwrap();
        sink.finish().unwrap();
        assert_eq!(std::fs::read_to_string(&csv).unwrap(), "Key,Total\n");

        let xlsx = dir.path().join("out.xlsx");
        let sink = open_table(&xlsx.display().to_string(), "Issues", columns()).unwrap();
        sink.finish().unwrap();
        let book: calamine::Xlsx<_> = calamine::open_workbook(&xlsx).unwrap();
        assert_eq!(calamine::Reader::sheet_names(&book), vec!["Issues".to_string()]);
    }
}

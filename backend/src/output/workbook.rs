//! JSON workbook writer.
//!
//! The file holds one object per sheet:
//!
//! ```json
//! { "Issues": { "columns": [{ "name": "Key", "width": 12 }], "rows": [["K-1"]] } }
//! ```
//!
//! Finishing a sheet replaces that sheet and keeps the others, so several
//! tables can share one workbook.

use serde_json::{json, Map, Value};
use std::path::PathBuf;

use super::{data_row_number, prepare_row, TableSink};
use crate::error::{OutputError, OutputResult};
use crate::logs::log_warning;
use crate::models::{CellValue, Column, Record};

/// Buffers one sheet and merges it into the workbook file on finish
#[derive(Debug)]
pub struct JsonWorkbookWriter {
    path: PathBuf,
    sheet_name: String,
    columns: Vec<Column>,
    rows: Vec<Record>,
}

impl JsonWorkbookWriter {
    pub fn new(path: impl Into<PathBuf>, sheet_name: &str, columns: Vec<Column>) -> Self {
        Self {
            path: path.into(),
            sheet_name: sheet_name.to_string(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Existing sheets of the workbook; an unreadable file starts a new one.
    fn load_existing(&self) -> Map<String, Value> {
        let Ok(content) = std::fs::read_to_string(&self.path) else {
            return Map::new();
        };
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(sheets)) => sheets,
            _ => {
                log_warning(format!(
                    "{} is not a workbook, its content is replaced",
                    self.path.display()
                ));
                Map::new()
            }
        }
    }

    /// The sheet as a JSON value.
    pub fn sheet(&self) -> Value {
        json!({
            "columns": self.columns,
            "rows": self.rows,
        })
    }
}

impl TableSink for JsonWorkbookWriter {
    fn write_row(&mut self, items: &[CellValue]) -> OutputResult<()> {
        let row = prepare_row(&self.columns, items, data_row_number(self.rows.len()))?;
        self.rows.push(row);
        Ok(())
    }

    fn rows_written(&self) -> usize {
        self.rows.len()
    }

    fn finish(self: Box<Self>) -> OutputResult<()> {
        let mut sheets = self.load_existing();
        sheets.insert(self.sheet_name.clone(), self.sheet());

        let content = serde_json::to_string_pretty(&Value::Object(sheets))?;
        std::fs::write(&self.path, content).map_err(|source| OutputError::Io {
            path: self.path.display().to_string(),
            source,
        })
    }
}

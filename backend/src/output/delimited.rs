//! CSV table writer.

use std::path::PathBuf;

use super::{data_row_number, prepare_row, TableSink};
use crate::error::{OutputError, OutputResult};
use crate::models::{CellValue, Column};

/// Writes one table as CSV: a heading row, then one line per record.
///
/// Rows are buffered; the file is only created by [`TableSink::finish`], so
/// an aborted run leaves no partial table behind.
pub struct CsvTableWriter {
    writer: csv::Writer<Vec<u8>>,
    columns: Vec<Column>,
    path: PathBuf,
    rows: usize,
}

impl CsvTableWriter {
    /// Start a table destined for `path` and buffer the heading row.
    pub fn new(path: impl Into<PathBuf>, columns: Vec<Column>) -> OutputResult<Self> {
        let mut writer = csv::WriterBuilder::new().flexible(false).from_writer(Vec::new());
        writer.write_record(columns.iter().map(|c| c.name.as_str()))?;
        Ok(Self {
            writer,
            columns,
            path: path.into(),
            rows: 0,
        })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// The table written so far, heading included.
    pub fn into_bytes(self) -> OutputResult<Vec<u8>> {
        let path = self.path.display().to_string();
        self.writer.into_inner().map_err(|e| OutputError::Io {
            source: std::io::Error::new(e.error().kind(), e.error().to_string()),
            path,
        })
    }
}

impl TableSink for CsvTableWriter {
    fn write_row(&mut self, items: &[CellValue]) -> OutputResult<()> {
        let row = prepare_row(&self.columns, items, data_row_number(self.rows))?;
        self.writer.write_record(row.iter().map(|v| v.to_string()))?;
        self.rows += 1;
        Ok(())
    }

    fn rows_written(&self) -> usize {
        self.rows
    }

    fn finish(self: Box<Self>) -> OutputResult<()> {
        let path = self.path.clone();
        let bytes = self.into_bytes()?;
        std::fs::write(&path, bytes).map_err(|source| OutputError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}

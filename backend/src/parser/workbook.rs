//! Worksheet reader for `.xlsx` sources.

use calamine::{open_workbook, Data, Reader, Xlsx, XlsxError};
use std::path::Path;

/// Whether a path names an Excel workbook (`.xlsx` or `.xlsm`).
pub fn is_workbook_path(path: &str) -> bool {
    Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx") || ext.eq_ignore_ascii_case("xlsm"))
}

/// Read every used row of one worksheet as text.
///
/// An empty `sheet_name` selects the first sheet. Rows start at the first
/// used row of the sheet; the caller decides whether it is a header.
pub fn read_sheet<P: AsRef<Path>>(path: P, sheet_name: &str) -> Result<Vec<Vec<String>>, XlsxError> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;

    let name = if sheet_name.is_empty() {
        workbook
            .sheet_names()
            .into_iter()
            .next()
            .ok_or_else(|| XlsxError::WorksheetNotFound(String::new()))?
    } else {
        sheet_name.to_string()
    };

    let range = workbook.worksheet_range(&name)?;
    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect())
}

/// Text of one cell. Whole floats print without a fraction.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.clone(),
        Data::Empty | Data::Error(_) => String::new(),
        other => other.to_string(),
    }
}

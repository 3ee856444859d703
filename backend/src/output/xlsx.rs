//! Excel workbook writer.
//!
//! Rows are buffered and the workbook is written on finish. Sheets already
//! in the file are carried over by value and formula; a sheet with the same
//! name is replaced. The written sheet is appended last and made active.
//!
//! Headings are bold and centered, column widths come from the layout,
//! formula columns become formula cells and numbers stay numeric.

use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use rust_xlsxwriter::{Format, FormatAlign, Workbook, Worksheet, XlsxError};
use std::collections::HashSet;
use std::path::PathBuf;

use super::{data_row_number, prepare_row, TableSink, HEADING_ROW};
use crate::error::{OutputError, OutputResult};
use crate::logs::{log_detail, log_warning};
use crate::models::{CellValue, Column, Record};

/// Buffers one sheet and rewrites the `.xlsx` file on finish
#[derive(Debug)]
pub struct XlsxWorkbookWriter {
    path: PathBuf,
    sheet_name: String,
    columns: Vec<Column>,
    rows: Vec<Record>,
}

impl XlsxWorkbookWriter {
    pub fn new(path: impl Into<PathBuf>, sheet_name: &str, columns: Vec<Column>) -> Self {
        Self {
            path: path.into(),
            sheet_name: sheet_name.to_string(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Copy the other sheets of an existing workbook into `workbook`.
    /// An unreadable file is replaced.
    fn carry_over(&self, workbook: &mut Workbook) -> OutputResult<()> {
        if !self.path.exists() {
            return Ok(());
        }
        let opened: Result<Xlsx<_>, _> = open_workbook(&self.path);
        let mut existing = match opened {
            Ok(book) => book,
            Err(e) => {
                log_warning(format!(
                    "{} is not a readable workbook ({}), its content is replaced",
                    self.path.display(),
                    e
                ));
                return Ok(());
            }
        };

        for name in existing.sheet_names() {
            if name.to_lowercase() == self.sheet_name.to_lowercase() {
                log_detail(format!("Sheet [{}] exists in {}, replaced", name, self.path.display()));
                continue;
            }
            let values = existing.worksheet_range(&name);
            let formulas = existing.worksheet_formula(&name);
            let (values, formulas) = match (values, formulas) {
                (Ok(values), Ok(formulas)) => (values, formulas),
                (Err(e), _) | (_, Err(e)) => {
                    log_warning(format!("Sheet [{}] of {} dropped: {}", name, self.path.display(), e));
                    continue;
                }
            };
            let sheet = workbook.add_worksheet();
            sheet.set_name(name.as_str())?;
            copy_sheet(sheet, &values, &formulas)?;
        }
        Ok(())
    }

    /// Write the heading and buffered rows onto a worksheet.
    fn write_sheet(&self, sheet: &mut Worksheet) -> OutputResult<()> {
        if !self.sheet_name.is_empty() {
            sheet.set_name(self.sheet_name.as_str())?;
        }

        let heading = heading_format();
        let heading_row = sheet_row(HEADING_ROW - 1)?;
        for (index, column) in self.columns.iter().enumerate() {
            let col = sheet_col(index)?;
            sheet.write_string_with_format(heading_row, col, column.name.as_str(), &heading)?;
            if column.width > 0 {
                sheet.set_column_width(col, column.width as f64)?;
            }
        }

        for (index, record) in self.rows.iter().enumerate() {
            let row = sheet_row(data_row_number(index) - 1)?;
            for (position, (column, item)) in self.columns.iter().zip(record).enumerate() {
                write_cell(sheet, row, sheet_col(position)?, item, column.formula)?;
            }
        }
        Ok(())
    }
}

impl TableSink for XlsxWorkbookWriter {
    fn write_row(&mut self, items: &[CellValue]) -> OutputResult<()> {
        let row = prepare_row(&self.columns, items, data_row_number(self.rows.len()))?;
        self.rows.push(row);
        Ok(())
    }

    fn rows_written(&self) -> usize {
        self.rows.len()
    }

    fn finish(self: Box<Self>) -> OutputResult<()> {
        let mut workbook = Workbook::new();
        self.carry_over(&mut workbook)?;

        let sheet = workbook.add_worksheet();
        self.write_sheet(sheet)?;
        sheet.set_active(true);

        workbook.save(&self.path).map_err(|e| match e {
            XlsxError::IoError(source) => OutputError::Io {
                path: self.path.display().to_string(),
                source,
            },
            other => other.into(),
        })
    }
}

/// Bold, centered and wrapped.
fn heading_format() -> Format {
    Format::new()
        .set_bold()
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_text_wrap()
}

fn sheet_row(index: usize) -> OutputResult<u32> {
    u32::try_from(index).map_err(|_| XlsxError::RowColumnLimitError.into())
}

fn sheet_col(index: usize) -> OutputResult<u16> {
    u16::try_from(index).map_err(|_| XlsxError::RowColumnLimitError.into())
}

fn write_cell(sheet: &mut Worksheet, row: u32, col: u16, item: &CellValue, formula: bool) -> OutputResult<()> {
    match item {
        CellValue::Int(i) => {
            sheet.write_number(row, col, *i as f64)?;
        }
        CellValue::Float(x) => {
            sheet.write_number(row, col, *x)?;
        }
        CellValue::Text(text) if text.is_empty() => {}
        CellValue::Text(text) if formula => {
            sheet.write_formula(row, col, text.as_str())?;
        }
        CellValue::Text(text) => {
            sheet.write_string(row, col, text.as_str())?;
        }
    }
    Ok(())
}

/// Copy cell values and formulas read from an existing sheet.
fn copy_sheet(sheet: &mut Worksheet, values: &Range<Data>, formulas: &Range<String>) -> OutputResult<()> {
    let mut formula_cells = HashSet::new();
    let (top, left) = formulas.start().unwrap_or_default();
    for (r, c, formula) in formulas.used_cells() {
        let at = (top as usize + r, left as usize + c);
        sheet.write_formula(sheet_row(at.0)?, sheet_col(at.1)?, formula.as_str())?;
        formula_cells.insert(at);
    }

    let (top, left) = values.start().unwrap_or_default();
    for (r, c, value) in values.used_cells() {
        let at = (top as usize + r, left as usize + c);
        if formula_cells.contains(&at) {
            continue;
        }
        let (row, col) = (sheet_row(at.0)?, sheet_col(at.1)?);
        match value {
            Data::Int(i) => {
                sheet.write_number(row, col, *i as f64)?;
            }
            Data::Float(x) => {
                sheet.write_number(row, col, *x)?;
            }
            Data::Bool(b) => {
                sheet.write_boolean(row, col, *b)?;
            }
            Data::DateTime(dt) => {
                sheet.write_number(row, col, dt.as_f64())?;
            }
            Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => {
                sheet.write_string(row, col, s.as_str())?;
            }
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> Vec<Column> {
        vec![
            Column { name: "Key".into(), width: 12, formula: false },
            Column { name: "Points".into(), width: 6, formula: false },
            Column { name: "Double".into(), width: 10, formula: true },
        ]
    }

    fn open(path: &std::path::Path) -> Xlsx<std::io::BufReader<std::fs::File>> {
        open_workbook(path).unwrap()
    }

    #[test]
    fn test_values_and_formulas() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");

        let mut writer = Box::new(XlsxWorkbookWriter::new(&path, "Issues", columns()));
        writer
            .write_row(&[CellValue::from("K-1"), CellValue::Int(3), CellValue::from("=B{row}*2")])
            .unwrap();
        writer
            .write_row(&[CellValue::from("K-2"), CellValue::Float(0.5), CellValue::from("=B{row}*2")])
            .unwrap();
        assert!(writer.write_row(&[CellValue::from("K-3")]).is_err());
        assert_eq!(writer.rows_written(), 2);
        assert!(!path.exists());
        writer.finish().unwrap();

        let mut book = open(&path);
        assert_eq!(book.sheet_names(), vec!["Issues".to_string()]);

        let values = book.worksheet_range("Issues").unwrap();
        assert_eq!(values.get_value((0, 0)), Some(&Data::String("Key".into())));
        assert_eq!(values.get_value((1, 0)), Some(&Data::String("K-1".into())));
        assert_eq!(values.get_value((1, 1)), Some(&Data::Float(3.0)));
        assert_eq!(values.get_value((2, 1)), Some(&Data::Float(0.5)));

        let formulas = book.worksheet_formula("Issues").unwrap();
        assert_eq!(formulas.get_value((1, 2)).map(String::as_str), Some("B2*2"));
        assert_eq!(formulas.get_value((2, 2)).map(String::as_str), Some("B3*2"));
    }

    #[test]
    fn test_existing_sheet_is_replaced_and_others_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.xlsx");

        let mut old = Box::new(XlsxWorkbookWriter::new(&path, "Issues", columns()));
        old.write_row(&[CellValue::from("OLD"), CellValue::Int(1), CellValue::from("=B{row}")])
            .unwrap();
        old.finish().unwrap();

        let key = vec![Column { name: "Key".into(), width: 8, formula: false }];
        let mut log = Box::new(XlsxWorkbookWriter::new(&path, "Worklog", key.clone()));
        log.write_row(&[CellValue::from("W-1")]).unwrap();
        log.finish().unwrap();

        let mut issues = Box::new(XlsxWorkbookWriter::new(&path, "Issues", key));
        issues.write_row(&[CellValue::from("NEW")]).unwrap();
        issues.finish().unwrap();

        let mut book = open(&path);
        assert_eq!(book.sheet_names(), vec!["Worklog".to_string(), "Issues".to_string()]);

        let worklog = book.worksheet_range("Worklog").unwrap();
        assert_eq!(worklog.get_value((1, 0)), Some(&Data::String("W-1".into())));

        let issues = book.worksheet_range("Issues").unwrap();
        assert_eq!(issues.get_value((1, 0)), Some(&Data::String("NEW".into())));
        assert_eq!(issues.get_size(), (2, 1));
    }

    #[test]
    fn test_unreadable_file_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.xlsx");
        std::fs::write(&path, "not a workbook").unwrap();

        Box::new(XlsxWorkbookWriter::new(&path, "Sheet1", columns())).finish().unwrap();
        assert_eq!(open(&path).sheet_names(), vec!["Sheet1".to_string()]);
    }
}

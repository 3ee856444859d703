//! End-to-end conversion run.
//!
//! # Example
//!
//! ```rust,ignore
//! use sheetmill::{run, ConvertConfig, LoadOptions};
//!
//! let config = ConvertConfig::from_file("config.json")?;
//! let summary = run(&config, &LoadOptions::default())?;
//! println!("Saved {} of {} records", summary.records_saved, summary.records_read);
//! ```

use serde::Serialize;

use super::engine::RecordTransformer;
use super::plan::ConversionPlan;
use crate::config::{ConvertConfig, LoadOptions};
use crate::error::{OutputError, PipelineError, PipelineResult};
use crate::logs::{log_error, log_info, log_info_indent, log_success, log_warning};
use crate::models::{CellValue, Column, Record};
use crate::output::{data_row_number, open_table, TableSink};
use crate::parser::{read_input, ParseResult};

/// Rows between progress messages.
pub const PROGRESS_INTERVAL: usize = 1000;

/// Rows written to one child table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubTableSummary {
    pub name: String,
    pub output: String,
    pub rows: usize,
}

/// Counters for a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Data rows read from the input
    pub records_read: usize,
    /// Records written to the primary table
    pub records_saved: usize,
    /// Records rejected by the filters
    pub records_filtered: usize,
    /// Records the output sink rejected
    pub records_failed: usize,
    pub sub_tables: Vec<SubTableSummary>,
}

/// Read the configured input, build the plan and convert every row.
pub fn run(config: &ConvertConfig, options: &LoadOptions) -> PipelineResult<RunSummary> {
    let source = if config.input.is_empty() { "<stdin>" } else { config.input.as_str() };
    log_info(format!("Reading {}", source));
    let input = read_input(&config.input, config.delimiter)?;
    log_success(format!("Detected encoding: {}", input.encoding));
    log_success(format!("Detected separator: '{}'", format_delimiter(input.delimiter)));
    log_success(format!("Read {} rows", input.rows.len()));

    let plan = ConversionPlan::build(config, options);
    for field in plan.fields.degraded() {
        log_warning(format!(
            "Field [{}] renders as: {}",
            field.output_name,
            field.diagnostic.as_deref().unwrap_or_default()
        ));
    }

    run_with_input(config, &plan, input)
}

/// Convert already-parsed input with a prepared plan.
pub fn run_with_input(config: &ConvertConfig, plan: &ConversionPlan, input: ParseResult) -> PipelineResult<RunSummary> {
    let mut transformer = RecordTransformer::new(plan, &input.headers);
    if transformer.layout().matched() == 0 {
        return Err(PipelineError::NoMatchedHeader);
    }

    let mut summary = RunSummary::default();
    let mut sink = open_table(&config.output, &config.sheet_name, plan.columns())?;

    for (index, row) in input.rows.iter().enumerate() {
        let items = transformer.transform(row)?;
        summary.records_read += 1;
        if summary.records_read % PROGRESS_INTERVAL == 0 {
            log_info(format!("Processed {} rows", summary.records_read));
        }

        if !plan.filters.accept(&items) {
            summary.records_filtered += 1;
            continue;
        }

        if write_record(sink.as_mut(), &items, index)? {
            summary.records_saved += 1;
        } else {
            summary.records_failed += 1;
        }
    }
    sink.finish()?;

    log_success(format!(
        "Saved {} of {} records to {} [{}]",
        summary.records_saved, summary.records_read, config.output, config.sheet_name
    ));
    if summary.records_filtered > 0 {
        log_info_indent(format!("{} records filtered out", summary.records_filtered), 1);
    }

    for (spec, rows) in transformer.into_child_tables() {
        let written = write_table(&spec.output, &spec.sheet_name, spec.columns(), &rows)?;
        log_success(format!(
            "Saved {} records to {} [{}]",
            written, spec.output, spec.sheet_name
        ));
        summary.sub_tables.push(SubTableSummary {
            name: spec.name.clone(),
            output: spec.output.clone(),
            rows: written,
        });
    }

    Ok(summary)
}

/// Write a whole table, returning how many rows were accepted.
fn write_table(path: &str, sheet_name: &str, columns: Vec<Column>, rows: &[Record]) -> PipelineResult<usize> {
    let mut sink = open_table(path, sheet_name, columns)?;
    for (index, row) in rows.iter().enumerate() {
        write_record(sink.as_mut(), row, index)?;
    }
    let written = sink.rows_written();
    sink.finish()?;
    Ok(written)
}

/// Write one record. A column-count mismatch is logged and reported as `false`.
fn write_record(sink: &mut dyn TableSink, items: &[CellValue], index: usize) -> PipelineResult<bool> {
    match sink.write_row(items) {
        Ok(()) => Ok(true),
        Err(e @ OutputError::ColumnMismatch { .. }) => {
            log_error(format!("Input row {}: {}", data_row_number(index), e));
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

fn format_delimiter(delimiter: char) -> String {
    match delimiter {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

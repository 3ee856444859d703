//! Error types for the Sheetmill conversion pipeline.
//!
//! This module defines one error type per concern:
//!
//! - [`CsvError`] - Reading and decoding delimited input
//! - [`ConfigError`] - Loading and validating the JSON configuration
//! - [`LookupError`] - Loading a lookup table (captured, never fatal)
//! - [`SubRecordError`] - Splitting one repeating-group cell
//! - [`TransformError`] - Structural row/column mismatches
//! - [`OutputError`] - Writing output tables
//! - [`PipelineError`] - Top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// CSV Parsing Errors
// =============================================================================

/// Errors while reading delimited input.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Invalid delimited format.
    #[error("Invalid CSV format: {0}")]
    Parse(#[from] csv::Error),

    /// Delimiters must be single-byte characters.
    #[error("Delimiter must be an ASCII character, got '{0}'")]
    InvalidDelimiter(char),

    /// Empty input.
    #[error("CSV input is empty")]
    EmptyFile,
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while loading the configuration document.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("Failed to read config '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Malformed JSON, or JSON that does not deserialize into a config.
    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The document does not match the config schema.
    #[error("Config does not match schema: {}", .0.join("; "))]
    Schema(Vec<String>),

    /// A required setting is missing or empty.
    #[error("Missing required setting: {0}")]
    MissingSetting(&'static str),
}

// =============================================================================
// Lookup Errors
// =============================================================================

/// Errors while loading a lookup table.
///
/// These are stored on the table and surface as cell text in every field
/// that references the table.
#[derive(Debug, Error)]
pub enum LookupError {
    /// The lookup source could not be read or parsed.
    #[error("lookup source {file} failed: {source}")]
    Source {
        file: String,
        #[source]
        source: CsvError,
    },

    /// The lookup workbook or its worksheet could not be read.
    #[error("lookup workbook {file} failed: {source}")]
    Workbook {
        file: String,
        #[source]
        source: calamine::XlsxError,
    },

    /// A key in a regex-mode table is not a valid pattern.
    #[error("invalid lookup pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

// =============================================================================
// Sub-record Errors
// =============================================================================

/// Errors while splitting a repeating-group cell.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubRecordError {
    #[error("empty record value")]
    EmptyValue,

    #[error("invalid format: expected at least {min} sections, found {found}")]
    InvalidFormat { min: usize, found: usize },

    #[error("unsupported output name: {0}")]
    UnsupportedField(String),
}

// =============================================================================
// Transformation Errors
// =============================================================================

/// Errors while transforming a row. All of them abort the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    /// The row does not reach a column the header promised.
    #[error("field ({field})'s position: {position} is beyond the row size: {len}")]
    RowTooShort {
        field: String,
        position: usize,
        len: usize,
    },

    /// A sub-record field targets a child table that was never declared.
    #[error("cannot find sub-table '{0}' in config")]
    UnknownSubRecord(String),
}

// =============================================================================
// Output Errors
// =============================================================================

/// Errors while writing an output table.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV writer error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Excel writer error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// Row item count differs from the table's column count.
    #[error("number of data items ({actual}) does not equal the number of columns ({expected})")]
    ColumnMismatch { expected: usize, actual: usize },
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the error type returned by [`crate::transform::pipeline::run`].
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    /// No header cell matched any configured field.
    #[error("unable to find matched header fields")]
    NoMatchedHeader,
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for row transformation.
pub type TransformResult<T> = Result<T, TransformError>;

/// Result type for output operations.
pub type OutputResult<T> = Result<T, OutputError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

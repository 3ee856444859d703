//! # Sheetmill - config-driven CSV to spreadsheet table conversion
//!
//! Sheetmill reads delimited exports (issue trackers, reports) and writes
//! spreadsheet-ready tables: renamed and converted columns, lookup
//! enrichment, formula cells, record filters, and child tables built from
//! repeating column groups.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  CSV File   │────▶│   Parser    │────▶│  Transform  │────▶│   Tables    │
//! │  (any enc)  │     │  (auto-enc) │     │ (plan+rows) │     │xlsx/json/csv│
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sheetmill::{run, ConvertConfig, LoadOptions};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConvertConfig::from_file("config.json")?;
//!     let summary = run(&config, &LoadOptions::default())?;
//!     println!("Saved {} records", summary.records_saved);
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`logs`] - Leveled console logging
//! - [`models`] - Cell values and column layouts
//! - [`config`] - JSON configuration
//! - [`validation`] - Config schema validation
//! - [`parser`] - CSV parsing with auto-detection
//! - [`transform`] - Field specs, lookups, filters, child tables and the pipeline
//! - [`output`] - Excel, JSON workbook and CSV writers

// Core modules
pub mod error;
pub mod logs;
pub mod models;

// Configuration
pub mod config;
pub mod validation;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// Output
pub mod output;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError,
    CsvError,
    LookupError,
    OutputError,
    PipelineError,
    PipelineResult,
    SubRecordError,
    TransformError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{CellValue, Column, Record};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::{
    ConvertConfig,
    FilterConfig,
    LoadOptions,
    LookupConfig,
    SubFileConfig,
    CONFIG_ENV,
    DEFAULT_CONFIG_PATH,
};

pub use validation::{is_valid, is_valid_config, validate, validate_config};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    decode_content,
    detect_delimiter,
    detect_encoding,
    parse_bytes,
    parse_file,
    read_input,
    read_sheet,
    ParseResult,
};

// =============================================================================
// Re-exports - Transform
// =============================================================================

pub use transform::{
    converters_description,
    parse_field_specs,
    ConversionPlan,
    Converter,
    ConverterKind,
    FieldSet,
    FieldSpec,
    FilterSet,
    LookupTable,
    MatchMode,
    RecordTransformer,
    SubRecordSpec,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{run, run_with_input, RunSummary, SubTableSummary};

// =============================================================================
// Re-exports - Output
// =============================================================================

pub use output::{open_table, CsvTableWriter, JsonWorkbookWriter, TableSink, XlsxWorkbookWriter};

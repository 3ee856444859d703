//! Transformation module.
//!
//! This module turns input rows into output tables:
//! - Converter: type tags and value conversions
//! - Lookup: key → value-row tables with three match modes
//! - Field: the field spec mini-language
//! - Subrecord: child tables fed by repeating-group columns
//! - Filter: record emission gates
//! - Plan: everything above, built once from a config
//! - Engine: header resolution and per-row conversion
//! - Pipeline: the end-to-end run

pub mod converter;
pub mod engine;
pub mod field;
pub mod filter;
pub mod lookup;
pub mod pipeline;
pub mod plan;
pub mod subrecord;

pub use converter::{converters_description, Converter, ConverterKind, LookupRef, CONVERTER_ERROR};
pub use engine::{HeaderLayout, InputBinding, RecordTransformer};
pub use field::{parse_field_spec, parse_field_specs, FieldSet, FieldSpec, DEFAULT_WIDTH};
pub use filter::{FilterSet, RecordFilter};
pub use lookup::{LookupTable, MatchMode};
pub use pipeline::{run, run_with_input, RunSummary, SubTableSummary};
pub use plan::ConversionPlan;
pub use subrecord::{parser_for, split, JiraWorklogParser, SubRecordParser, SubRecordSpec};

//! Record filters.
//!
//! A record is emitted when any filter matches (OR across filters). With no
//! filters every record is emitted.

use std::collections::HashSet;

use super::field::FieldSet;
use crate::config::FilterConfig;
use crate::logs::{log_detail, log_error};
use crate::models::CellValue;

/// One filter resolved against the field layout
#[derive(Debug, Clone)]
pub struct RecordFilter {
    /// Output name of the filtered column
    pub field: String,
    /// Position in the item list; `None` if the field is unknown or emits nothing
    pub position: Option<usize>,
    pub allowed: HashSet<String>,
}

impl RecordFilter {
    pub fn resolve(config: &FilterConfig, fields: &FieldSet) -> Self {
        let position = fields.output_position(&config.field);
        match position {
            Some(pos) => log_detail(format!(
                "Filter on [{}] at position {} allows {:?}",
                config.field, pos, config.values
            )),
            None => log_error(format!(
                "Filter field [{}] is not an output column, the filter is ignored",
                config.field
            )),
        }
        Self {
            field: config.field.clone(),
            position,
            allowed: config.values.iter().cloned().collect(),
        }
    }

    /// Whether the item at this filter's position is an allowed value.
    ///
    /// Position 0 never matches.
    pub fn matches(&self, items: &[CellValue]) -> bool {
        match self.position {
            Some(pos) if pos > 0 && pos < items.len() => self.allowed.contains(&items[pos].to_string()),
            _ => false,
        }
    }
}

/// Every configured filter, evaluated with OR semantics
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    filters: Vec<RecordFilter>,
}

impl FilterSet {
    pub fn resolve(configs: &[FilterConfig], fields: &FieldSet) -> Self {
        Self {
            filters: configs.iter().map(|c| RecordFilter::resolve(c, fields)).collect(),
        }
    }

    pub fn filters(&self) -> &[RecordFilter] {
        &self.filters
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Accept a converted record.
    pub fn accept(&self, items: &[CellValue]) -> bool {
        self.filters.is_empty() || self.filters.iter().any(|f| f.matches(items))
    }
}

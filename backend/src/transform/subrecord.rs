//! Sub-records: child tables fed by repeating-group columns.
//!
//! When a header names the same column several times, each occurrence in a
//! row becomes one child row. A child field whose input name is `value`
//! receives the cell content, optionally split by a parser registered for
//! the child table's name.

use std::collections::HashMap;
use std::rc::Rc;

use super::field::{parse_field_specs, FieldSet};
use super::lookup::LookupTable;
use crate::config::SubFileConfig;
use crate::error::SubRecordError;
use crate::models::Column;

/// Input name of child fields that receive the repeating-group cell.
pub const VALUE_FIELD: &str = "value";

/// Splits one repeating-group cell into named parts
pub trait SubRecordParser: Sync {
    /// Child table name this parser serves.
    fn name(&self) -> &'static str;

    /// Extract the part of `content` that feeds the child column `field`.
    fn split(&self, content: &str, field: &str) -> Result<String, SubRecordError>;
}

/// Jira "Log Work" cells: `comment;date;user;seconds`.
///
/// The comment may itself contain semicolons, so parts are taken from the end.
#[derive(Debug, Clone, Copy, Default)]
pub struct JiraWorklogParser;

impl JiraWorklogParser {
    const MIN_SECTIONS: usize = 4;
}

impl SubRecordParser for JiraWorklogParser {
    fn name(&self) -> &'static str {
        "JiraLogTime"
    }

    fn split(&self, content: &str, field: &str) -> Result<String, SubRecordError> {
        let sections: Vec<&str> = content.split(';').collect();
        let n = sections.len();
        if n < Self::MIN_SECTIONS {
            return Err(SubRecordError::InvalidFormat { min: Self::MIN_SECTIONS, found: n });
        }

        let part = match field {
            "Hours" => sections[n - 1],
            "Reporter" => sections[n - 2],
            "Date" => sections[n - 3],
            other => return Err(SubRecordError::UnsupportedField(other.to_string())),
        };
        Ok(part.to_string())
    }
}

static PARSERS: &[&dyn SubRecordParser] = &[&JiraWorklogParser];

/// The parser registered for a child table, if any.
pub fn parser_for(group: &str) -> Option<&'static dyn SubRecordParser> {
    PARSERS.iter().copied().find(|p| p.name() == group)
}

/// Extract the part of a repeating-group cell for one child column.
///
/// Empty cells are always an error. Groups without a registered parser get
/// the content unchanged.
pub fn split(group: &str, content: &str, field: &str) -> Result<String, SubRecordError> {
    if content.is_empty() {
        return Err(SubRecordError::EmptyValue);
    }
    match parser_for(group) {
        Some(parser) => parser.split(content, field),
        None => Ok(content.to_string()),
    }
}

/// A declared child table
#[derive(Debug, Clone)]
pub struct SubRecordSpec {
    pub name: String,
    pub sheet_name: String,
    pub output: String,
    /// Positional: child field `i` reads raw value `i` of a child row
    pub fields: FieldSet,
}

impl SubRecordSpec {
    pub fn from_config(config: &SubFileConfig, lookups: &HashMap<String, Rc<LookupTable>>) -> Self {
        Self {
            name: config.name.clone(),
            sheet_name: config.sheet_name.clone(),
            output: config.output.clone(),
            fields: parse_field_specs(&config.fields, lookups),
        }
    }

    pub fn columns(&self) -> Vec<Column> {
        self.fields.columns()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORKLOG: &str = ";05/Jan/21 8:45 AM;uid:1291231203;14400";

    #[test]
    fn test_jira_worklog_fields() {
        assert_eq!(split("JiraLogTime", WORKLOG, "Hours").unwrap(), "14400");
        assert_eq!(split("JiraLogTime", WORKLOG, "Reporter").unwrap(), "uid:1291231203");
        assert_eq!(split("JiraLogTime", WORKLOG, "Date").unwrap(), "05/Jan/21 8:45 AM");
    }

    #[test]
    fn test_jira_worklog_comment_with_semicolons() {
        let content = "dasdfa;sfasdf ;05/Jan/21 8:45 AM;uid:1291231203;14400";
        assert_eq!(split("JiraLogTime", content, "Date").unwrap(), "05/Jan/21 8:45 AM");
    }

    #[test]
    fn test_jira_worklog_too_few_sections() {
        let err = split("JiraLogTime", "uid:1291231203;14400", "Date").unwrap_err();
        assert_eq!(err, SubRecordError::InvalidFormat { min: 4, found: 2 });
        assert!(err.to_string().contains("invalid format"));
    }

    #[test]
    fn test_jira_worklog_unsupported_field() {
        let err = split("JiraLogTime", WORKLOG, "Content").unwrap_err();
        assert_eq!(err, SubRecordError::UnsupportedField("Content".into()));
    }

    #[test]
    fn test_unknown_group_passes_through() {
        assert_eq!(split("value", ";1214400", "Test").unwrap(), ";1214400");
    }

    #[test]
    fn test_empty_cell_is_error_for_every_group() {
        assert_eq!(split("JiraLogTime", "", "Hours"), Err(SubRecordError::EmptyValue));
        assert_eq!(split("Comments", "", "Body"), Err(SubRecordError::EmptyValue));
    }

    #[test]
    fn test_parser_registry() {
        assert!(parser_for("JiraLogTime").is_some());
        assert!(parser_for("jiralogtime").is_none());
    }

    #[test]
    fn test_spec_from_config() {
        let config = SubFileConfig {
            name: "JiraLogTime".into(),
            sheet_name: "Worklog".into(),
            output: "log.csv".into(),
            fields: vec!["Issue key,Key".into(), "value,Hours,10,int".into(), "value,,5".into()],
        };
        let spec = SubRecordSpec::from_config(&config, &HashMap::new());
        assert_eq!(spec.fields.len(), 3);
        let names: Vec<String> = spec.columns().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Key", "Hours"]);
    }
}

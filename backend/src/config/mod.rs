//! Conversion configuration.
//!
//! The configuration is a JSON document describing the input, the primary
//! output table, child tables, lookup tables and filters. Field specs stay
//! as raw text here; [`crate::transform::field`] interprets them.
//!
//! ```json
//! {
//!   "input": "issues.csv",
//!   "output": "issues.json",
//!   "sheetName": "Issues",
//!   "fields": [
//!     "Issue key,Key,12",
//!     "Time Spent,Spent,14,sec2day",
//!     "Status,Category,20,lookup,Status,StatusMap,2"
//!   ],
//!   "subfiles": [
//!     { "name": "JiraLogTime", "sheetName": "Worklog", "output": "issues.json",
//!       "fields": ["Issue key,Key", "value,Date", "value,Reporter", "value,Hours,10,int"] }
//!   ],
//!   "lookups": [
//!     { "name": "StatusMap", "fileName": "status.csv", "option": "substring", "default": "Other" }
//!   ],
//!   "filters": [ { "field": "Category", "values": ["Bug", "Incident"] } ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::error::{ConfigError, ConfigResult};
use crate::validation::validate_config;

/// Environment variable consulted for the config path.
pub const CONFIG_ENV: &str = "SHEETMILL_CONFIG";

/// Config path used when neither flag nor environment provides one.
pub const DEFAULT_CONFIG_PATH: &str = "./config.json";

/// Default sheet name for tables that do not set one.
pub const DEFAULT_SHEET_NAME: &str = "Sheet1";

fn default_sheet_name() -> String {
    DEFAULT_SHEET_NAME.to_string()
}

/// The complete conversion configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertConfig {
    /// Input file; empty reads standard input
    #[serde(default)]
    pub input: String,

    /// Primary output file
    pub output: String,

    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,

    /// Input delimiter; auto-detected when absent
    #[serde(default)]
    pub delimiter: Option<char>,

    /// Field spec lines for the primary table
    #[serde(default)]
    pub fields: Vec<String>,

    #[serde(default, alias = "subfile")]
    pub subfiles: Vec<SubFileConfig>,

    #[serde(default, alias = "lookup")]
    pub lookups: Vec<LookupConfig>,

    #[serde(default, alias = "filter")]
    pub filters: Vec<FilterConfig>,
}

/// A child table fed by repeating-group columns
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubFileConfig {
    pub name: String,
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,
    pub output: String,
    #[serde(default)]
    pub fields: Vec<String>,
}

/// A lookup table loaded from a delimited file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupConfig {
    pub name: String,
    pub file_name: String,
    /// Kept for reference; delimited sources have a single sheet
    #[serde(default)]
    pub sheet_name: String,
    /// Converter tag applied to resolved values
    #[serde(default, rename = "type")]
    pub value_type: String,
    /// Match mode: default/exact, substring or regexp
    #[serde(default)]
    pub option: String,
    /// Value used when a lookup resolves to nothing
    #[serde(default)]
    pub default: String,
}

/// Emit only records whose `field` column holds one of `values`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    pub field: String,
    #[serde(default)]
    pub values: Vec<String>,
}

/// Settings that come from the command line rather than the config file
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// Warn when an exact-match lookup source repeats a key
    pub warn_duplicates: bool,
}

impl ConvertConfig {
    /// Parse and validate a config from a JSON string
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Validate a JSON value against the config schema, then deserialize it
    pub fn from_value(value: Value) -> ConfigResult<Self> {
        validate_config(&value).map_err(ConfigError::Schema)?;
        let config: Self = serde_json::from_value(value)?;
        if config.output.trim().is_empty() {
            return Err(ConfigError::MissingSetting("output"));
        }
        Ok(config)
    }

    /// Load a config file
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Serialize to a pretty JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_defaults() {
        let config = ConvertConfig::from_json(r#"{ "output": "out.csv", "fields": ["Key,Key"] }"#).unwrap();
        assert_eq!(config.input, "");
        assert_eq!(config.sheet_name, DEFAULT_SHEET_NAME);
        assert!(config.delimiter.is_none());
        assert!(config.subfiles.is_empty());
        assert!(config.lookups.is_empty());
        assert!(config.filters.is_empty());
    }

    #[test]
    fn test_singular_aliases() {
        let config = ConvertConfig::from_json(
            r#"{
                "output": "out.csv",
                "sheetName": "Issues",
                "delimiter": ";",
                "fields": [],
                "subfile": [{ "name": "JiraLogTime", "output": "log.csv", "fields": ["value,Hours"] }],
                "lookup": [{ "name": "StatusMap", "fileName": "map.csv", "type": "time2date", "option": "regexp", "default": "n/a" }],
                "filter": [{ "field": "Status", "values": ["Open"] }]
            }"#,
        )
        .unwrap();

        assert_eq!(config.sheet_name, "Issues");
        assert_eq!(config.delimiter, Some(';'));
        assert_eq!(config.subfiles[0].name, "JiraLogTime");
        assert_eq!(config.subfiles[0].sheet_name, DEFAULT_SHEET_NAME);
        assert_eq!(config.lookups[0].value_type, "time2date");
        assert_eq!(config.lookups[0].option, "regexp");
        assert_eq!(config.lookups[0].default, "n/a");
        assert_eq!(config.filters[0].values, vec!["Open"]);
    }

    #[test]
    fn test_schema_violation() {
        let err = ConvertConfig::from_json(r#"{ "fields": ["Key,Key"] }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Schema(_)));
    }

    #[test]
    fn test_blank_output_rejected() {
        let err = ConvertConfig::from_json(r#"{ "output": "  ", "fields": [] }"#).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSetting("output")));
    }

    #[test]
    fn test_invalid_json() {
        let err = ConvertConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "output": "out.csv", "fields": ["Key,Key,12"] }"#).unwrap();

        let config = ConvertConfig::from_file(&path).unwrap();
        assert_eq!(config.fields, vec!["Key,Key,12"]);
    }
}

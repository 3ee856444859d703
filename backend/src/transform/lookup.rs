//! Lookup tables for cross-table enrichment.
//!
//! A table is loaded once from a delimited file, or from a named worksheet
//! of an `.xlsx` workbook. The first row is a header; in the rest the first
//! column is the key and the remaining columns form the value row. Three
//! match modes:
//!
//! | Mode | Match | Duplicates |
//! |------|-------|------------|
//! | Exact | key equals input | last row wins |
//! | Substring | key is contained in input, ignoring case | first row wins |
//! | Regex | pattern matches anywhere in input | first row wins |
//!
//! Load failures are captured on the table instead of aborting; fields that
//! reference a failed table render the error text.

use regex::Regex;
use std::collections::HashMap;
use std::fmt;

use super::converter::ConverterKind;
use crate::config::{LoadOptions, LookupConfig};
use crate::error::LookupError;
use crate::logs::{log_detail, log_error, log_warning};
use crate::parser::{is_workbook_path, parse_file, read_sheet};

/// How input values are matched against table keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    #[default]
    Exact,
    Substring,
    Regex,
}

impl MatchMode {
    /// Parse a config option; unknown options are `Exact`.
    pub fn from_option(option: &str) -> Self {
        match option.trim().to_lowercase().as_str() {
            "substring" => MatchMode::Substring,
            "regexp" | "regex" => MatchMode::Regex,
            _ => MatchMode::Exact,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MatchMode::Exact => "Exact",
            MatchMode::Substring => "Substring",
            MatchMode::Regex => "Regex",
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of an ordered (substring or regex) table
#[derive(Debug)]
struct OrderedEntry {
    /// Lower-cased for substring tables
    key: String,
    pattern: Option<Regex>,
    values: Vec<String>,
}

#[derive(Debug)]
enum Entries {
    Exact(HashMap<String, Vec<String>>),
    Ordered(Vec<OrderedEntry>),
}

impl Entries {
    fn empty(mode: MatchMode) -> Self {
        match mode {
            MatchMode::Exact => Entries::Exact(HashMap::new()),
            MatchMode::Substring | MatchMode::Regex => Entries::Ordered(Vec::new()),
        }
    }
}

/// A named key → value-row mapping
#[derive(Debug)]
pub struct LookupTable {
    pub name: String,
    pub source_file: String,
    pub source_sheet: String,
    pub mode: MatchMode,
    /// Used when a lookup resolves to an empty value
    pub default_value: String,
    /// Scalar converter applied to resolved values
    pub value_kind: ConverterKind,
    entries: Entries,
    load_error: Option<LookupError>,
}

impl LookupTable {
    /// Create an empty table.
    pub fn new(name: impl Into<String>, mode: MatchMode) -> Self {
        Self {
            name: name.into(),
            source_file: String::new(),
            source_sheet: String::new(),
            mode,
            default_value: String::new(),
            value_kind: ConverterKind::Default,
            entries: Entries::empty(mode),
            load_error: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default_value = default.into();
        self
    }

    /// Set the converter for resolved values; only scalar kinds are kept.
    pub fn with_value_kind(mut self, kind: ConverterKind) -> Self {
        if kind.is_scalar() {
            self.value_kind = kind;
        } else {
            log_warning(format!(
                "Lookup[{}] type '{}' cannot convert lookup values, using default",
                self.name, kind
            ));
            self.value_kind = ConverterKind::Default;
        }
        self
    }

    pub fn with_source(mut self, file: impl Into<String>, sheet: impl Into<String>) -> Self {
        self.source_file = file.into();
        self.source_sheet = sheet.into();
        self
    }

    /// Mark the table as failed; it keeps no entries.
    pub fn with_error(mut self, error: LookupError) -> Self {
        self.entries = Entries::empty(self.mode);
        self.load_error = Some(error);
        self
    }

    /// Load a table described by the config. Never fails; see [`Self::load_error`].
    pub fn load(config: &LookupConfig, options: &LoadOptions) -> Self {
        let mode = MatchMode::from_option(&config.option);
        let mut table = Self::new(config.name.as_str(), mode)
            .with_default(config.default.as_str())
            .with_value_kind(ConverterKind::from_tag(&config.value_type))
            .with_source(config.file_name.as_str(), config.sheet_name.as_str());

        log_detail(format!(
            "Lookup[{}] with option {} from file: {}, sheet: {}",
            table.name, table.mode, table.source_file, table.source_sheet
        ));

        let rows = match read_rows(config) {
            Ok(rows) => rows,
            Err(error) => {
                log_error(format!("Lookup[{}] load failed: {}", table.name, error));
                return table.with_error(error);
            }
        };

        match table.load_rows(rows, options.warn_duplicates) {
            Ok(()) => {
                log_detail(format!("Lookup[{}] loaded {} entries", table.name, table.len()));
                table
            }
            Err(error) => {
                log_error(format!("Lookup[{}] load failed: {}", table.name, error));
                table.with_error(error)
            }
        }
    }

    /// Add data rows (header already removed). Rows with fewer than two
    /// cells are ignored.
    pub fn load_rows<I>(&mut self, rows: I, warn_duplicates: bool) -> Result<(), LookupError>
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        for mut row in rows {
            if row.len() < 2 {
                continue;
            }
            let values = row.split_off(1);
            let key = row.swap_remove(0);

            match &mut self.entries {
                Entries::Exact(map) => {
                    if warn_duplicates {
                        if let Some(existing) = map.get(&key) {
                            log_warning(format!(
                                "lookup file ({}) has duplicated key {} with value {:?}, overridden by {:?}",
                                self.source_file, key, existing, values
                            ));
                        }
                    }
                    map.insert(key, values);
                }
                Entries::Ordered(list) => {
                    let entry = match self.mode {
                        MatchMode::Regex => {
                            let pattern = Regex::new(&key).map_err(|source| LookupError::InvalidPattern {
                                pattern: key.clone(),
                                source,
                            })?;
                            OrderedEntry { key, pattern: Some(pattern), values }
                        }
                        _ => OrderedEntry { key: key.to_lowercase(), pattern: None, values },
                    };
                    list.push(entry);
                }
            }
        }
        Ok(())
    }

    /// The error captured while loading, if any.
    pub fn load_error(&self) -> Option<&LookupError> {
        self.load_error.as_ref()
    }

    pub fn len(&self) -> usize {
        match &self.entries {
            Entries::Exact(map) => map.len(),
            Entries::Ordered(list) => list.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Find the value row for an input using the table's match mode.
    pub fn find(&self, input: &str) -> Option<&[String]> {
        match &self.entries {
            Entries::Exact(map) => map.get(input).map(Vec::as_slice),
            Entries::Ordered(list) => match self.mode {
                MatchMode::Regex => list
                    .iter()
                    .find(|e| e.pattern.as_ref().is_some_and(|re| re.is_match(input)))
                    .map(|e| e.values.as_slice()),
                _ => {
                    let lowered = input.to_lowercase();
                    list.iter()
                        .find(|e| lowered.contains(e.key.as_str()))
                        .map(|e| e.values.as_slice())
                }
            },
        }
    }
}

/// Data rows of a lookup source, header removed.
fn read_rows(config: &LookupConfig) -> Result<Vec<Vec<String>>, LookupError> {
    if is_workbook_path(&config.file_name) {
        let rows = read_sheet(&config.file_name, &config.sheet_name).map_err(|source| LookupError::Workbook {
            file: config.file_name.clone(),
            source,
        })?;
        Ok(rows.into_iter().skip(1).collect())
    } else {
        parse_file(&config.file_name, None)
            .map(|parsed| parsed.rows)
            .map_err(|source| LookupError::Source {
                file: config.file_name.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    fn table(mode: MatchMode, data: &[&[&str]]) -> LookupTable {
        let mut table = LookupTable::new("T", mode);
        table.load_rows(rows(data), false).unwrap();
        table
    }

    #[test]
    fn test_match_mode_options() {
        assert_eq!(MatchMode::from_option("default"), MatchMode::Exact);
        assert_eq!(MatchMode::from_option("Substring"), MatchMode::Substring);
        assert_eq!(MatchMode::from_option("regexp"), MatchMode::Regex);
        assert_eq!(MatchMode::from_option("regex"), MatchMode::Regex);
        assert_eq!(MatchMode::from_option(""), MatchMode::Exact);
        assert_eq!(MatchMode::from_option("fuzzy"), MatchMode::Exact);
    }

    #[test]
    fn test_exact_last_write_wins() {
        let t = table(MatchMode::Exact, &[&["Open", "A"], &["Closed", "B"], &["Open", "C"]]);
        assert_eq!(t.len(), 2);
        assert_eq!(t.find("Open"), Some(&["C".to_string()][..]));
        assert_eq!(t.find("open"), None);
    }

    #[test]
    fn test_substring_first_match_case_insensitive() {
        let t = table(
            MatchMode::Substring,
            &[&["Crash", "Bug"], &["crash report", "Report"], &["Feature", "Story"]],
        );
        assert_eq!(t.find("App CRASH REPORT on start").unwrap()[0], "Bug");
        assert_eq!(t.find("new feature request").unwrap()[0], "Story");
        assert_eq!(t.find("question"), None);
    }

    #[test]
    fn test_regex_first_match_anywhere() {
        let t = table(MatchMode::Regex, &[&[r"^PROJ-\d+$", "Exact"], &[r"\d{3}", "Digits"]]);
        assert_eq!(t.find("PROJ-12").unwrap()[0], "Exact");
        assert_eq!(t.find("build 20456 failed").unwrap()[0], "Digits");
        assert_eq!(t.find("no digits"), None);
    }

    #[test]
    fn test_regex_is_case_sensitive() {
        let t = table(MatchMode::Regex, &[&["crash", "Bug"]]);
        assert_eq!(t.find("CRASH"), None);
    }

    #[test]
    fn test_short_rows_ignored() {
        let t = table(MatchMode::Exact, &[&["lonely"], &[], &["k", "v"]]);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_invalid_pattern_is_error() {
        let mut t = LookupTable::new("T", MatchMode::Regex);
        let err = t.load_rows(rows(&[&["(unclosed", "x"]]), false).unwrap_err();
        assert!(matches!(err, LookupError::InvalidPattern { .. }));
    }

    #[test]
    fn test_non_scalar_value_kind_falls_back() {
        let t = LookupTable::new("T", MatchMode::Exact).with_value_kind(ConverterKind::Lookup);
        assert_eq!(t.value_kind, ConverterKind::Default);
        let t = LookupTable::new("T", MatchMode::Exact).with_value_kind(ConverterKind::Int);
        assert_eq!(t.value_kind, ConverterKind::Int);
    }

    #[test]
    fn test_load_from_file_skips_header() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        write!(file, "Status,Group,Owner\nOpen,Active,Ops\nDone,Closed,QA\n").unwrap();

        let config = LookupConfig {
            name: "StatusMap".into(),
            file_name: file.path().display().to_string(),
            sheet_name: "Sheet1".into(),
            value_type: String::new(),
            option: "default".into(),
            default: "n/a".into(),
        };
        let t = LookupTable::load(&config, &LoadOptions::default());

        assert!(t.load_error().is_none());
        assert_eq!(t.len(), 2);
        assert_eq!(t.find("Status"), None);
        assert_eq!(t.find("Done"), Some(&["Closed".to_string(), "QA".to_string()][..]));
        assert_eq!(t.default_value, "n/a");
    }

    #[test]
    fn test_load_from_workbook_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("maps.xlsx");

        let mut workbook = rust_xlsxwriter::Workbook::new();
        let other = workbook.add_worksheet();
        other.set_name("Other").unwrap();
        other.write_string(1, 0, "Open").unwrap();
        other.write_string(1, 1, "Wrong").unwrap();
        let map = workbook.add_worksheet();
        map.set_name("StatusMap").unwrap();
        map.write_string(0, 0, "Status").unwrap();
        map.write_string(0, 1, "Group").unwrap();
        map.write_string(1, 0, "progress").unwrap();
        map.write_string(1, 1, "Active").unwrap();
        map.write_string(2, 0, "done").unwrap();
        map.write_string(2, 1, "Closed").unwrap();
        workbook.save(&path).unwrap();

        let config = LookupConfig {
            name: "StatusMap".into(),
            file_name: path.display().to_string(),
            sheet_name: "StatusMap".into(),
            value_type: String::new(),
            option: "substring".into(),
            default: String::new(),
        };
        let t = LookupTable::load(&config, &LoadOptions::default());

        assert!(t.load_error().is_none());
        assert_eq!(t.len(), 2);
        assert_eq!(t.find("In Progress"), Some(&["Active".to_string()][..]));
        assert_eq!(t.find("Status"), None);
    }

    #[test]
    fn test_missing_worksheet_is_captured() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("maps.xlsx");
        let mut workbook = rust_xlsxwriter::Workbook::new();
        workbook.add_worksheet();
        workbook.save(&path).unwrap();

        let config = LookupConfig {
            name: "StatusMap".into(),
            file_name: path.display().to_string(),
            sheet_name: "StatusMap".into(),
            value_type: String::new(),
            option: String::new(),
            default: String::new(),
        };
        let t = LookupTable::load(&config, &LoadOptions::default());
        assert!(matches!(t.load_error(), Some(LookupError::Workbook { .. })));
        assert!(t.load_error().unwrap().to_string().contains("maps.xlsx"));
    }

    #[test]
    fn test_load_failure_is_captured() {
        let config = LookupConfig {
            name: "Missing".into(),
            file_name: "/nonexistent/map.csv".into(),
            sheet_name: String::new(),
            value_type: String::new(),
            option: String::new(),
            default: String::new(),
        };
        let t = LookupTable::load(&config, &LoadOptions::default());
        let err = t.load_error().unwrap();
        assert!(err.to_string().contains("/nonexistent/map.csv"));
        assert!(t.is_empty());
    }
}

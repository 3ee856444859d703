//! The immutable conversion plan built once from a configuration.

use std::collections::HashMap;
use std::rc::Rc;

use super::converter::Converter;
use super::field::{parse_field_specs, FieldSet};
use super::filter::FilterSet;
use super::lookup::LookupTable;
use super::subrecord::SubRecordSpec;
use crate::config::{ConvertConfig, LoadOptions};
use crate::logs::{log_info, log_warning};
use crate::models::Column;

/// Everything needed to convert rows: fields, child tables, lookups and filters
#[derive(Debug, Clone, Default)]
pub struct ConversionPlan {
    pub fields: FieldSet,
    pub sub_records: Vec<SubRecordSpec>,
    pub lookups: HashMap<String, Rc<LookupTable>>,
    pub filters: FilterSet,
}

impl ConversionPlan {
    /// Load lookups, then child tables, then primary fields, then filters.
    pub fn build(config: &ConvertConfig, options: &LoadOptions) -> Self {
        let mut lookups = HashMap::new();
        for lookup in &config.lookups {
            let table = LookupTable::load(lookup, options);
            if lookups.insert(lookup.name.clone(), Rc::new(table)).is_some() {
                log_warning(format!("Lookup[{}] declared twice, the last one is used", lookup.name));
            }
        }

        let sub_records: Vec<SubRecordSpec> = config
            .subfiles
            .iter()
            .map(|sub| SubRecordSpec::from_config(sub, &lookups))
            .collect();

        let fields = parse_field_specs(&config.fields, &lookups);
        let filters = FilterSet::resolve(&config.filters, &fields);

        let plan = Self::from_parts(fields, sub_records, lookups, filters);
        plan.warn_unknown_sub_records();
        log_info(format!(
            "Plan ready: {} fields, {} sub-tables, {} lookups, {} filters",
            plan.fields.len(),
            plan.sub_records.len(),
            plan.lookups.len(),
            plan.filters.len()
        ));
        plan
    }

    pub fn from_parts(
        fields: FieldSet,
        sub_records: Vec<SubRecordSpec>,
        lookups: HashMap<String, Rc<LookupTable>>,
        filters: FilterSet,
    ) -> Self {
        Self { fields, sub_records, lookups, filters }
    }

    /// Index of a declared child table.
    pub fn sub_record_index(&self, name: &str) -> Option<usize> {
        self.sub_records.iter().position(|s| s.name == name)
    }

    pub fn sub_record(&self, name: &str) -> Option<&SubRecordSpec> {
        self.sub_records.iter().find(|s| s.name == name)
    }

    /// Column layout of the primary table.
    pub fn columns(&self) -> Vec<Column> {
        self.fields.columns()
    }

    /// Child-table targets that were never declared. Using one fails the run.
    pub fn unknown_sub_records(&self) -> Vec<&str> {
        self.fields
            .fields()
            .iter()
            .filter_map(|f| match &f.converter {
                Converter::SubRecord { table } if self.sub_record_index(table).is_none() => Some(table.as_str()),
                _ => None,
            })
            .collect()
    }

    fn warn_unknown_sub_records(&self) {
        for name in self.unknown_sub_records() {
            log_warning(format!("Sub-table '{}' is referenced but not declared", name));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FilterConfig, LookupConfig, SubFileConfig};
    use std::io::Write;

    fn config(lookup_file: &str) -> ConvertConfig {
        ConvertConfig {
            output: "out.csv".into(),
            sheet_name: "Issues".into(),
            fields: vec![
                "Issue key,Key".into(),
                "Status,Status".into(),
                "Status,Group,20,lookup,Status,StatusMap,2".into(),
                "Log Work,,20,subrecord,JiraLogTime".into(),
                "Comments,,20,subrecord,Comments".into(),
            ],
            subfiles: vec![SubFileConfig {
                name: "JiraLogTime".into(),
                sheet_name: "Worklog".into(),
                output: "log.csv".into(),
                fields: vec!["Issue key,Key".into(), "value,Hours,10,int".into()],
            }],
            lookups: vec![LookupConfig {
                name: "StatusMap".into(),
                file_name: lookup_file.into(),
                sheet_name: String::new(),
                value_type: String::new(),
                option: String::new(),
                default: "Other".into(),
            }],
            filters: vec![FilterConfig { field: "Group".into(), values: vec!["Active".into()] }],
            ..Default::default()
        }
    }

    #[test]
    fn test_build() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        write!(file, "Status,Group\nOpen,Active\n").unwrap();

        let plan = ConversionPlan::build(&config(&file.path().display().to_string()), &LoadOptions::default());

        assert_eq!(plan.fields.len(), 5);
        assert_eq!(plan.fields.degraded().count(), 0);
        assert_eq!(plan.lookups["StatusMap"].len(), 1);
        assert_eq!(plan.sub_record_index("JiraLogTime"), Some(0));
        assert_eq!(plan.sub_record("JiraLogTime").unwrap().sheet_name, "Worklog");
        assert_eq!(plan.filters.filters()[0].position, Some(2));

        let names: Vec<String> = plan.columns().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Key", "Status", "Group"]);
        assert_eq!(plan.unknown_sub_records(), vec!["Comments"]);
    }

    #[test]
    fn test_failed_lookup_degrades_only_its_fields() {
        let plan = ConversionPlan::build(&config("/nonexistent/status.csv"), &LoadOptions::default());

        let degraded: Vec<&str> = plan.fields.degraded().map(|f| f.output_name.as_str()).collect();
        assert_eq!(degraded, vec!["Group"]);
        assert_eq!(plan.columns().len(), 3);
    }
}

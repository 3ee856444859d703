//! JSON Schema validation for configuration documents.
//!
//! The config schema is embedded at compile time from
//! `schemas/sheetmill-config.json` and checked with JSON Schema Draft 7
//! before the document is deserialized, so users get every structural
//! problem at once instead of the first serde error.
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use sheetmill::validation::validate_config;
//!
//! let config = json!({ "output": "report.csv", "fields": ["Key,Key"] });
//! assert!(validate_config(&config).is_ok());
//! ```

use serde_json::Value;

const CONFIG_SCHEMA: &str = include_str!("../../schemas/sheetmill-config.json");

/// Validate a JSON value against a JSON schema.
///
/// # Returns
/// * `Ok(())` if valid
/// * `Err(Vec<String>)` with every violation otherwise
///
/// # Example
/// ```ignore
/// use serde_json::json;
/// use sheetmill::validation::validate;
///
/// let schema = json!({
///     "type": "object",
///     "required": ["name"],
///     "properties": {
///         "name": { "type": "string" }
///     }
/// });
///
/// assert!(validate(&schema, &json!({ "name": "test" })).is_ok());
/// assert!(validate(&schema, &json!({ "age": 42 })).is_err());
/// ```
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft7::new(schema)
        .map_err(|e| vec![format!("invalid schema: {}", e)])?;

    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Quick check, returns just true/false.
pub fn is_valid(schema: &Value, data: &Value) -> bool {
    jsonschema::draft7::is_valid(schema, data)
}

fn config_schema() -> Result<Value, Vec<String>> {
    serde_json::from_str(CONFIG_SCHEMA).map_err(|e| vec![format!("embedded config schema: {}", e)])
}

/// Validate a raw configuration document.
pub fn validate_config(data: &Value) -> Result<(), Vec<String>> {
    validate(&config_schema()?, data)
}

/// Quick check against the config schema.
pub fn is_valid_config(data: &Value) -> bool {
    config_schema().map(|schema| is_valid(&schema, data)).unwrap_or(false)
}

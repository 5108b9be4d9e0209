//! Rule file loading

use crate::ConfigError;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Read a rule file: a JSON object mapping rule names to rule schemas.
///
/// Entries come back in file order. Individual schemas are not checked here;
/// a malformed schema is the engine's business and simply denies.
pub fn load_rule_file(path: impl AsRef<Path>) -> Result<Vec<(String, Value)>, ConfigError> {
    let path = path.as_ref();

    let raw = fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    let parsed: Value = serde_json::from_str(&raw).map_err(|source| ConfigError::RuleFileError {
        path: path.to_path_buf(),
        source,
    })?;

    match parsed {
        Value::Object(rules) => Ok(rules.into_iter().collect()),
        _ => Err(ConfigError::RuleFileShape {
            path: path.to_path_buf(),
        }),
    }
}

//! Generator manifest (`generator.yaml`) parsing

use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::path::Path;

/// File names recognised as a generator manifest, in lookup order
pub const MANIFEST_FILES: &[&str] = &["generator.yaml", "generator.yml"];

/// Parsed generator manifest
///
/// Kept as a loose map so tasks and values can be decoded with field-level errors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata(Map<String, Value>);

impl Metadata {
    /// Parse manifest text; an empty document is an empty manifest
    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        let content_error = |message: String| Error::Content {
            content_type: "yaml",
            path: path.to_path_buf(),
            message,
        };

        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let value: Value = serde_yaml::from_str(text).map_err(|e| content_error(e.to_string()))?;
        match value {
            Value::Null => Ok(Self::default()),
            Value::Object(map) => Ok(Self(map)),
            other => Err(content_error(format!(
                "expected a mapping at the top level, found {}",
                kind(&other)
            ))),
        }
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String field; missing or non-string fields are `None`
    pub fn str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// List of maps under `key`; a missing key is an empty list
    pub fn map_slice(&self, key: &str) -> Result<Vec<Map<String, Value>>> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(index, item)| match item {
                    Value::Object(map) => Ok(map.clone()),
                    other => Err(Error::construction(
                        format!("{}[{}]", key, index),
                        format!("expected a mapping, found {}", kind(other)),
                    )),
                })
                .collect(),
            Some(other) => Err(Error::construction(
                key,
                format!("expected a list, found {}", kind(other)),
            )),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.str("name")
    }

    pub fn description(&self) -> &str {
        self.str("description").unwrap_or_default()
    }

    pub fn version(&self) -> Option<&str> {
        self.str("version")
    }

    /// Engine version requirement, e.g. `>=0.1`
    pub fn requires(&self) -> Option<&str> {
        self.str("requires")
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

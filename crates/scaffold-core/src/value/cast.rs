//! Data types and casting of raw values

use crate::error::{Error, Result};
use crate::template::{parse_bool, split_list};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Declared type of a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataType {
    Bool,
    Int,
    IntSlice,
    #[default]
    String,
    StringSlice,
}

impl DataType {
    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Bool => "bool",
            DataType::Int => "int",
            DataType::IntSlice => "intSlice",
            DataType::String => "string",
            DataType::StringSlice => "stringSlice",
        }
    }

    pub fn is_slice(self) -> bool {
        matches!(self, DataType::IntSlice | DataType::StringSlice)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bool" | "boolean" => Ok(DataType::Bool),
            "int" | "integer" => Ok(DataType::Int),
            "intslice" | "int-slice" | "[]int" => Ok(DataType::IntSlice),
            "string" | "str" => Ok(DataType::String),
            "stringslice" | "string-slice" | "[]string" => Ok(DataType::StringSlice),
            other => Err(format!(
                "unknown data type `{}` (expected bool, int, intSlice, string or stringSlice)",
                other
            )),
        }
    }
}

/// Convert `value` to `data_type`
///
/// Slice types accept a list or a comma-separated string; segments are trimmed.
pub fn cast(value: &Value, data_type: DataType) -> Result<Value> {
    match data_type {
        DataType::Bool => to_bool(value).map(Value::Bool),
        DataType::Int => to_int(value).map(Value::from),
        DataType::String => to_string(value).map(Value::String),
        DataType::IntSlice => to_list(value)?
            .iter()
            .map(|item| to_int(item).map(Value::from))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        DataType::StringSlice => to_list(value)?
            .iter()
            .map(|item| to_string(item).map(Value::String))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
    }
}

fn cast_error(kind: &'static str, value: &Value) -> Error {
    Error::Cast {
        kind,
        value: value.to_string(),
    }
}

fn to_bool(value: &Value) -> Result<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Null => Ok(false),
        Value::Number(n) => Ok(n.as_f64().is_some_and(|f| f != 0.0)),
        Value::String(s) if s.trim().is_empty() => Ok(false),
        Value::String(s) => parse_bool(s).ok_or_else(|| cast_error("bool", value)),
        _ => Err(cast_error("bool", value)),
    }
}

fn to_int(value: &Value) -> Result<i64> {
    match value {
        Value::Null => Ok(0),
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            })
            .ok_or_else(|| cast_error("int", value)),
        Value::String(s) if s.trim().is_empty() => Ok(0),
        Value::String(s) => s.trim().parse().map_err(|_| cast_error("int", value)),
        _ => Err(cast_error("int", value)),
    }
}

fn to_string(value: &Value) -> Result<String> {
    match value {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s.clone()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(cast_error("string", value)),
    }
}

fn to_list(value: &Value) -> Result<Vec<Value>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(items.clone()),
        Value::String(s) => Ok(split_list(s).into_iter().map(Value::String).collect()),
        Value::Bool(_) | Value::Number(_) => Ok(vec![value.clone()]),
        Value::Object(_) => Err(cast_error("slice", value)),
    }
}

//! Structural merge and modification of JSON-shaped values
//!
//! [`modify`] applies one [`Action`] to a subject value, dispatching on the kind
//! of the subject (bool, int, float, string, slice, map). Slices nested anywhere
//! inside a map merge are combined according to a [`MergeConfig`].
//!
//! Neither function mutates its inputs; every result is a fresh value.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::str::FromStr;

/// Operation applied to a subject value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    #[default]
    Append,
    Prepend,
    Replace,
    Delete,
}

impl Action {
    fn as_str(self) -> &'static str {
        match self {
            Action::Append => "append",
            Action::Prepend => "prepend",
            Action::Replace => "replace",
            Action::Delete => "delete",
        }
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "append" => Ok(Action::Append),
            "prepend" => Ok(Action::Prepend),
            "replace" => Ok(Action::Replace),
            "delete" => Ok(Action::Delete),
            other => Err(format!(
                "unknown action `{}` (expected append, prepend, replace or delete)",
                other
            )),
        }
    }
}

/// How two slices combine during a merge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeType {
    /// Always append source items
    #[default]
    Concat,
    /// Append only source items not already present
    Upsert,
    /// Discard the destination slice
    Replace,
}

/// Merge policy for nested slices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MergeConfig {
    #[serde(default, rename = "type")]
    pub merge_type: MergeType,
}

impl MergeConfig {
    pub fn new(merge_type: MergeType) -> Self {
        Self { merge_type }
    }
}

/// Kind of a JSON value as seen by the merge engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Null,
    Bool,
    Int,
    Float,
    String,
    Slice,
    Map,
}

impl Kind {
    fn of(value: &Value) -> Self {
        match value {
            Value::Null => Kind::Null,
            Value::Bool(_) => Kind::Bool,
            Value::Number(n) if n.is_i64() => Kind::Int,
            Value::Number(_) => Kind::Float,
            Value::String(_) => Kind::String,
            Value::Array(_) => Kind::Slice,
            Value::Object(_) => Kind::Map,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Kind::Null => "null",
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Float => "float",
            Kind::String => "string",
            Kind::Slice => "slice",
            Kind::Map => "map",
        }
    }

    fn zero(self) -> Value {
        match self {
            Kind::Null | Kind::Slice | Kind::Map => Value::Null,
            Kind::Bool => Value::Bool(false),
            Kind::Int => Value::from(0),
            Kind::Float => Value::from(0.0),
            Kind::String => Value::String(String::new()),
        }
    }
}

/// Apply `action` with `arg` to `subject`
///
/// - `append`: bool AND, numeric sum, string/slice concatenation, recursive map merge
/// - `prepend`: as append with the operands swapped (for maps the subject wins)
/// - `replace`: returns `arg`
/// - `delete`: returns the zero value of the subject's kind
///
/// A null subject is replaced by `arg`; a null `arg` leaves the subject unchanged.
pub fn modify(subject: &Value, action: Action, arg: &Value, config: &MergeConfig) -> Result<Value> {
    let subject_kind = Kind::of(subject);
    let arg_kind = Kind::of(arg);

    match action {
        Action::Replace => return Ok(arg.clone()),
        Action::Delete => return Ok(subject_kind.zero()),
        Action::Append | Action::Prepend => {}
    }

    if subject_kind == Kind::Null {
        return Ok(arg.clone());
    }
    if arg_kind == Kind::Null {
        return Ok(subject.clone());
    }

    let prepend = action == Action::Prepend;
    let mismatch = || Error::Merge {
        action: action.as_str(),
        subject: subject_kind.name(),
        arg: arg_kind.name(),
    };

    match (subject, arg) {
        (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(*a && *b)),
        (Value::Number(a), Value::Number(b)) => add_numbers(a, b).ok_or_else(mismatch),
        (Value::String(a), Value::String(b)) => Ok(Value::String(if prepend {
            format!("{}{}", b, a)
        } else {
            format!("{}{}", a, b)
        })),
        (Value::Array(a), Value::Array(b)) => Ok(Value::Array(merge_slices(a, b, config, prepend))),
        (Value::Object(a), Value::Object(b)) => Ok(Value::Object(if prepend {
            merge_maps(b, a, config)
        } else {
            merge_maps(a, b, config)
        })),
        _ => Err(mismatch()),
    }
}

/// Recursively merge `src` over `dst`
///
/// Map/map pairs recurse, slice/slice pairs follow `config`, and any other
/// pairing (including a type mismatch) takes `src`.
pub fn merge(dst: &Value, src: &Value, config: &MergeConfig) -> Value {
    match (dst, src) {
        (Value::Object(d), Value::Object(s)) => Value::Object(merge_maps(d, s, config)),
        (Value::Array(d), Value::Array(s)) => Value::Array(merge_slices(d, s, config, false)),
        _ => src.clone(),
    }
}

/// Merge the entries of `src` into a copy of `dst`
pub fn merge_maps(
    dst: &Map<String, Value>,
    src: &Map<String, Value>,
    config: &MergeConfig,
) -> Map<String, Value> {
    let mut result = dst.clone();
    for (key, value) in src {
        let merged = match result.get(key) {
            Some(existing) => merge(existing, value, config),
            None => value.clone(),
        };
        result.insert(key.clone(), merged);
    }
    result
}

fn merge_slices(dst: &[Value], src: &[Value], config: &MergeConfig, prepend: bool) -> Vec<Value> {
    let additions: Vec<Value> = match config.merge_type {
        MergeType::Replace => return src.to_vec(),
        MergeType::Concat => src.to_vec(),
        MergeType::Upsert => {
            let mut added: Vec<Value> = Vec::new();
            for item in src {
                if !dst.contains(item) && !added.contains(item) {
                    added.push(item.clone());
                }
            }
            added
        }
    };

    if prepend {
        additions.into_iter().chain(dst.iter().cloned()).collect()
    } else {
        dst.iter().cloned().chain(additions).collect()
    }
}

fn add_numbers(a: &Number, b: &Number) -> Option<Value> {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        if let Some(sum) = x.checked_add(y) {
            return Some(Value::from(sum));
        }
    }
    let sum = a.as_f64()? + b.as_f64()?;
    Number::from_f64(sum).map(Value::Number)
}

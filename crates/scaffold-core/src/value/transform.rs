//! Named transform rules applied after casting

use crate::error::{Error, Result};
use crate::fs::sandbox;
use heck::{
    ToKebabCase, ToLowerCamelCase, ToShoutySnakeCase, ToSnakeCase, ToTitleCase, ToUpperCamelCase,
};
use serde_json::Value;
use std::path::Path;
use std::str::FromStr;

/// A pure string transformation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    Trim,
    Lower,
    Upper,
    Title,
    Camel,
    Pascal,
    Snake,
    Kebab,
    Constant,
    ExpandPath,
    AbsPath,
    CleanPath,
}

impl Transform {
    pub fn name(self) -> &'static str {
        match self {
            Transform::Trim => "trim",
            Transform::Lower => "lower",
            Transform::Upper => "upper",
            Transform::Title => "title",
            Transform::Camel => "camel",
            Transform::Pascal => "pascal",
            Transform::Snake => "snake",
            Transform::Kebab => "kebab",
            Transform::Constant => "constant",
            Transform::ExpandPath => "expand-path",
            Transform::AbsPath => "abs-path",
            Transform::CleanPath => "clean-path",
        }
    }

    fn apply_str(self, s: &str) -> Result<String> {
        Ok(match self {
            Transform::Trim => s.trim().to_string(),
            Transform::Lower => s.to_lowercase(),
            Transform::Upper => s.to_uppercase(),
            Transform::Title => s.to_title_case(),
            Transform::Camel => s.to_lower_camel_case(),
            Transform::Pascal => s.to_upper_camel_case(),
            Transform::Snake => s.to_snake_case(),
            Transform::Kebab => s.to_kebab_case(),
            Transform::Constant => s.to_shouty_snake_case(),
            Transform::ExpandPath => shellexpand::full(s)
                .map(|expanded| expanded.into_owned())
                .map_err(|e| Error::Transform {
                    rule: self.name(),
                    message: e.to_string(),
                })?,
            Transform::AbsPath => {
                if s.is_empty() {
                    return Ok(String::new());
                }
                sandbox::absolute(Path::new(s))?
                    .to_string_lossy()
                    .into_owned()
            }
            Transform::CleanPath => {
                if s.is_empty() {
                    return Ok(String::new());
                }
                let cleaned = sandbox::normalize(Path::new(s));
                if cleaned.as_os_str().is_empty() {
                    ".".to_string()
                } else {
                    cleaned.to_string_lossy().into_owned()
                }
            }
        })
    }
}

impl FromStr for Transform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trim" => Ok(Transform::Trim),
            "lower" | "lowercase" => Ok(Transform::Lower),
            "upper" | "uppercase" => Ok(Transform::Upper),
            "title" => Ok(Transform::Title),
            "camel" => Ok(Transform::Camel),
            "pascal" => Ok(Transform::Pascal),
            "snake" => Ok(Transform::Snake),
            "kebab" => Ok(Transform::Kebab),
            "constant" | "screaming-snake" => Ok(Transform::Constant),
            "expand-path" | "expand" => Ok(Transform::ExpandPath),
            "abs-path" | "abs" => Ok(Transform::AbsPath),
            "clean-path" | "clean" => Ok(Transform::CleanPath),
            other => Err(format!("unknown transform rule `{}`", other)),
        }
    }
}

/// Parse a comma-separated rule list such as `trim,kebab`
pub fn parse_rules(spec: &str) -> Result<Vec<Transform>, String> {
    spec.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(Transform::from_str)
        .collect()
}

/// Apply `rules` in order to a cast value
///
/// Strings are transformed directly, slices element-wise; other kinds pass through.
pub fn apply(rules: &[Transform], value: Value) -> Result<Value> {
    if rules.is_empty() {
        return Ok(value);
    }
    match value {
        Value::String(s) => apply_all(rules, &s).map(Value::String),
        Value::Array(items) => items
            .into_iter()
            .map(|item| apply(rules, item))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        other => Ok(other),
    }
}

fn apply_all(rules: &[Transform], s: &str) -> Result<String> {
    let mut current = s.to_string();
    for rule in rules {
        current = rule.apply_str(&current)?;
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rules_apply_in_order() {
        let rules = parse_rules("trim, snake, upper").unwrap();
        assert_eq!(
            apply(&rules, json!("  My App  ")).unwrap(),
            json!("MY_APP")
        );
    }

    #[test]
    fn test_slices_transform_element_wise() {
        let rules = parse_rules("kebab").unwrap();
        assert_eq!(
            apply(&rules, json!(["FooBar", "baz qux"])).unwrap(),
            json!(["foo-bar", "baz-qux"])
        );
    }

    #[test]
    fn test_non_strings_pass_through() {
        let rules = parse_rules("upper").unwrap();
        assert_eq!(apply(&rules, json!(5)).unwrap(), json!(5));
        assert_eq!(apply(&rules, json!(true)).unwrap(), json!(true));
    }

    #[test]
    fn test_unknown_rule_is_rejected() {
        let err = parse_rules("trim,shout").unwrap_err();
        assert_eq!(err, "unknown transform rule `shout`");
    }

    #[test]
    fn test_clean_path() {
        let rules = parse_rules("clean-path").unwrap();
        assert_eq!(apply(&rules, json!("a/./b/../c")).unwrap(), json!("a/c"));
        assert_eq!(apply(&rules, json!("a/..")).unwrap(), json!("."));
    }

    #[test]
    fn test_abs_path_is_absolute() {
        let rules = parse_rules("abs-path").unwrap();
        let value = apply(&rules, json!("some/dir")).unwrap();
        assert!(Path::new(value.as_str().unwrap()).is_absolute());
    }

    #[test]
    fn test_transforms_are_idempotent() {
        let rules = parse_rules("trim,snake").unwrap();
        let once = apply(&rules, json!(" Hello World ")).unwrap();
        let twice = apply(&rules, once.clone()).unwrap();
        assert_eq!(once, twice);
    }
}

//! Validation rule expressions
//!
//! Rules are written as a comma-separated list, e.g. `required,min=3,max=20`.
//! Everything after `dive` applies to each element of a slice value.

use regex::Regex;
use serde_json::Value;
use std::path::Path;
use std::sync::LazyLock;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s.]+(\.[^@\s.]+)+$").expect("email pattern is valid")
});

/// A single validation rule
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    Required,
    OmitEmpty,
    Min(f64),
    Max(f64),
    Len(f64),
    Eq(String),
    Ne(String),
    OneOf(Vec<String>),
    Alpha,
    Alphanum,
    Numeric,
    Lowercase,
    Uppercase,
    Email,
    Url,
    StartsWith(String),
    EndsWith(String),
    Contains(String),
    Excludes(String),
    Dir,
    File,
}

impl Rule {
    fn parse(token: &str) -> Result<Self, String> {
        let (name, param) = match token.split_once('=') {
            Some((name, param)) => (name.trim(), Some(param.trim())),
            None => (token.trim(), None),
        };

        let number = |param: Option<&str>| -> Result<f64, String> {
            param
                .and_then(|p| p.parse::<f64>().ok())
                .ok_or_else(|| format!("rule `{}` requires a numeric parameter", name))
        };
        let text = |param: Option<&str>| -> Result<String, String> {
            param
                .map(str::to_string)
                .ok_or_else(|| format!("rule `{}` requires a parameter", name))
        };

        match name {
            "required" => Ok(Rule::Required),
            "omitempty" => Ok(Rule::OmitEmpty),
            "min" | "gte" => number(param).map(Rule::Min),
            "max" | "lte" => number(param).map(Rule::Max),
            "len" => number(param).map(Rule::Len),
            "eq" => text(param).map(Rule::Eq),
            "ne" => text(param).map(Rule::Ne),
            "oneof" => {
                let choices = split_choices(&text(param)?);
                if choices.is_empty() {
                    return Err("rule `oneof` requires at least one choice".to_string());
                }
                Ok(Rule::OneOf(choices))
            }
            "alpha" => Ok(Rule::Alpha),
            "alphanum" => Ok(Rule::Alphanum),
            "numeric" => Ok(Rule::Numeric),
            "lowercase" => Ok(Rule::Lowercase),
            "uppercase" => Ok(Rule::Uppercase),
            "email" => Ok(Rule::Email),
            "url" => Ok(Rule::Url),
            "startswith" => text(param).map(Rule::StartsWith),
            "endswith" => text(param).map(Rule::EndsWith),
            "contains" => text(param).map(Rule::Contains),
            "excludes" => text(param).map(Rule::Excludes),
            "dir" => Ok(Rule::Dir),
            "file" => Ok(Rule::File),
            other => Err(format!("unknown validation rule `{}`", other)),
        }
    }

    fn check(&self, value: &Value) -> Result<(), String> {
        let text = display(value);
        let ok = match self {
            Rule::OmitEmpty => true,
            Rule::Required => !is_zero(value),
            Rule::Min(n) => return compare(value, |size| size >= *n, "at least", *n),
            Rule::Max(n) => return compare(value, |size| size <= *n, "at most", *n),
            Rule::Len(n) => return compare(value, |size| size == *n, "exactly", *n),
            Rule::Eq(expected) => text == *expected,
            Rule::Ne(unexpected) => text != *unexpected,
            Rule::OneOf(choices) => choices.contains(&text),
            Rule::Alpha => !text.is_empty() && text.chars().all(|c| c.is_ascii_alphabetic()),
            Rule::Alphanum => !text.is_empty() && text.chars().all(|c| c.is_ascii_alphanumeric()),
            Rule::Numeric => text.trim().parse::<f64>().is_ok(),
            Rule::Lowercase => !text.is_empty() && text == text.to_lowercase(),
            Rule::Uppercase => !text.is_empty() && text == text.to_uppercase(),
            Rule::Email => EMAIL.is_match(&text),
            Rule::Url => url::Url::parse(&text).is_ok(),
            Rule::StartsWith(prefix) => text.starts_with(prefix.as_str()),
            Rule::EndsWith(suffix) => text.ends_with(suffix.as_str()),
            Rule::Contains(needle) => text.contains(needle.as_str()),
            Rule::Excludes(needle) => !text.contains(needle.as_str()),
            Rule::Dir => Path::new(&text).is_dir(),
            Rule::File => Path::new(&text).is_file(),
        };

        if ok {
            Ok(())
        } else {
            Err(self.failure())
        }
    }

    fn failure(&self) -> String {
        match self {
            Rule::Required => "is required".to_string(),
            Rule::Eq(expected) => format!("must equal `{}`", expected),
            Rule::Ne(unexpected) => format!("must not equal `{}`", unexpected),
            Rule::OneOf(choices) => format!("must be one of [{}]", choices.join(", ")),
            Rule::Alpha => "must contain only letters".to_string(),
            Rule::Alphanum => "must contain only letters and digits".to_string(),
            Rule::Numeric => "must be numeric".to_string(),
            Rule::Lowercase => "must be lowercase".to_string(),
            Rule::Uppercase => "must be uppercase".to_string(),
            Rule::Email => "must be an email address".to_string(),
            Rule::Url => "must be a URL".to_string(),
            Rule::StartsWith(prefix) => format!("must start with `{}`", prefix),
            Rule::EndsWith(suffix) => format!("must end with `{}`", suffix),
            Rule::Contains(needle) => format!("must contain `{}`", needle),
            Rule::Excludes(needle) => format!("must not contain `{}`", needle),
            Rule::Dir => "must be an existing directory".to_string(),
            Rule::File => "must be an existing file".to_string(),
            Rule::OmitEmpty | Rule::Min(_) | Rule::Max(_) | Rule::Len(_) => "is invalid".to_string(),
        }
    }
}

/// A parsed validation expression
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rules {
    outer: Vec<Rule>,
    inner: Option<Vec<Rule>>,
}

impl Rules {
    /// Parse a rule expression; unknown rules and bad parameters are errors
    pub fn parse(expr: &str) -> Result<Self, String> {
        let mut rules = Rules::default();
        for token in expr.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            if token == "dive" {
                if rules.inner.is_some() {
                    return Err("rule `dive` may only appear once".to_string());
                }
                rules.inner = Some(Vec::new());
                continue;
            }
            let rule = Rule::parse(token)?;
            match rules.inner.as_mut() {
                Some(inner) => inner.push(rule),
                None => rules.outer.push(rule),
            }
        }
        Ok(rules)
    }

    /// Append an implicit membership rule for a closed option set
    ///
    /// For slice values the rule applies to every element.
    pub fn with_options(mut self, options: &[String], per_element: bool) -> Self {
        if options.is_empty() {
            return self;
        }
        let rule = Rule::OneOf(options.to_vec());
        if per_element {
            self.inner.get_or_insert_with(Vec::new).push(rule);
        } else {
            self.outer.push(rule);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.outer.is_empty() && self.inner.as_ref().is_none_or(Vec::is_empty)
    }

    /// Check `value`, returning the first failure message
    pub fn check(&self, value: &Value) -> Result<(), String> {
        check_all(&self.outer, value)?;
        if let (Some(inner), Value::Array(items)) = (&self.inner, value) {
            for (index, item) in items.iter().enumerate() {
                check_all(inner, item).map_err(|message| format!("item {}: {}", index, message))?;
            }
        }
        Ok(())
    }
}

fn check_all(rules: &[Rule], value: &Value) -> Result<(), String> {
    for rule in rules {
        if *rule == Rule::OmitEmpty {
            if is_zero(value) {
                return Ok(());
            }
            continue;
        }
        rule.check(value)?;
    }
    Ok(())
}

fn compare(value: &Value, accept: impl Fn(f64) -> bool, bound: &str, n: f64) -> Result<(), String> {
    let (size, unit) = match value {
        Value::String(s) => (s.chars().count() as f64, " characters"),
        Value::Array(items) => (items.len() as f64, " items"),
        Value::Number(num) => (num.as_f64().unwrap_or_default(), ""),
        Value::Null => (0.0, ""),
        Value::Bool(_) | Value::Object(_) => {
            return Err("cannot be measured".to_string());
        }
    };
    if accept(size) {
        Ok(())
    } else {
        Err(format!("must be {} {}{}", bound, n, unit))
    }
}

/// Whether a value is its type's zero value
fn is_zero(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Split `oneof` choices on whitespace, honouring single quotes
fn split_choices(param: &str) -> Vec<String> {
    let mut choices = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut pending = false;

    for c in param.chars() {
        match c {
            '\'' => {
                quoted = !quoted;
                pending = true;
            }
            c if c.is_whitespace() && !quoted => {
                if pending {
                    choices.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            c => {
                current.push(c);
                pending = true;
            }
        }
    }
    if pending {
        choices.push(current);
    }
    choices
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_required() {
        let rules = Rules::parse("required").unwrap();
        assert!(rules.check(&json!("x")).is_ok());
        assert_eq!(rules.check(&json!("")).unwrap_err(), "is required");
        assert!(rules.check(&json!([])).is_err());
    }

    #[test]
    fn test_min_max_on_strings_slices_and_numbers() {
        let rules = Rules::parse("min=2,max=3").unwrap();
        assert!(rules.check(&json!("ab")).is_ok());
        assert_eq!(rules.check(&json!("a")).unwrap_err(), "must be at least 2 characters");
        assert_eq!(rules.check(&json!([1, 2, 3, 4])).unwrap_err(), "must be at most 3 items");
        assert!(rules.check(&json!(3)).is_ok());
        assert!(rules.check(&json!(10)).is_err());
    }

    #[test]
    fn test_omitempty_skips_remaining_rules() {
        let rules = Rules::parse("omitempty,email").unwrap();
        assert!(rules.check(&json!("")).is_ok());
        assert!(rules.check(&json!("dev@example.com")).is_ok());
        assert!(rules.check(&json!("not-an-email")).is_err());
    }

    #[test]
    fn test_oneof_with_quoted_choices() {
        let rules = Rules::parse("oneof=red 'light blue' green").unwrap();
        assert!(rules.check(&json!("light blue")).is_ok());
        assert_eq!(
            rules.check(&json!("blue")).unwrap_err(),
            "must be one of [red, light blue, green]"
        );
    }

    #[test]
    fn test_dive_applies_to_elements() {
        let rules = Rules::parse("min=1,dive,alpha").unwrap();
        assert!(rules.check(&json!(["abc", "def"])).is_ok());
        assert_eq!(
            rules.check(&json!(["abc", "d3f"])).unwrap_err(),
            "item 1: must contain only letters"
        );
        assert!(rules.check(&json!([])).is_err());
    }

    #[test]
    fn test_options_become_membership_rules() {
        let options = vec!["rust".to_string(), "go".to_string()];

        let scalar = Rules::default().with_options(&options, false);
        assert!(scalar.check(&json!("rust")).is_ok());
        assert!(scalar.check(&json!("java")).is_err());

        let slice = Rules::parse("min=1").unwrap().with_options(&options, true);
        assert!(slice.check(&json!(["go", "rust"])).is_ok());
        assert_eq!(
            slice.check(&json!(["go", "java"])).unwrap_err(),
            "item 1: must be one of [rust, go]"
        );
    }

    #[test]
    fn test_int_values_compare_by_text_for_oneof() {
        let options = vec!["1".to_string(), "2".to_string()];
        let rules = Rules::default().with_options(&options, false);
        assert!(rules.check(&json!(2)).is_ok());
        assert!(rules.check(&json!(3)).is_err());
    }

    #[test]
    fn test_invalid_syntax_is_rejected() {
        assert_eq!(
            Rules::parse("required,shiny").unwrap_err(),
            "unknown validation rule `shiny`"
        );
        assert!(Rules::parse("min=abc").is_err());
        assert!(Rules::parse("dive,dive").is_err());
        assert!(Rules::parse("startswith").is_err());
    }

    #[test]
    fn test_url_rule() {
        let rules = Rules::parse("url").unwrap();
        assert!(rules.check(&json!("https://example.com/a")).is_ok());
        assert!(rules.check(&json!("example")).is_err());
    }
}

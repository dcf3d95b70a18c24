//! Interactive input capability used by values and tasks

use crate::error::Result;
use serde_json::Value;

/// Callback checking a candidate answer before it is accepted
pub type Validator<'a> = &'a dyn Fn(&Value) -> std::result::Result<(), String>;

/// Source of answers for interactive questions
///
/// Implementations must return the answer or an error; a cancelled prompt is an error.
pub trait Prompter {
    fn confirm(&self, prompt: &str, default: bool, help: &str) -> Result<bool>;

    fn input(&self, prompt: &str, default: &str, help: &str, validate: Validator<'_>)
        -> Result<String>;

    fn select(
        &self,
        prompt: &str,
        options: &[String],
        default: Option<&str>,
        help: &str,
        validate: Validator<'_>,
    ) -> Result<String>;

    fn multi_select(
        &self,
        prompt: &str,
        options: &[String],
        defaults: &[String],
        help: &str,
        validate: Validator<'_>,
    ) -> Result<Vec<String>>;
}

/// Answers every question with its default, for non-interactive runs
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultsPrompter;

impl Prompter for DefaultsPrompter {
    fn confirm(&self, _prompt: &str, default: bool, _help: &str) -> Result<bool> {
        Ok(default)
    }

    fn input(&self, _prompt: &str, default: &str, _help: &str, _validate: Validator<'_>) -> Result<String> {
        Ok(default.to_string())
    }

    fn select(
        &self,
        _prompt: &str,
        options: &[String],
        default: Option<&str>,
        _help: &str,
        _validate: Validator<'_>,
    ) -> Result<String> {
        Ok(default
            .map(str::to_string)
            .or_else(|| options.first().cloned())
            .unwrap_or_default())
    }

    fn multi_select(
        &self,
        _prompt: &str,
        _options: &[String],
        defaults: &[String],
        _help: &str,
        _validate: Validator<'_>,
    ) -> Result<Vec<String>> {
        Ok(defaults.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_prompter_returns_defaults() {
        let prompter = DefaultsPrompter;
        let accept = |_: &Value| Ok(());
        let options = vec!["a".to_string(), "b".to_string()];

        assert!(prompter.confirm("Continue?", true, "").unwrap());
        assert_eq!(prompter.input("Name", "demo", "", &accept).unwrap(), "demo");
        assert_eq!(prompter.select("Pick", &options, None, "", &accept).unwrap(), "a");
        assert_eq!(
            prompter.select("Pick", &options, Some("b"), "", &accept).unwrap(),
            "b"
        );
        assert_eq!(
            prompter
                .multi_select("Pick", &options, &["b".to_string()], "", &accept)
                .unwrap(),
            vec!["b".to_string()]
        );
    }
}

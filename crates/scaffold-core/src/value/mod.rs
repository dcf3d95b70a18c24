//! Typed generator inputs
//!
//! A [`Value`] is declared in generator metadata and resolved through a fixed
//! pipeline: the raw input is rendered against the shared [`DataMap`], cast to
//! its data type, then run through its transform rules. Validation is a
//! separate step so prompts can re-ask instead of failing.

pub mod cast;
pub mod set;
pub mod transform;
pub mod validate;

pub use cast::DataType;
pub use set::{DataMap, ValueSet};
pub use transform::Transform;
pub use validate::Rules;

use crate::error::{Error, Result};
use crate::prompt::Prompter;
use heck::ToKebabCase;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use std::fmt;
use std::str::FromStr;

/// When a value is asked for interactively
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptConfig {
    Always,
    Never,
    OnEmpty,
    #[default]
    OnUnset,
}

impl PromptConfig {
    pub fn as_str(self) -> &'static str {
        match self {
            PromptConfig::Always => "always",
            PromptConfig::Never => "never",
            PromptConfig::OnEmpty => "on-empty",
            PromptConfig::OnUnset => "on-unset",
        }
    }
}

impl FromStr for PromptConfig {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "always" => Ok(PromptConfig::Always),
            "never" => Ok(PromptConfig::Never),
            "on-empty" | "onempty" => Ok(PromptConfig::OnEmpty),
            "on-unset" | "onunset" => Ok(PromptConfig::OnUnset),
            other => Err(format!(
                "unknown prompt config `{}` (expected always, never, on-empty or on-unset)",
                other
            )),
        }
    }
}

/// How a value may be supplied from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    /// Positional argument, bound in declaration order
    Arg,
    /// `--flag` or `--set KEY=VALUE`
    #[default]
    Flag,
    /// Never supplied or prompted; computed from its default
    Hidden,
}

impl InputMode {
    pub fn as_str(self) -> &'static str {
        match self {
            InputMode::Arg => "arg",
            InputMode::Flag => "flag",
            InputMode::Hidden => "hidden",
        }
    }
}

impl FromStr for InputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "arg" | "argument" => Ok(InputMode::Arg),
            "flag" => Ok(InputMode::Flag),
            "hidden" => Ok(InputMode::Hidden),
            other => Err(format!(
                "unknown input mode `{}` (expected arg, flag or hidden)",
                other
            )),
        }
    }
}

/// Value declaration as written in `generator.yaml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueMeta {
    pub key: String,
    pub name: Option<String>,
    pub flag: Option<String>,
    #[serde(rename = "type")]
    pub data_type: Option<String>,
    pub default: Option<Json>,
    pub prompt: Option<String>,
    pub mode: Option<String>,
    pub transform: Option<String>,
    pub validate: Option<String>,
    pub options: Vec<Json>,
    pub help: Option<String>,
}

/// A declared input of a generator
#[derive(Debug, Clone)]
pub struct Value {
    key: String,
    name: String,
    flag: String,
    data_type: DataType,
    default: Json,
    prompt: PromptConfig,
    mode: InputMode,
    transforms: Vec<Transform>,
    rules: Rules,
    options: Vec<String>,
    help: String,
    data: Option<Json>,
    shared: DataMap,
}

impl Value {
    /// Build a value from its declaration
    ///
    /// Each field is parsed separately so errors name the offending field.
    pub fn new(meta: ValueMeta) -> Result<Self> {
        let key = meta.key.trim().to_string();
        if !is_identifier(&key) {
            return Err(Error::construction(
                "key",
                format!("`{}` must start with a letter or underscore and contain only letters, digits and underscores", key),
            ));
        }

        let data_type = parse_field(meta.data_type.as_deref(), "type")?;
        let prompt = parse_field(meta.prompt.as_deref(), "prompt")?;
        let mode = parse_field(meta.mode.as_deref(), "mode")?;
        let transforms = match meta.transform.as_deref() {
            Some(rules) => transform::parse_rules(rules)
                .map_err(|e| Error::construction("transform", e))?,
            None => Vec::new(),
        };
        let options: Vec<String> = meta.options.iter().map(display).collect();
        let rules = match meta.validate.as_deref() {
            Some(expr) => Rules::parse(expr).map_err(|e| Error::construction("validate", e))?,
            None => Rules::default(),
        }
        .with_options(&options, DataType::is_slice(data_type));

        let name = meta
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| key.clone());
        let flag = meta
            .flag
            .filter(|f| !f.trim().is_empty())
            .unwrap_or_else(|| key.to_kebab_case());

        Ok(Self {
            key,
            name,
            flag,
            data_type,
            default: meta.default.unwrap_or(Json::Null),
            prompt,
            mode,
            transforms,
            rules,
            options,
            help: meta.help.unwrap_or_default(),
            data: None,
            shared: DataMap::default(),
        })
    }

    /// Build a value from a raw metadata map
    pub fn from_map(map: &Map<String, Json>) -> Result<Self> {
        let meta: ValueMeta = serde_json::from_value(Json::Object(map.clone()))
            .map_err(|e| Error::construction("value", e))?;
        Self::new(meta)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn flag(&self) -> &str {
        &self.flag
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn default(&self) -> &Json {
        &self.default
    }

    pub fn prompt_config(&self) -> PromptConfig {
        self.prompt
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    /// Replace the raw default, keeping every other setting
    pub fn set_default(&mut self, default: Json) {
        self.default = default;
    }

    /// Builder form of [`Value::set_default`]
    pub fn with_default(mut self, default: Json) -> Self {
        self.default = default;
        self
    }

    pub(crate) fn bind(&mut self, shared: DataMap) {
        self.shared = shared;
    }

    /// Run the render, cast and transform steps on a raw input
    pub fn process(&self, raw: &Json) -> Result<Json> {
        let rendered = self.shared.render(raw)?;
        let cast = cast::cast(&rendered, self.data_type)?;
        transform::apply(&self.transforms, cast)
    }

    /// Process the default; a render failure keeps the unrendered text
    fn process_default(&self) -> Result<Json> {
        let rendered = self.shared.render(&self.default).unwrap_or_else(|e| {
            tracing::debug!(key = %self.key, error = %e, "default did not render, using it unrendered");
            self.default.clone()
        });
        let cast = cast::cast(&rendered, self.data_type)?;
        transform::apply(&self.transforms, cast)
    }

    /// Current value, reporting cast and transform failures of the default
    pub fn try_get(&self) -> Result<Json> {
        let value = match &self.data {
            Some(data) => data.clone(),
            None => self.process_default()?,
        };
        self.shared.insert(&self.key, value.clone());
        Ok(value)
    }

    /// Current value: the explicitly set value, else the processed default
    ///
    /// Never changes the explicit value. A default that cannot be cast is
    /// returned as declared; [`Value::validate`] reports the failure.
    pub fn get(&self) -> Json {
        self.try_get().unwrap_or_else(|e| {
            tracing::debug!(key = %self.key, error = %e, "default did not process");
            self.shared.insert(&self.key, self.default.clone());
            self.default.clone()
        })
    }

    /// Process and store an explicit value
    pub fn set(&mut self, raw: &Json) -> Result<()> {
        let value = self.process(raw)?;
        self.shared.insert(&self.key, value.clone());
        self.data = Some(value);
        Ok(())
    }

    pub fn is_unset(&self) -> bool {
        self.data.is_none()
    }

    pub fn should_prompt(&self) -> bool {
        match self.prompt {
            PromptConfig::Always => true,
            PromptConfig::Never => false,
            PromptConfig::OnEmpty => self.mode != InputMode::Hidden && is_empty(&self.get()),
            PromptConfig::OnUnset => self.mode != InputMode::Hidden && self.is_unset(),
        }
    }

    /// Check the current value against the validation rules
    pub fn validate(&self) -> Result<()> {
        self.check(&self.try_get()?)
    }

    fn check(&self, value: &Json) -> Result<()> {
        self.rules.check(value).map_err(|message| Error::Validation {
            key: self.key.clone(),
            message,
        })
    }

    /// Ask for the value and store the answer
    ///
    /// Booleans are confirmed, values with options are selected, everything
    /// else is typed. Answers are validated before they are accepted.
    pub fn prompt(&mut self, prompter: &dyn Prompter) -> Result<()> {
        let current = self.get();
        let answer = {
            let validate = |candidate: &Json| -> std::result::Result<(), String> {
                let processed = self.process(candidate).map_err(|e| e.to_string())?;
                self.rules.check(&processed)
            };

            match (self.data_type, self.options.is_empty()) {
                (DataType::Bool, _) => {
                    let default = current.as_bool().unwrap_or(false);
                    Json::Bool(prompter.confirm(&self.name, default, &self.help)?)
                }
                (data_type, false) if data_type.is_slice() => {
                    let defaults = match &current {
                        Json::Array(items) => items.iter().map(display).collect(),
                        _ => Vec::new(),
                    };
                    let chosen = prompter.multi_select(
                        &self.name,
                        &self.options,
                        &defaults,
                        &self.help,
                        &validate,
                    )?;
                    Json::Array(chosen.into_iter().map(Json::String).collect())
                }
                (_, false) => {
                    let default = display(&current);
                    let default = Some(default.as_str()).filter(|d| self.options.iter().any(|o| o == d));
                    Json::String(prompter.select(
                        &self.name,
                        &self.options,
                        default,
                        &self.help,
                        &validate,
                    )?)
                }
                (_, true) => {
                    let default = display(&current);
                    Json::String(prompter.input(&self.name, &default, &self.help, &validate)?)
                }
            }
        };

        let processed = self.process(&answer)?;
        self.check(&processed)?;
        self.shared.insert(&self.key, processed.clone());
        self.data = Some(processed);
        Ok(())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.key)
    }
}

fn parse_field<T>(raw: Option<&str>, field: &str) -> Result<T>
where
    T: FromStr<Err = String> + Default,
{
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => s.parse().map_err(|e| Error::construction(field, e)),
        None => Ok(T::default()),
    }
}

fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Text form of a scalar; slices are joined with `, `
pub(crate) fn display(value: &Json) -> String {
    match value {
        Json::Null => String::new(),
        Json::String(s) => s.clone(),
        Json::Array(items) => items.iter().map(display).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}

/// Empty for prompting purposes; booleans and numbers never are
fn is_empty(value: &Json) -> bool {
    match value {
        Json::Null => true,
        Json::String(s) => s.is_empty(),
        Json::Array(items) => items.is_empty(),
        Json::Object(map) => map.is_empty(),
        Json::Bool(_) | Json::Number(_) => false,
    }
}

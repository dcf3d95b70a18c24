//! Generator tasks
//!
//! Every task shares two optional fields:
//! - `if`: a boolean template, `"true"` when omitted
//! - `each`: a comma-separated template; when present the task runs once per item
//!   with `_Index` and `_Item` set
//!
//! Tasks are decoded from their metadata map by the `type` field.

pub mod create;
pub mod delete;
pub mod generator;
pub mod plugin;
pub mod set;
pub mod update;

pub use create::CreateTask;
pub use delete::DeleteTask;
pub use generator::GeneratorTask;
pub use plugin::PluginTask;
pub use set::TaskSet;
pub use update::UpdateTask;

use crate::context::RunContext;
use crate::error::{Error, Result};
use crate::template;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Key holding the zero-based iteration index
pub const INDEX_KEY: &str = "_Index";

/// Key holding the current iteration item
pub const ITEM_KEY: &str = "_Item";

/// Fields shared by every task type
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Common {
    #[serde(rename = "if", default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub each: Option<String>,
}

impl Common {
    /// Items to iterate over, or `None` when the task does not iterate
    ///
    /// An `each` template that is a single reference to a list value iterates
    /// the list itself; anything else is rendered and split on commas.
    pub fn iterator(&self, values: &Map<String, Value>) -> Result<Option<Vec<String>>> {
        let Some(each) = self.each.as_deref().filter(|e| !e.trim().is_empty()) else {
            return Ok(None);
        };

        if let Some(Value::Array(items)) = single_reference(each).and_then(|key| values.get(key)) {
            return Ok(Some(
                items.iter().map(crate::value::display).collect(),
            ));
        }
        template::render_list(each, values).map(Some)
    }

    pub fn should_execute(&self, values: &Map<String, Value>) -> Result<bool> {
        match self.condition.as_deref().filter(|c| !c.trim().is_empty()) {
            Some(condition) => template::render_bool(condition, values),
            None => Ok(true),
        }
    }
}

/// `{{ Key }}` with nothing else around it
fn single_reference(template: &str) -> Option<&str> {
    let inner = template.trim().strip_prefix("{{")?.strip_suffix("}}")?.trim();
    let is_key = !inner.is_empty()
        && inner
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    is_key.then_some(inner)
}

/// A unit of work in a generator
#[derive(Debug, Clone)]
pub enum Task {
    Create(CreateTask),
    Delete(DeleteTask),
    Update(UpdateTask),
    Generator(GeneratorTask),
    Plugin(PluginTask),
}

impl Task {
    /// Decode a task from its metadata map
    pub fn from_map(map: &Map<String, Value>) -> Result<Self> {
        let kind = match map.get("type") {
            Some(Value::String(kind)) => kind.trim().to_lowercase(),
            Some(other) => {
                return Err(Error::construction(
                    "type",
                    format!("task type must be a string, found {}", other),
                ))
            }
            None => return Err(Error::construction("type", "task type is missing")),
        };

        match kind.as_str() {
            "create" => CreateTask::new(decode(map, "create")?).map(Task::Create),
            "delete" => DeleteTask::new(decode(map, "delete")?).map(Task::Delete),
            "update" => UpdateTask::new(decode(map, "update")?).map(Task::Update),
            "generator" => GeneratorTask::new(decode(map, "generator")?).map(Task::Generator),
            "plugin" => PluginTask::new(decode(map, "plugin")?).map(Task::Plugin),
            other => Err(Error::construction(
                "type",
                format!(
                    "unknown task type `{}` (expected create, delete, update, generator or plugin)",
                    other
                ),
            )),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Task::Create(_) => "create",
            Task::Delete(_) => "delete",
            Task::Update(_) => "update",
            Task::Generator(_) => "generator",
            Task::Plugin(_) => "plugin",
        }
    }

    fn common(&self) -> &Common {
        match self {
            Task::Create(task) => &task.common,
            Task::Delete(task) => &task.common,
            Task::Update(task) => &task.common,
            Task::Generator(task) => &task.common,
            Task::Plugin(task) => &task.common,
        }
    }

    pub fn iterator(&self, values: &Map<String, Value>) -> Result<Option<Vec<String>>> {
        self.common().iterator(values)
    }

    pub fn should_execute(&self, values: &Map<String, Value>) -> Result<bool> {
        self.common().should_execute(values)
    }

    /// Run the task once against `values`
    ///
    /// Plugin tasks may add keys to `values`; other tasks leave it unchanged.
    pub fn execute(&self, ctx: &RunContext<'_>, values: &mut Map<String, Value>) -> Result<()> {
        match self {
            Task::Create(task) => task.execute(ctx, values),
            Task::Delete(task) => task.execute(ctx, values),
            Task::Update(task) => task.execute(ctx, values),
            Task::Generator(task) => task.execute(ctx, values),
            Task::Plugin(task) => task.execute(ctx, values),
        }
    }
}

fn decode<T: DeserializeOwned>(map: &Map<String, Value>, kind: &str) -> Result<T> {
    serde_json::from_value(Value::Object(map.clone()))
        .map_err(|e| Error::construction(format!("{} task", kind), e))
}

/// Read an enum field written as a string, e.g. `conflict: replace`
pub(crate) fn parse_enum<T>(raw: Option<&str>, field: &str) -> Result<T>
where
    T: std::str::FromStr<Err = String> + Default,
{
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => s.parse().map_err(|e| Error::construction(field, e)),
        None => Ok(T::default()),
    }
}

/// A scalar written as a string or a number, e.g. `mode: 0755` or `mode: "755"`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub(crate) enum Scalar {
    Text(String),
    Number(u64),
}

impl Scalar {
    pub(crate) fn into_string(self) -> String {
        match self {
            Scalar::Text(s) => s,
            Scalar::Number(n) => n.to_string(),
        }
    }
}

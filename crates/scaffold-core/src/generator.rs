//! Runnable generators
//!
//! A [`Generator`] joins a package's declared values and tasks. Values declared
//! by sub-generators that the package delegates to are merged in at load time,
//! so a single prompt round covers the whole run.

use crate::context::RunContext;
use crate::error::{Error, Result};
use crate::fs::DST_PATH;
use crate::store::{Package, Store};
use crate::task::{Task, TaskSet};
use crate::value::{Value, ValueMeta, ValueSet};
use crate::version::{self, ENGINE_VERSION};
use serde_json::{Map, Value as Json};

/// A loaded package ready to prompt for its values and run its tasks
#[derive(Debug)]
pub struct Generator {
    package: Package,
    values: ValueSet,
    tasks: TaskSet,
    warnings: Vec<String>,
}

impl Generator {
    /// Load `name` and every sub-generator it delegates to by literal name
    ///
    /// The package's own value declarations win over sub-generator ones. When
    /// several delegations contribute the same key, the last one's defaults are
    /// kept.
    pub fn load(store: &dyn Store, name: &str) -> Result<Self> {
        let mut chain = Vec::new();
        Self::load_chain(store, name.trim(), &mut chain)
    }

    fn load_chain(store: &dyn Store, name: &str, chain: &mut Vec<String>) -> Result<Self> {
        if chain.iter().any(|n| n == name) {
            return Err(Error::construction(
                "generator",
                format!("circular delegation {} -> {}", chain.join(" -> "), name),
            ));
        }

        let package = store.load(name)?;
        let mut warnings = Vec::new();
        if let Some(requires) = package.metadata.requires() {
            warnings.extend(version::check_compatibility(ENGINE_VERSION, requires, name));
        }

        let mut values = ValueSet::from_maps(&package.metadata.map_slice("values")?)?;
        let tasks = TaskSet::from_maps(&package.metadata.map_slice("tasks")?, package.path(), ".")?;

        let declared: Vec<String> = values.iter().map(|v| v.key().to_string()).collect();
        chain.push(name.to_string());
        for task in tasks.iter() {
            let Task::Generator(delegate) = task else {
                continue;
            };
            let Some(sub_name) = delegate.literal_name() else {
                continue;
            };
            let sub = Self::load_chain(store, sub_name, chain)?;
            warnings.extend(sub.warnings);
            for value in sub.values.iter() {
                if value.key() == DST_PATH || declared.iter().any(|k| k == value.key()) {
                    continue;
                }
                let mut value = value.clone();
                if let Some(default) = delegate.values().get(value.key()) {
                    value.set_default(default.clone());
                }
                values.upsert(value);
            }
        }
        chain.pop();

        if values.args().next().is_none() && !values.contains(DST_PATH) {
            values.prepend(destination_value()?)?;
        }

        tracing::debug!(
            generator = name,
            values = values.len(),
            tasks = tasks.len(),
            "loaded generator"
        );
        Ok(Self {
            package,
            values,
            tasks,
            warnings,
        })
    }

    pub fn package(&self) -> &Package {
        &self.package
    }

    pub fn values(&self) -> &ValueSet {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut ValueSet {
        &mut self.values
    }

    pub fn tasks(&self) -> &TaskSet {
        &self.tasks
    }

    /// Unmet `requires` constraints found while loading
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Bind inputs, prompt, validate, then run every task
    ///
    /// `args` fill `arg` values in declaration order; `overrides` address
    /// values by key or flag name. Returns the final value map.
    pub fn run(
        &mut self,
        ctx: &RunContext<'_>,
        args: &[String],
        overrides: &[(String, Json)],
    ) -> Result<Map<String, Json>> {
        for warning in &self.warnings {
            ctx.logger.warn(warning);
        }

        let keys: Vec<String> = self.values.args().map(|v| v.key().to_string()).collect();
        if args.len() > keys.len() {
            return Err(Error::construction(
                "arguments",
                format!(
                    "`{}` takes at most {} positional argument(s), got {}",
                    self.package.name(),
                    keys.len(),
                    args.len()
                ),
            ));
        }
        for (key, arg) in keys.iter().zip(args) {
            self.values.set(key, &Json::String(arg.clone()))?;
        }
        for (name, raw) in overrides {
            self.values.set(name, raw)?;
        }

        self.values.prompt(ctx.prompter)?;
        self.values.validate()?;
        let values = self.values.to_map();
        self.execute(ctx, &values)
    }

    /// Fill in defaults for every declared value missing from `values`
    ///
    /// Defaults are rendered with `values` in scope; keys already present are kept.
    pub fn resolve_values(&self, values: &Map<String, Json>) -> Map<String, Json> {
        let data = self.values.data();
        for (key, value) in values {
            data.insert(key, value.clone());
        }

        let missing: Vec<&Value> = self
            .values
            .iter()
            .filter(|v| !values.contains_key(v.key()))
            .collect();
        // Second pass picks up defaults that reference later values
        for value in &missing {
            value.get();
        }

        let mut resolved = values.clone();
        for value in missing {
            resolved.insert(value.key().to_string(), value.get());
        }
        resolved
    }

    /// Run the task set against already-resolved values
    pub fn execute(&self, ctx: &RunContext<'_>, values: &Map<String, Json>) -> Result<Map<String, Json>> {
        self.tasks.execute(ctx, values)
    }
}

/// Positional destination added to generators that declare no arguments
fn destination_value() -> Result<Value> {
    Value::new(ValueMeta {
        key: DST_PATH.to_string(),
        name: Some("Destination".to_string()),
        default: Some(Json::String(".".to_string())),
        prompt: Some("never".to_string()),
        mode: Some("arg".to_string()),
        transform: Some("trim,expand-path".to_string()),
        help: Some("Directory to generate into".to_string()),
        ..Default::default()
    })
}

//! Generator task: run another generator against the current values

use super::Common;
use crate::context::RunContext;
use crate::error::{Error, Result};
use crate::generator::Generator;
use crate::merge::{self, MergeConfig, MergeType};
use crate::template;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Deepest allowed chain of generators invoking generators
pub const MAX_DEPTH: usize = 16;

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorMeta {
    #[serde(flatten)]
    pub common: Common,
    #[serde(alias = "name")]
    pub generator: String,
    #[serde(default)]
    pub values: Map<String, Value>,
}

#[derive(Debug, Clone)]
pub struct GeneratorTask {
    pub(crate) common: Common,
    generator: String,
    values: Map<String, Value>,
}

impl GeneratorTask {
    pub fn new(meta: GeneratorMeta) -> Result<Self> {
        if meta.generator.trim().is_empty() {
            return Err(Error::construction("generator", "generator name is empty"));
        }
        Ok(Self {
            common: meta.common,
            generator: meta.generator,
            values: meta.values,
        })
    }

    /// The generator name when it is not a template
    pub fn literal_name(&self) -> Option<&str> {
        (!self.generator.contains("{{")).then(|| self.generator.trim())
    }

    /// Value overrides passed to the sub-generator
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Run the sub-generator on a copy of `values`
    ///
    /// The caller's map is never modified.
    pub fn execute(&self, ctx: &RunContext<'_>, values: &mut Map<String, Value>) -> Result<()> {
        let name = template::render(&self.generator, values)?;
        let name = name.trim();
        if ctx.depth >= MAX_DEPTH {
            return Err(Error::construction(
                "generator",
                format!("`{}` is nested more than {} generators deep", name, MAX_DEPTH),
            ));
        }

        let sub = Generator::load(ctx.store, name)?;
        for warning in sub.warnings() {
            ctx.logger.warn(warning);
        }

        let overrides = template::render_value(&Value::Object(self.values.clone()), values)?;
        let scoped = match merge::merge(
            &Value::Object(values.clone()),
            &overrides,
            &MergeConfig::new(MergeType::Replace),
        ) {
            Value::Object(map) => map,
            _ => values.clone(),
        };
        let scoped = sub.resolve_values(&scoped);

        tracing::debug!(generator = name, depth = ctx.depth + 1, "running sub-generator");
        sub.execute(&ctx.nested(), &scoped)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::FileAction;
    use crate::testing::{roots, Harness, MapStore};
    use serde_json::json;
    use std::fs;

    fn task(meta: Value) -> GeneratorTask {
        GeneratorTask::new(serde_json::from_value(meta).unwrap()).unwrap()
    }

    #[test]
    fn test_literal_name() {
        assert_eq!(task(json!({ "generator": " api " })).literal_name(), Some("api"));
        assert_eq!(task(json!({ "name": "{{Kind}}" })).literal_name(), None);
    }

    #[test]
    fn test_runs_sub_generator_with_overrides() {
        let (tmp, mut values) = roots();
        let sub = tmp.path().join("store/handler");
        fs::create_dir_all(&sub).unwrap();
        fs::write(sub.join("handler.rs"), "// {{Kind}} {{Name}} {{Suffix}}\n").unwrap();
        let store = MapStore::new().with(
            "handler",
            &sub,
            r#"
values:
  - key: Kind
    default: get
  - key: Suffix
    default: "{{Kind}}_handler"
tasks:
  - type: create
    src: handler.rs
    dst: "{{Name}}_{{Kind}}.rs"
    conflict: replace
"#,
        );
        let harness = Harness::new().with_store(store);
        let before = values.clone();

        task(json!({ "generator": "handler", "values": { "Kind": "post" } }))
            .execute(&harness.context(), &mut values)
            .unwrap();

        let written = tmp.path().join("dst/demo_post.rs");
        assert_eq!(
            fs::read_to_string(&written).unwrap(),
            "// post demo post_handler\n"
        );
        assert_eq!(harness.logger.actions(), vec![(FileAction::Create, written)]);
        assert_eq!(values, before);
    }

    #[test]
    fn test_unknown_generator() {
        let (_tmp, mut values) = roots();
        let harness = Harness::new();
        let err = task(json!({ "generator": "{{Name}}" }))
            .execute(&harness.context(), &mut values)
            .unwrap_err();
        assert_eq!(err.to_string(), "generator `demo` not found");
    }

    #[test]
    fn test_self_reference_stops_at_depth_limit() {
        let (tmp, mut values) = roots();
        let store = MapStore::new().with(
            "loop",
            tmp.path(),
            "tasks:\n  - type: generator\n    generator: \"{{Next}}\"\n",
        );
        values.insert("Next".to_string(), json!("loop"));
        let harness = Harness::new().with_store(store);

        let err = task(json!({ "generator": "loop" }))
            .execute(&harness.context(), &mut values)
            .unwrap_err();
        assert!(err.to_string().contains("nested more than 16 generators deep"));
    }
}

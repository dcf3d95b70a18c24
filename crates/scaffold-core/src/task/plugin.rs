//! Plugin task: call an external plugin and merge its output into the values

use super::Common;
use crate::context::RunContext;
use crate::error::{Error, Result};
use crate::plugin::call_checked;
use crate::template;
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct PluginMeta {
    #[serde(flatten)]
    pub common: Common,
    #[serde(alias = "name")]
    pub plugin: String,
    pub function: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PluginTask {
    pub(crate) common: Common,
    plugin: String,
    function: String,
    description: Option<String>,
}

impl PluginTask {
    pub fn new(meta: PluginMeta) -> Result<Self> {
        if meta.plugin.trim().is_empty() {
            return Err(Error::construction("plugin", "plugin name is empty"));
        }
        if meta.function.trim().is_empty() {
            return Err(Error::construction("function", "function name is empty"));
        }
        Ok(Self {
            common: meta.common,
            plugin: meta.plugin,
            function: meta.function,
            description: meta.description,
        })
    }

    /// Call the plugin; output keys are written into `values`
    ///
    /// Plugins run under dry-run too, since later tasks may depend on their output.
    pub fn execute(&self, ctx: &RunContext<'_>, values: &mut Map<String, Value>) -> Result<()> {
        let name = template::render(&self.plugin, values)?;
        let function = template::render(&self.function, values)?;
        if let Some(description) = &self.description {
            let description = template::render(description, values)?;
            if !description.trim().is_empty() {
                ctx.logger.info(description.trim());
            }
        }

        let plugin = ctx.plugins.load(name.trim())?;
        let (meta, output) = call_checked(plugin.as_ref(), function.trim(), values)?;
        if !meta.is_empty() {
            tracing::debug!(plugin = %name, function = %function, meta = %meta, "plugin call finished");
        }

        values.extend(output);
        Ok(())
    }
}

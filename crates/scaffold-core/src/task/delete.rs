//! Delete task: remove a destination file or directory

use super::{parse_enum, Common};
use crate::context::RunContext;
use crate::error::{Error, Result};
use crate::fs::{Destination, Missing};
use crate::logger::FileAction;
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteMeta {
    #[serde(flatten)]
    pub common: Common,
    pub dst: String,
    #[serde(default)]
    pub missing: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DeleteTask {
    pub(crate) common: Common,
    dst: Destination,
}

impl DeleteTask {
    pub fn new(meta: DeleteMeta) -> Result<Self> {
        if meta.dst.trim().is_empty() {
            return Err(Error::construction("dst", "destination path is empty"));
        }
        let missing: Missing = parse_enum(meta.missing.as_deref(), "missing")?;
        Ok(Self {
            common: meta.common,
            dst: Destination::new(meta.dst).with_missing(missing),
        })
    }

    pub fn execute(&self, ctx: &RunContext<'_>, values: &mut Map<String, Value>) -> Result<()> {
        let mut dst = self.dst.clone();
        dst.set_values(values)?;

        if !dst.exists() {
            return match dst.missing() {
                Missing::Ignore => {
                    tracing::debug!(path = %dst, "nothing to delete");
                    Ok(())
                }
                Missing::Error => Err(Error::PathNotFound(dst.path().to_path_buf())),
            };
        }

        ctx.logger.action(FileAction::Delete, dst.path());
        if !ctx.dry_run {
            dst.delete()?;
        }
        Ok(())
    }
}

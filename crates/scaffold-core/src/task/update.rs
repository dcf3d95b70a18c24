//! Update task: modify part of an existing destination document in place
//!
//! `pattern` is a dotted path into the decoded document (`dependencies.serde`,
//! `members.0`); numeric segments index lists and an empty pattern selects the
//! whole document. The selected part is combined with the rendered `value`
//! through the merge engine and the document is written back.

use super::{parse_enum, Common};
use crate::context::RunContext;
use crate::error::{Error, Result};
use crate::fs::{Destination, Missing};
use crate::logger::FileAction;
use crate::merge::{self, Action, MergeConfig};
use crate::template;
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateMeta {
    #[serde(flatten)]
    pub common: Common,
    pub dst: String,
    #[serde(default)]
    pub dst_type: Option<String>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub merge: MergeConfig,
    #[serde(default)]
    pub missing: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdateTask {
    pub(crate) common: Common,
    dst: Destination,
    pattern: String,
    action: Action,
    value: Value,
    merge: MergeConfig,
}

impl UpdateTask {
    pub fn new(meta: UpdateMeta) -> Result<Self> {
        if meta.dst.trim().is_empty() {
            return Err(Error::construction("dst", "destination path is empty"));
        }
        let missing: Missing = parse_enum(meta.missing.as_deref(), "missing")?;
        let action: Action = parse_enum(meta.action.as_deref(), "action")?;
        Ok(Self {
            common: meta.common,
            dst: Destination::new(meta.dst)
                .with_content_type(meta.dst_type)
                .with_missing(missing),
            pattern: meta.pattern.unwrap_or_default(),
            action,
            value: meta.value,
            merge: meta.merge,
        })
    }

    pub fn execute(&self, ctx: &RunContext<'_>, values: &mut Map<String, Value>) -> Result<()> {
        let mut dst = self.dst.clone();
        dst.set_values(values)?;

        if !dst.exists() {
            return match dst.missing() {
                Missing::Ignore => {
                    ctx.logger.action(FileAction::Skip, dst.path());
                    Ok(())
                }
                Missing::Error => Err(Error::PathNotFound(dst.path().to_path_buf())),
            };
        }

        let pattern = template::render(&self.pattern, values)?;
        let path: Vec<&str> = pattern
            .split('.')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        let arg = template::render_value(&self.value, values)?;

        let document = dst.content()?;
        let updated = if path.is_empty() {
            merge::modify(&document, self.action, &arg, &self.merge)?
        } else {
            let mut updated = document.clone();
            let subject = lookup(&document, &path).cloned().unwrap_or(Value::Null);
            if self.action == Action::Delete {
                remove(&mut updated, &path);
            } else {
                let result = merge::modify(&subject, self.action, &arg, &self.merge)?;
                assign(&mut updated, &path, result).map_err(|message| Error::Content {
                    content_type: dst.content_type().as_str(),
                    path: dst.path().to_path_buf(),
                    message,
                })?;
            }
            updated
        };

        if updated == document {
            ctx.logger.action(FileAction::Skip, dst.path());
            return Ok(());
        }

        ctx.logger.action(FileAction::Update, dst.path());
        if !ctx.dry_run {
            dst.write(&updated)?;
        }
        Ok(())
    }
}

fn lookup<'a>(document: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(document, |current, segment| match current {
        Value::Object(map) => map.get(*segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Set the value at `path`, creating intermediate maps as needed
fn assign(document: &mut Value, path: &[&str], value: Value) -> std::result::Result<(), String> {
    let Some((last, parents)) = path.split_last() else {
        *document = value;
        return Ok(());
    };

    let mut current = document;
    for segment in parents {
        if current.is_null() {
            *current = Value::Object(Map::new());
        }
        current = match current {
            Value::Object(map) => map
                .entry(segment.to_string())
                .or_insert(Value::Null),
            Value::Array(items) => {
                let index = list_index(segment, items.len())?;
                &mut items[index]
            }
            _ => return Err(format!("cannot descend into `{}`", segment)),
        };
    }

    if current.is_null() {
        *current = Value::Object(Map::new());
    }
    match current {
        Value::Object(map) => {
            map.insert(last.to_string(), value);
            Ok(())
        }
        Value::Array(items) => {
            let index = list_index(last, items.len())?;
            items[index] = value;
            Ok(())
        }
        _ => Err(format!("cannot set `{}` on a scalar", last)),
    }
}

fn list_index(segment: &str, len: usize) -> std::result::Result<usize, String> {
    match segment.parse::<usize>() {
        Ok(index) if index < len => Ok(index),
        _ => Err(format!("`{}` is not an index of a list of {} items", segment, len)),
    }
}

/// Remove the entry at `path` from its parent, if present
fn remove(document: &mut Value, path: &[&str]) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut current = document;
    for segment in parents {
        let next = match current {
            Value::Object(map) => map.get_mut(*segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get_mut(i)),
            _ => None,
        };
        match next {
            Some(next) => current = next,
            None => return,
        }
    }
    match current {
        Value::Object(map) => {
            map.remove(*last);
        }
        Value::Array(items) => {
            if let Ok(index) = last.parse::<usize>() {
                if index < items.len() {
                    items.remove(index);
                }
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{roots, Harness};
    use serde_json::json;
    use std::fs;

    fn task(meta: Value) -> UpdateTask {
        UpdateTask::new(serde_json::from_value(meta).unwrap()).unwrap()
    }

    fn read_json(path: std::path::PathBuf) -> Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_appends_to_nested_list() {
        let (tmp, mut values) = roots();
        let file = tmp.path().join("dst/package.json");
        fs::write(&file, r#"{"workspaces": {"members": ["core"]}}"#).unwrap();

        let harness = Harness::new();
        task(json!({
            "dst": "package.json",
            "pattern": "workspaces.members",
            "value": ["{{Name}}"]
        }))
        .execute(&harness.context(), &mut values)
        .unwrap();

        assert_eq!(read_json(file.clone()), json!({"workspaces": {"members": ["core", "demo"]}}));
        assert_eq!(harness.logger.actions(), vec![(FileAction::Update, file)]);
    }

    #[test]
    fn test_upsert_merge_on_whole_document() {
        let (tmp, mut values) = roots();
        let file = tmp.path().join("dst/config.yaml");
        fs::write(&file, "features:\n  - auth\nname: app\n").unwrap();

        let harness = Harness::new();
        task(json!({
            "dst": "config.yaml",
            "value": { "features": ["auth", "db"], "port": 80 },
            "merge": { "type": "upsert" }
        }))
        .execute(&harness.context(), &mut values)
        .unwrap();

        let written: Value =
            serde_yaml::from_str(&fs::read_to_string(&file).unwrap()).unwrap();
        assert_eq!(written, json!({ "features": ["auth", "db"], "name": "app", "port": 80 }));
    }

    #[test]
    fn test_replace_and_delete_keys() {
        let (tmp, mut values) = roots();
        let file = tmp.path().join("dst/settings.json");
        fs::write(&file, r#"{"a": {"b": 1, "c": 2}, "list": [1, 2, 3]}"#).unwrap();

        let harness = Harness::new();
        task(json!({ "dst": "settings.json", "pattern": "a.b", "action": "replace", "value": 10 }))
            .execute(&harness.context(), &mut values)
            .unwrap();
        task(json!({ "dst": "settings.json", "pattern": "a.c", "action": "delete" }))
            .execute(&harness.context(), &mut values)
            .unwrap();
        task(json!({ "dst": "settings.json", "pattern": "list.1", "action": "delete" }))
            .execute(&harness.context(), &mut values)
            .unwrap();

        assert_eq!(read_json(file), json!({"a": {"b": 10}, "list": [1, 3]}));
    }

    #[test]
    fn test_creates_missing_intermediate_keys() {
        let (tmp, mut values) = roots();
        let file = tmp.path().join("dst/tool.json");
        fs::write(&file, "{}").unwrap();

        let harness = Harness::new();
        task(json!({ "dst": "tool.json", "pattern": "tools.{{Name}}.enabled", "value": true }))
            .execute(&harness.context(), &mut values)
            .unwrap();

        assert_eq!(read_json(file), json!({"tools": {"demo": {"enabled": true}}}));
    }

    #[test]
    fn test_text_files_append_and_prepend() {
        let (tmp, mut values) = roots();
        let file = tmp.path().join("dst/.gitignore");
        fs::write(&file, "target/\n").unwrap();

        let harness = Harness::new();
        task(json!({ "dst": ".gitignore", "value": "{{Name}}.log\n" }))
            .execute(&harness.context(), &mut values)
            .unwrap();
        task(json!({ "dst": ".gitignore", "action": "prepend", "value": "# generated\n" }))
            .execute(&harness.context(), &mut values)
            .unwrap();

        assert_eq!(
            fs::read_to_string(file).unwrap(),
            "# generated\ntarget/\ndemo.log\n"
        );
    }

    #[test]
    fn test_unchanged_document_is_skipped() {
        let (tmp, mut values) = roots();
        fs::write(tmp.path().join("dst/a.json"), r#"{"x": [1]}"#).unwrap();

        let harness = Harness::new();
        task(json!({ "dst": "a.json", "pattern": "x", "value": [1], "merge": {"type": "upsert"}, "action": "append" }))
            .execute(&harness.context(), &mut values)
            .unwrap();
        assert_eq!(harness.logger.actions()[0].0, FileAction::Skip);
    }

    #[test]
    fn test_missing_destination() {
        let (_tmp, mut values) = roots();
        let harness = Harness::new();

        task(json!({ "dst": "absent.json", "value": 1 }))
            .execute(&harness.context(), &mut values)
            .unwrap();
        assert_eq!(harness.logger.actions()[0].0, FileAction::Skip);

        let err = task(json!({ "dst": "absent.json", "value": 1, "missing": "error" }))
            .execute(&harness.context(), &mut values)
            .unwrap_err();
        assert!(matches!(err, Error::PathNotFound(_)));
    }

    #[test]
    fn test_incompatible_kinds_fail() {
        let (tmp, mut values) = roots();
        fs::write(tmp.path().join("dst/a.json"), r#"{"x": "text"}"#).unwrap();

        let harness = Harness::new();
        let err = task(json!({ "dst": "a.json", "pattern": "x", "value": [1] }))
            .execute(&harness.context(), &mut values)
            .unwrap_err();
        assert!(matches!(err, Error::Merge { .. }));
    }
}

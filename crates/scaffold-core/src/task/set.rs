//! Ordered task pipeline of a generator

use super::{Task, INDEX_KEY, ITEM_KEY};
use crate::context::RunContext;
use crate::error::{Error, Result};
use crate::fs::{DST_PATH, SRC_PATH};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Tasks plus the roots injected into every task's values
#[derive(Debug, Clone)]
pub struct TaskSet {
    tasks: Vec<Task>,
    src_path: PathBuf,
    dst_path: PathBuf,
}

impl TaskSet {
    pub fn new(tasks: Vec<Task>, src_path: impl Into<PathBuf>, dst_path: impl Into<PathBuf>) -> Self {
        Self {
            tasks,
            src_path: src_path.into(),
            dst_path: dst_path.into(),
        }
    }

    /// Decode tasks from metadata maps; errors name the failing task
    pub fn from_maps(
        maps: &[Map<String, Value>],
        src_path: impl Into<PathBuf>,
        dst_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        let tasks = maps
            .iter()
            .enumerate()
            .map(|(i, map)| {
                Task::from_map(map).map_err(|e| match e {
                    Error::Construction { field, message } => Error::Construction {
                        field: format!("tasks[{}] {}", i, field),
                        message,
                    },
                    other => other,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(tasks, src_path, dst_path))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn src_path(&self) -> &Path {
        &self.src_path
    }

    /// Run every task in order on a copy of `values`, stopping at the first error
    ///
    /// `SrcPath` is always this set's source root; `DstPath` is only filled in
    /// when the caller did not provide one. Iterating tasks get a fresh copy
    /// per item, so `_Index`, `_Item` and plugin output stay inside the item.
    /// Returns the values as left by the last task.
    pub fn execute(&self, ctx: &RunContext<'_>, values: &Map<String, Value>) -> Result<Map<String, Value>> {
        let mut values = values.clone();
        values.insert(
            SRC_PATH.to_string(),
            Value::String(self.src_path.to_string_lossy().into_owned()),
        );
        values
            .entry(DST_PATH.to_string())
            .or_insert_with(|| Value::String(self.dst_path.to_string_lossy().into_owned()));

        for task in &self.tasks {
            match task.iterator(&values)? {
                Some(items) => {
                    for (index, item) in items.into_iter().enumerate() {
                        let mut scoped = values.clone();
                        scoped.insert(INDEX_KEY.to_string(), Value::from(index));
                        scoped.insert(ITEM_KEY.to_string(), Value::String(item));
                        if task.should_execute(&scoped)? {
                            task.execute(ctx, &mut scoped)?;
                        }
                    }
                }
                None => {
                    if task.should_execute(&values)? {
                        task.execute(ctx, &mut values)?;
                    }
                }
            }
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{roots, Harness, StubPlugin};
    use serde_json::json;
    use std::cell::RefCell;
    use std::fs;
    use std::rc::Rc;

    fn maps(value: Value) -> Vec<Map<String, Value>> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect()
    }

    fn recorder() -> (StubPlugin, Rc<RefCell<Vec<Value>>>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let seen = calls.clone();
        let plugin = StubPlugin::new("record", move |_, input| {
            let values: Value = serde_json::from_slice(input).unwrap();
            seen.borrow_mut().push(values);
            Ok(json!({ "Recorded": true }))
        });
        (plugin, calls)
    }

    #[test]
    fn test_each_runs_once_per_item() {
        let (tmp, values) = roots();
        let (plugin, calls) = recorder();
        let harness = Harness::new().with_plugin(plugin);
        let set = TaskSet::from_maps(
            &maps(json!([{ "type": "plugin", "plugin": "record", "function": "run", "each": "foo, bar, baz" }])),
            tmp.path().join("src"),
            tmp.path().join("dst"),
        )
        .unwrap();

        let result = set.execute(&harness.context(), &values).unwrap();

        let calls = calls.borrow();
        assert_eq!(calls.len(), 3);
        for (i, item) in ["foo", "bar", "baz"].iter().enumerate() {
            assert_eq!(calls[i][INDEX_KEY], json!(i));
            assert_eq!(calls[i][ITEM_KEY], json!(item));
        }
        assert!(!result.contains_key(INDEX_KEY));
        assert!(!result.contains_key("Recorded"));
    }

    #[test]
    fn test_condition_is_evaluated_per_item() {
        let (tmp, values) = roots();
        let harness = Harness::new();
        let set = TaskSet::from_maps(
            &maps(json!([{
                "type": "create",
                "content": "{{_Item}}",
                "dst": "{{_Item}}.txt",
                "each": "a, b, c",
                "if": "{{#if (eq _Item \"b\")}}false{{else}}true{{/if}}"
            }])),
            tmp.path().join("src"),
            tmp.path().join("dst"),
        )
        .unwrap();

        set.execute(&harness.context(), &values).unwrap();

        assert!(tmp.path().join("dst/a.txt").exists());
        assert!(!tmp.path().join("dst/b.txt").exists());
        assert_eq!(fs::read_to_string(tmp.path().join("dst/c.txt")).unwrap(), "c");
    }

    #[test]
    fn test_roots_are_injected() {
        let (tmp, mut values) = roots();
        values.insert(SRC_PATH.to_string(), json!("/elsewhere"));
        let (plugin, calls) = recorder();
        let harness = Harness::new().with_plugin(plugin);
        let src = tmp.path().join("src");
        let set = TaskSet::from_maps(
            &maps(json!([{ "type": "plugin", "plugin": "record", "function": "run" }])),
            &src,
            "/unused",
        )
        .unwrap();

        let result = set.execute(&harness.context(), &values).unwrap();

        let seen = calls.borrow()[0].clone();
        assert_eq!(seen[SRC_PATH], json!(src.to_string_lossy()));
        assert_eq!(seen[DST_PATH], values[DST_PATH]);
        assert_eq!(result["Recorded"], json!(true));

        values.remove(DST_PATH);
        let result = set.execute(&harness.context(), &values).unwrap();
        assert_eq!(result[DST_PATH], json!("/unused"));
    }

    #[test]
    fn test_stops_at_first_error() {
        let (tmp, values) = roots();
        let harness = Harness::new();
        let set = TaskSet::from_maps(
            &maps(json!([
                { "type": "delete", "dst": "absent", "missing": "error" },
                { "type": "create", "content": "x", "dst": "after.txt" }
            ])),
            tmp.path().join("src"),
            tmp.path().join("dst"),
        )
        .unwrap();

        let err = set.execute(&harness.context(), &values).unwrap_err();
        assert!(matches!(err, Error::PathNotFound(_)));
        assert!(!tmp.path().join("dst/after.txt").exists());
    }

    #[test]
    fn test_construction_errors_name_the_task() {
        let err = TaskSet::from_maps(
            &maps(json!([{ "type": "create", "content": "x", "dst": "a" }, { "type": "move" }])),
            "/src",
            "/dst",
        )
        .unwrap_err();
        assert!(err.to_string().starts_with("invalid tasks[1] type: unknown task type `move`"));
    }
}

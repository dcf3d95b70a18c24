//! In-memory collaborators for unit tests

use crate::context::RunContext;
use crate::error::{Error, Result};
use crate::fs::{DST_PATH, SRC_PATH};
use crate::logger::{FileAction, Logger};
use crate::plugin::{Plugin, PluginLoader, PluginResponse};
use crate::prompt::{Prompter, Validator};
use crate::store::{Metadata, Package, Store};
use crate::template;
use serde_json::{json, Map, Value};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::TempDir;

/// A temp directory with `src/` and `dst/` plus values pointing at them
pub fn roots() -> (TempDir, Map<String, Value>) {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(tmp.path().join("src")).unwrap();
    std::fs::create_dir_all(tmp.path().join("dst")).unwrap();

    let mut values = Map::new();
    values.insert(SRC_PATH.to_string(), json!(tmp.path().join("src")));
    values.insert(DST_PATH.to_string(), json!(tmp.path().join("dst")));
    values.insert("Name".to_string(), json!("demo"));
    (tmp, values)
}

#[derive(Debug, Default)]
pub struct RecordingLogger {
    actions: RefCell<Vec<(FileAction, PathBuf)>>,
    infos: RefCell<Vec<String>>,
    warnings: RefCell<Vec<String>>,
}

impl RecordingLogger {
    pub fn actions(&self) -> Vec<(FileAction, PathBuf)> {
        self.actions.borrow().clone()
    }

    pub fn infos(&self) -> Vec<String> {
        self.infos.borrow().clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings.borrow().clone()
    }
}

impl Logger for RecordingLogger {
    fn action(&self, action: FileAction, path: &Path) {
        self.actions.borrow_mut().push((action, path.to_path_buf()));
    }

    fn info(&self, message: &str) {
        self.infos.borrow_mut().push(message.to_string());
    }

    fn warn(&self, message: &str) {
        self.warnings.borrow_mut().push(message.to_string());
    }
}

/// Replays queued answers and records every question as `kind:prompt`
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: RefCell<VecDeque<Value>>,
    asked: RefCell<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(self, answer: Value) -> Self {
        self.answers.borrow_mut().push_back(answer);
        self
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.borrow().clone()
    }

    fn next(&self, kind: &str, prompt: &str) -> Result<Value> {
        self.answers
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| Error::Prompt(format!("no scripted answer for {} `{}`", kind, prompt)))
    }

    fn record(&self, kind: &str, prompt: &str) {
        self.asked.borrow_mut().push(format!("{}:{}", kind, prompt));
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&self, prompt: &str, _default: bool, _help: &str) -> Result<bool> {
        self.record("confirm", prompt);
        match self.next("confirm", prompt)? {
            Value::Bool(b) => Ok(b),
            other => template::parse_bool(&crate::value::display(&other))
                .ok_or_else(|| Error::Prompt(format!("`{}` is not a yes or no answer", other))),
        }
    }

    fn input(&self, prompt: &str, _default: &str, _help: &str, validate: Validator<'_>) -> Result<String> {
        self.record("input", prompt);
        loop {
            let answer = crate::value::display(&self.next("input", prompt)?);
            if validate(&Value::String(answer.clone())).is_ok() {
                return Ok(answer);
            }
        }
    }

    fn select(
        &self,
        prompt: &str,
        _options: &[String],
        _default: Option<&str>,
        _help: &str,
        _validate: Validator<'_>,
    ) -> Result<String> {
        self.record("select", prompt);
        Ok(crate::value::display(&self.next("select", prompt)?))
    }

    fn multi_select(
        &self,
        prompt: &str,
        _options: &[String],
        _defaults: &[String],
        _help: &str,
        _validate: Validator<'_>,
    ) -> Result<Vec<String>> {
        self.record("multi_select", prompt);
        match self.next("multi_select", prompt)? {
            Value::Array(items) => Ok(items.iter().map(crate::value::display).collect()),
            other => Ok(template::split_list(&crate::value::display(&other))),
        }
    }
}

/// Packages registered by name
#[derive(Debug, Default)]
pub struct MapStore {
    packages: HashMap<String, Package>,
}

impl MapStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a package at `path` described by a YAML manifest
    pub fn with(mut self, name: &str, path: &Path, manifest: &str) -> Self {
        let metadata = Metadata::parse(manifest, &path.join("generator.yaml")).unwrap();
        self.packages
            .insert(name.to_string(), Package::new(name, path, metadata));
        self
    }
}

impl Store for MapStore {
    fn load(&self, name: &str) -> Result<Package> {
        self.packages
            .get(name)
            .cloned()
            .ok_or_else(|| Error::GeneratorNotFound(name.to_string()))
    }
}

type PluginFn = dyn Fn(&str, &[u8]) -> Result<Value>;

/// A plugin backed by a closure taking the function name and JSON input
#[derive(Clone)]
pub struct StubPlugin {
    name: String,
    handler: Rc<PluginFn>,
}

impl StubPlugin {
    pub fn new(name: &str, handler: impl Fn(&str, &[u8]) -> Result<Value> + 'static) -> Self {
        Self {
            name: name.to_string(),
            handler: Rc::new(handler),
        }
    }
}

impl Plugin for StubPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, function: &str, input: &[u8]) -> Result<PluginResponse> {
        let output = (self.handler)(function, input)?;
        Ok(PluginResponse {
            meta: format!("stub {}", function),
            output: serde_json::to_vec(&output).unwrap(),
        })
    }
}

#[derive(Default)]
pub struct StubPluginLoader {
    plugins: HashMap<String, StubPlugin>,
}

impl PluginLoader for StubPluginLoader {
    fn load(&self, name: &str) -> Result<Box<dyn Plugin>> {
        self.plugins
            .get(name)
            .cloned()
            .map(|plugin| Box::new(plugin) as Box<dyn Plugin>)
            .ok_or_else(|| Error::plugin(name, "not found"))
    }
}

/// Owns the fakes a [`RunContext`] borrows
#[derive(Default)]
pub struct Harness {
    pub logger: RecordingLogger,
    pub prompter: ScriptedPrompter,
    pub store: MapStore,
    pub plugins: StubPluginLoader,
}

impl Harness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_answers(mut self, answers: Vec<Value>) -> Self {
        self.prompter = answers
            .into_iter()
            .fold(ScriptedPrompter::new(), ScriptedPrompter::answer);
        self
    }

    pub fn with_plugin(mut self, plugin: StubPlugin) -> Self {
        self.plugins.plugins.insert(plugin.name.clone(), plugin);
        self
    }

    pub fn with_store(mut self, store: MapStore) -> Self {
        self.store = store;
        self
    }

    pub fn context(&self) -> RunContext<'_> {
        RunContext::new(&self.logger, &self.prompter, &self.store, &self.plugins)
    }
}

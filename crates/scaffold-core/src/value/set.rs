//! Ordered value collections sharing one template context

use super::{InputMode, Value, ValueMeta};
use crate::error::{Error, Result};
use crate::prompt::Prompter;
use crate::template;
use serde_json::{Map, Value as Json};
use std::cell::RefCell;
use std::rc::Rc;

/// Shared template context of a [`ValueSet`]
///
/// Every value in a set holds a handle to the same map and writes its latest
/// materialised value into it, so defaults can reference each other.
#[derive(Debug, Clone, Default)]
pub struct DataMap(Rc<RefCell<Map<String, Json>>>);

impl DataMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: &str, value: Json) {
        self.0.borrow_mut().insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<Json> {
        self.0.borrow().get(key).cloned()
    }

    /// Deep copy of the current contents
    pub fn snapshot(&self) -> Map<String, Json> {
        self.0.borrow().clone()
    }

    /// Render every string inside `raw` against the current contents
    pub fn render(&self, raw: &Json) -> Result<Json> {
        let data = self.0.borrow();
        template::render_value(raw, &*data)
    }
}

/// Values of one generator, in declaration order
#[derive(Debug, Default)]
pub struct ValueSet {
    values: Vec<Value>,
    data: DataMap,
}

impl ValueSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from value declarations; keys must be unique
    pub fn from_meta(metas: Vec<ValueMeta>) -> Result<Self> {
        let mut set = Self::new();
        for meta in metas {
            set.add(Value::new(meta)?)?;
        }
        Ok(set)
    }

    /// Build a set from raw metadata maps
    pub fn from_maps(maps: &[Map<String, Json>]) -> Result<Self> {
        let mut set = Self::new();
        for map in maps {
            set.add(Value::from_map(map)?)?;
        }
        Ok(set)
    }

    /// Append a value, binding it to this set's data map
    pub fn add(&mut self, mut value: Value) -> Result<()> {
        if self.contains(value.key()) {
            return Err(Error::construction(
                "values",
                format!("duplicate key `{}`", value.key()),
            ));
        }
        value.bind(self.data.clone());
        self.values.push(value);
        Ok(())
    }

    /// Insert a value at the front, binding it to this set's data map
    pub fn prepend(&mut self, mut value: Value) -> Result<()> {
        if self.contains(value.key()) {
            return Err(Error::construction(
                "values",
                format!("duplicate key `{}`", value.key()),
            ));
        }
        value.bind(self.data.clone());
        self.values.insert(0, value);
        Ok(())
    }

    /// Replace the value with the same key in place, or append it
    pub fn upsert(&mut self, mut value: Value) {
        value.bind(self.data.clone());
        match self.values.iter().position(|v| v.key() == value.key()) {
            Some(index) => self.values[index] = value,
            None => self.values.push(value),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.iter().any(|v| v.key() == key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.iter().find(|v| v.key() == key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.values.iter_mut().find(|v| v.key() == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values supplied as positional arguments, in declaration order
    pub fn args(&self) -> impl Iterator<Item = &Value> {
        self.values.iter().filter(|v| v.mode() == InputMode::Arg)
    }

    pub fn data(&self) -> &DataMap {
        &self.data
    }

    /// Set a value addressed by key or flag name
    ///
    /// Hidden values cannot be set from outside the generator.
    pub fn set(&mut self, name: &str, raw: &Json) -> Result<()> {
        let value = self
            .values
            .iter_mut()
            .find(|v| v.key() == name || v.flag() == name)
            .ok_or_else(|| Error::UnknownValue(name.to_string()))?;
        if value.mode() == InputMode::Hidden {
            return Err(Error::Validation {
                key: value.key().to_string(),
                message: "hidden values cannot be set".to_string(),
            });
        }
        value.set(raw)
    }

    /// Recompute every value into the data map
    ///
    /// Two passes, so a default may reference a value declared after it.
    pub fn refresh(&self) {
        for _ in 0..2 {
            for value in &self.values {
                value.get();
            }
        }
    }

    /// Prompt for every value that asks for it, in order
    pub fn prompt(&mut self, prompter: &dyn Prompter) -> Result<()> {
        self.refresh();
        for value in &mut self.values {
            if value.should_prompt() {
                value.prompt(prompter)?;
            } else {
                value.get();
            }
        }
        Ok(())
    }

    /// Validate every value, stopping at the first failure
    pub fn validate(&self) -> Result<()> {
        self.refresh();
        self.values.iter().try_for_each(Value::validate)
    }

    /// Flatten into a plain key to value map
    pub fn to_map(&self) -> Map<String, Json> {
        self.refresh();
        self.values
            .iter()
            .map(|v| (v.key().to_string(), v.get()))
            .collect()
    }
}

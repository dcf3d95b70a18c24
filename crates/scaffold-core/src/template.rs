//! Template rendering backed by handlebars
//!
//! Every template string in generator metadata (value defaults, paths, task
//! conditions, file contents) is rendered here against a JSON value map.

use crate::error::{Error, Result};
use handlebars::{handlebars_helper, no_escape, Handlebars};
use heck::{
    ToKebabCase, ToLowerCamelCase, ToShoutySnakeCase, ToSnakeCase, ToTitleCase, ToUpperCamelCase,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::LazyLock;

static RENDERER: LazyLock<Handlebars<'static>> = LazyLock::new(build_renderer);

handlebars_helper!(lower: |s: str| s.to_lowercase());
handlebars_helper!(upper: |s: str| s.to_uppercase());
handlebars_helper!(trim: |s: str| s.trim().to_string());
handlebars_helper!(snake: |s: str| s.to_snake_case());
handlebars_helper!(kebab: |s: str| s.to_kebab_case());
handlebars_helper!(camel: |s: str| s.to_lower_camel_case());
handlebars_helper!(pascal: |s: str| s.to_upper_camel_case());
handlebars_helper!(title: |s: str| s.to_title_case());
handlebars_helper!(constant: |s: str| s.to_shouty_snake_case());
handlebars_helper!(json: |v: Json| v.to_string());
handlebars_helper!(join: |items: array, sep: str| {
    items
        .iter()
        .map(|item| match item {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(sep)
});

fn build_renderer() -> Handlebars<'static> {
    let mut handlebars = Handlebars::new();
    // Generated files are source code, not HTML
    handlebars.register_escape_fn(no_escape);

    handlebars.register_helper("lower", Box::new(lower));
    handlebars.register_helper("upper", Box::new(upper));
    handlebars.register_helper("trim", Box::new(trim));
    handlebars.register_helper("snake", Box::new(snake));
    handlebars.register_helper("kebab", Box::new(kebab));
    handlebars.register_helper("camel", Box::new(camel));
    handlebars.register_helper("pascal", Box::new(pascal));
    handlebars.register_helper("title", Box::new(title));
    handlebars.register_helper("constant", Box::new(constant));
    handlebars.register_helper("json", Box::new(json));
    handlebars.register_helper("join", Box::new(join));

    handlebars
}

/// Render a template string against `data`
///
/// Strings without an opening `{{` are returned unchanged.
pub fn render<T: Serialize>(template: &str, data: &T) -> Result<String> {
    if !template.contains("{{") {
        return Ok(template.to_string());
    }
    RENDERER
        .render_template(template, data)
        .map_err(|e| Error::Render {
            template: template.to_string(),
            message: e.to_string(),
        })
}

/// Render every string inside a JSON value, keeping its structure
pub fn render_value<T: Serialize>(value: &Value, data: &T) -> Result<Value> {
    match value {
        Value::String(s) => Ok(Value::String(render(s, data)?)),
        Value::Array(items) => items
            .iter()
            .map(|item| render_value(item, data))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut rendered = serde_json::Map::new();
            for (key, item) in map {
                rendered.insert(key.clone(), render_value(item, data)?);
            }
            Ok(Value::Object(rendered))
        }
        other => Ok(other.clone()),
    }
}

/// Render a boolean condition
///
/// An empty rendering is false, so `{{#if flag}}true{{/if}}` works as a condition.
pub fn render_bool<T: Serialize>(template: &str, data: &T) -> Result<bool> {
    let rendered = render(template, data)?;
    let trimmed = rendered.trim();
    if trimmed.is_empty() {
        return Ok(false);
    }
    parse_bool(trimmed).ok_or_else(|| Error::Cast {
        kind: "bool",
        value: format!("{:?}", trimmed),
    })
}

/// Render a comma-separated list, trimming each item and dropping empty ones
pub fn render_list<T: Serialize>(template: &str, data: &T) -> Result<Vec<String>> {
    let rendered = render(template, data)?;
    Ok(split_list(&rendered))
}

/// Split a comma-separated string into trimmed, non-empty segments
pub fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse the usual spellings of a boolean
pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" | "on" => Some(true),
        "false" | "f" | "0" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

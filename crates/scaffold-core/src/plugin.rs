//! External plugins called by plugin tasks
//!
//! A plugin exchanges JSON with the engine: it receives the current value map
//! and returns a map of keys to merge back into it.

use crate::error::{Error, Result};
use crate::fs::{DST_PATH, SRC_PATH};
use serde_json::{Map, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Executable name prefix for process plugins
pub const PLUGIN_PREFIX: &str = "scaffold-plugin-";

/// Raw result of a plugin call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginResponse {
    /// Free-form diagnostics reported by the plugin
    pub meta: String,
    /// JSON-encoded output map
    pub output: Vec<u8>,
}

/// A loaded plugin
pub trait Plugin {
    fn name(&self) -> &str;

    fn call(&self, function: &str, input: &[u8]) -> Result<PluginResponse>;
}

/// Resolves plugin names to plugins
pub trait PluginLoader {
    fn load(&self, name: &str) -> Result<Box<dyn Plugin>>;
}

/// Call `function` with `values` and decode its output map
///
/// The output may not set the sandbox roots.
pub fn call_checked(
    plugin: &dyn Plugin,
    function: &str,
    values: &Map<String, Value>,
) -> Result<(String, Map<String, Value>)> {
    let input = serde_json::to_vec(values).map_err(|e| Error::plugin(plugin.name(), e))?;
    let response = plugin.call(function, &input)?;

    let output = if response.output.iter().all(u8::is_ascii_whitespace) {
        Map::new()
    } else {
        match serde_json::from_slice::<Value>(&response.output) {
            Ok(Value::Object(map)) => map,
            Ok(Value::Null) => Map::new(),
            Ok(other) => {
                return Err(Error::plugin(
                    plugin.name(),
                    format!("`{}` returned {} instead of an object", function, other),
                ))
            }
            Err(e) => {
                return Err(Error::plugin(
                    plugin.name(),
                    format!("`{}` returned invalid JSON: {}", function, e),
                ))
            }
        }
    };

    for forbidden in [SRC_PATH, DST_PATH] {
        if output.contains_key(forbidden) {
            return Err(Error::plugin(
                plugin.name(),
                format!("`{}` may not set `{}`", function, forbidden),
            ));
        }
    }

    Ok((response.meta, output))
}

/// Finds plugins as `scaffold-plugin-<name>` executables
///
/// Configured directories are searched first, then `PATH`.
#[derive(Debug, Clone, Default)]
pub struct ProcessPluginLoader {
    dirs: Vec<PathBuf>,
}

impl ProcessPluginLoader {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    fn find(&self, executable: &str) -> Option<PathBuf> {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let in_dirs = std::env::join_paths(self.dirs.iter().filter(|d| d.is_dir()))
            .ok()
            .and_then(|paths| which::which_in(executable, Some(paths), &cwd).ok());
        in_dirs.or_else(|| which::which(executable).ok())
    }
}

impl PluginLoader for ProcessPluginLoader {
    fn load(&self, name: &str) -> Result<Box<dyn Plugin>> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'));
        if !valid {
            return Err(Error::plugin(name, "invalid plugin name"));
        }

        let executable = format!("{}{}", PLUGIN_PREFIX, name);
        let path = self
            .find(&executable)
            .ok_or_else(|| Error::plugin(name, format!("executable `{}` not found", executable)))?;
        tracing::debug!(plugin = name, path = %path.display(), "loaded plugin");

        Ok(Box::new(ProcessPlugin {
            name: name.to_string(),
            path,
        }))
    }
}

/// A plugin run as a child process
///
/// Each call runs `<executable> <function>` with the input on stdin; stdout is
/// the output and stderr the call metadata.
#[derive(Debug, Clone)]
pub struct ProcessPlugin {
    name: String,
    path: PathBuf,
}

impl ProcessPlugin {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Plugin for ProcessPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, function: &str, input: &[u8]) -> Result<PluginResponse> {
        let mut child = Command::new(&self.path)
            .arg(function)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::plugin(&self.name, format!("failed to start: {}", e)))?;

        // Feed stdin from another thread while output is drained
        let writer = child.stdin.take().map(|mut stdin| {
            let input = input.to_vec();
            std::thread::spawn(move || stdin.write_all(&input))
        });

        let output = child
            .wait_with_output()
            .map_err(|e| Error::plugin(&self.name, e))?;

        if let Some(writer) = writer {
            match writer.join() {
                Ok(Ok(())) => {}
                // A plugin may exit without reading its input
                Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                Ok(Err(e)) => return Err(Error::plugin(&self.name, e)),
                Err(_) => return Err(Error::plugin(&self.name, "input writer panicked")),
            }
        }

        let meta = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            return Err(Error::plugin(
                &self.name,
                format!("`{}` exited with {}: {}", function, output.status, meta),
            ));
        }

        Ok(PluginResponse {
            meta,
            output: output.stdout,
        })
    }
}

//! Source and destination files used by tasks
//!
//! Both are built from templates and bound to a concrete path by
//! `set_values`, which renders the path against the current value map and
//! sandboxes it under `SrcPath` or `DstPath`.

use super::content::ContentType;
use super::sandbox;
use super::{DST_PATH, SRC_PATH};
use crate::error::{Error, IoContext, Result};
use crate::template;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use walkdir::WalkDir;

/// Permission bits for files created without an explicit mode
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// What to do when a destination already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Conflict {
    Keep,
    Replace,
    #[default]
    Prompt,
}

impl FromStr for Conflict {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "keep" => Ok(Conflict::Keep),
            "replace" => Ok(Conflict::Replace),
            "prompt" => Ok(Conflict::Prompt),
            other => Err(format!(
                "unknown conflict policy `{}` (expected keep, replace or prompt)",
                other
            )),
        }
    }
}

/// What to do when a destination does not exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Missing {
    #[default]
    Ignore,
    Error,
}

impl FromStr for Missing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ignore" => Ok(Missing::Ignore),
            "error" => Ok(Missing::Error),
            other => Err(format!(
                "unknown missing policy `{}` (expected ignore or error)",
                other
            )),
        }
    }
}

/// On-disk state of a resolved path
#[derive(Debug, Clone, Default)]
struct FileState {
    path: PathBuf,
    content_type: ContentType,
    exists: bool,
    is_dir: bool,
    mode: Option<u32>,
    bytes: Option<Vec<u8>>,
}

impl FileState {
    fn load(path: PathBuf, content_type: ContentType) -> Result<Self> {
        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self {
                    path,
                    content_type,
                    ..Self::default()
                });
            }
            Err(source) => {
                return Err(Error::Io {
                    op: "inspect",
                    path,
                    source,
                })
            }
        };

        let is_dir = metadata.is_dir();
        let bytes = if is_dir {
            None
        } else {
            Some(fs::read(&path).io_context("read", &path)?)
        };

        Ok(Self {
            mode: permission_bits(&metadata),
            path,
            content_type,
            exists: true,
            is_dir,
            bytes,
        })
    }

    fn content(&self) -> Result<Value> {
        match &self.bytes {
            Some(bytes) => self
                .content_type
                .decode(bytes)
                .map_err(|message| Error::Content {
                    content_type: self.content_type.as_str(),
                    path: self.path.clone(),
                    message,
                }),
            None => Ok(Value::Null),
        }
    }
}

/// A file or directory entry below a directory source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Path relative to the source directory, with `/` separators
    pub relative: String,
    pub is_dir: bool,
}

/// A file read by a task, sandboxed under `SrcPath`
#[derive(Debug, Clone)]
pub struct Source {
    path_template: String,
    type_template: Option<String>,
    file: FileState,
}

impl Source {
    pub fn new(path_template: impl Into<String>) -> Self {
        Self {
            path_template: path_template.into(),
            type_template: None,
            file: FileState::default(),
        }
    }

    /// Set an explicit content type template instead of inferring from the extension
    pub fn with_content_type(mut self, template: Option<String>) -> Self {
        self.type_template = template.filter(|t| !t.trim().is_empty());
        self
    }

    /// Render the path and content type, then read the file if it exists
    pub fn set_values(&mut self, values: &Map<String, Value>) -> Result<()> {
        let root = root_path(values, SRC_PATH)?;
        let rendered = template::render(&self.path_template, values)?;
        let path = sandbox::resolve(&root, &rendered)?;
        sandbox::reject_links(&root, &path)?;
        let content_type = resolve_content_type(self.type_template.as_deref(), &path, values)?;
        self.file = FileState::load(path, content_type)?;
        Ok(())
    }

    /// A source for a path inside this (directory) source
    pub fn child(&self, relative: &str) -> Result<Source> {
        let path = sandbox::resolve(&self.file.path, relative)?;
        sandbox::reject_links(&self.file.path, &path)?;
        let content_type = ContentType::infer(&path);
        Ok(Source {
            path_template: path.to_string_lossy().into_owned(),
            type_template: None,
            file: FileState::load(path, content_type)?,
        })
    }

    pub fn path(&self) -> &Path {
        &self.file.path
    }

    pub fn exists(&self) -> bool {
        self.file.exists
    }

    pub fn is_dir(&self) -> bool {
        self.file.is_dir
    }

    pub fn content_type(&self) -> ContentType {
        self.file.content_type
    }

    /// Raw file bytes, if the source is an existing file
    pub fn bytes(&self) -> Option<&[u8]> {
        self.file.bytes.as_deref()
    }

    /// File contents as text, if they are valid UTF-8
    pub fn text(&self) -> Option<&str> {
        self.bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    /// Decoded file contents
    pub fn content(&self) -> Result<Value> {
        self.file.content()
    }

    /// All entries below a directory source, parents before children
    ///
    /// Symlinks are skipped so a template tree cannot reach outside itself.
    pub fn entries(&self) -> Result<Vec<Entry>> {
        let root = &self.file.path;
        let mut entries = Vec::new();
        for entry in WalkDir::new(root)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = entry
                .map_err(std::io::Error::from)
                .io_context("walk", root)?;
            if entry.path_is_symlink() {
                tracing::warn!(path = %entry.path().display(), "skipping symlink in source tree");
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            entries.push(Entry {
                relative,
                is_dir: entry.file_type().is_dir(),
            });
        }
        Ok(entries)
    }
}

/// A file written by a task, sandboxed under `DstPath`
#[derive(Debug, Clone)]
pub struct Destination {
    path_template: String,
    type_template: Option<String>,
    mode_template: Option<String>,
    conflict: Conflict,
    missing: Missing,
    root: PathBuf,
    mode: Option<u32>,
    file: FileState,
}

impl Destination {
    pub fn new(path_template: impl Into<String>) -> Self {
        Self {
            path_template: path_template.into(),
            type_template: None,
            mode_template: None,
            conflict: Conflict::default(),
            missing: Missing::default(),
            root: PathBuf::new(),
            mode: None,
            file: FileState::default(),
        }
    }

    pub fn with_content_type(mut self, template: Option<String>) -> Self {
        self.type_template = template.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn with_mode(mut self, template: Option<String>) -> Self {
        self.mode_template = template.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn with_conflict(mut self, conflict: Conflict) -> Self {
        self.conflict = conflict;
        self
    }

    pub fn with_missing(mut self, missing: Missing) -> Self {
        self.missing = missing;
        self
    }

    /// Render path, content type and mode, then read the file if it exists
    pub fn set_values(&mut self, values: &Map<String, Value>) -> Result<()> {
        let root = root_path(values, DST_PATH)?;
        let rendered = template::render(&self.path_template, values)?;
        let path = sandbox::resolve(&root, &rendered)?;
        let content_type = resolve_content_type(self.type_template.as_deref(), &path, values)?;

        self.mode = match &self.mode_template {
            Some(template) => Some(parse_mode(&template::render(template, values)?)?),
            None => None,
        };
        self.root = sandbox::absolute(&root)?;
        self.file = FileState::load(path, content_type)?;
        Ok(())
    }

    /// A destination for a path inside this one, still sandboxed under the same root
    ///
    /// The child keeps the conflict policy and mode but infers its own content type.
    pub fn child(&self, relative: &str) -> Result<Destination> {
        let joined = self.file.path.join(relative);
        let path = sandbox::resolve(&self.root, &joined.to_string_lossy())?;
        let content_type = ContentType::infer(&path);
        Ok(Destination {
            path_template: path.to_string_lossy().into_owned(),
            type_template: None,
            mode_template: self.mode_template.clone(),
            conflict: self.conflict,
            missing: self.missing,
            root: self.root.clone(),
            mode: self.mode,
            file: FileState::load(path, content_type)?,
        })
    }

    pub fn path(&self) -> &Path {
        &self.file.path
    }

    pub fn exists(&self) -> bool {
        self.file.exists
    }

    pub fn is_dir(&self) -> bool {
        self.file.is_dir
    }

    pub fn content_type(&self) -> ContentType {
        self.file.content_type
    }

    pub fn conflict(&self) -> Conflict {
        self.conflict
    }

    pub fn missing(&self) -> Missing {
        self.missing
    }

    /// The explicitly configured mode, if any
    pub fn mode(&self) -> Option<u32> {
        self.mode
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        self.file.bytes.as_deref()
    }

    /// Decoded file contents
    pub fn content(&self) -> Result<Value> {
        self.file.content()
    }

    /// Encode `data` with the destination's content type and write it
    pub fn write(&mut self, data: &Value) -> Result<()> {
        let content_type = self.file.content_type;
        let bytes = content_type
            .encode(data)
            .map_err(|message| Error::Content {
                content_type: content_type.as_str(),
                path: self.file.path.clone(),
                message,
            })?;
        self.write_bytes(&bytes)
    }

    /// Write raw bytes, creating parent directories as needed
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let path = self.file.path.clone();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).io_context("create directory", parent)?;
        }
        fs::write(&path, bytes).io_context("write", &path)?;

        // An explicit mode wins, otherwise keep whatever mode the file had before
        let mode = self.mode.or(self.file.mode).unwrap_or(DEFAULT_FILE_MODE);
        set_permission_bits(&path, mode)?;

        self.file.exists = true;
        self.file.is_dir = false;
        self.file.mode = Some(mode);
        self.file.bytes = Some(bytes.to_vec());
        Ok(())
    }

    /// Create the destination as a directory
    pub fn create_dir(&mut self) -> Result<()> {
        fs::create_dir_all(&self.file.path).io_context("create directory", &self.file.path)?;
        self.file.exists = true;
        self.file.is_dir = true;
        self.file.bytes = None;
        Ok(())
    }

    /// Remove the destination file or directory tree
    ///
    /// The previous file mode is remembered so a rewrite keeps it.
    pub fn delete(&mut self) -> Result<()> {
        let path = &self.file.path;
        if self.file.is_dir {
            fs::remove_dir_all(path).io_context("delete", path)?;
        } else {
            fs::remove_file(path).io_context("delete", path)?;
        }
        self.file.exists = false;
        self.file.is_dir = false;
        self.file.bytes = None;
        Ok(())
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file.path.display())
    }
}

fn root_path(values: &Map<String, Value>, key: &str) -> Result<PathBuf> {
    match values.get(key) {
        Some(Value::String(root)) if !root.trim().is_empty() => Ok(PathBuf::from(root)),
        _ => Err(Error::construction(key, "sandbox root is not set")),
    }
}

fn resolve_content_type(
    template: Option<&str>,
    path: &Path,
    values: &Map<String, Value>,
) -> Result<ContentType> {
    let rendered = match template {
        Some(template) => template::render(template, values)?,
        None => String::new(),
    };
    if rendered.trim().is_empty() {
        return Ok(ContentType::infer(path));
    }
    rendered
        .parse::<ContentType>()
        .map_err(|message| Error::construction("content type", message))
}

/// Parse an octal permission string such as `755`, `0644` or `0o600`
pub fn parse_mode(s: &str) -> Result<u32> {
    let trimmed = s.trim();
    let digits = trimmed.strip_prefix("0o").unwrap_or(trimmed);
    match u32::from_str_radix(digits, 8) {
        Ok(mode) if mode <= 0o7777 => Ok(mode),
        _ => Err(Error::construction(
            "mode",
            format!("`{}` is not an octal permission mode", trimmed),
        )),
    }
}

#[cfg(unix)]
fn permission_bits(metadata: &fs::Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    Some(metadata.permissions().mode() & 0o7777)
}

#[cfg(not(unix))]
fn permission_bits(_metadata: &fs::Metadata) -> Option<u32> {
    None
}

#[cfg(unix)]
fn set_permission_bits(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).io_context("set mode of", path)
}

#[cfg(not(unix))]
fn set_permission_bits(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

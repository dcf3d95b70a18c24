//! Error types produced while loading and running generators.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by the generator engine.
///
/// The variants follow the life of a run: construction problems surface when a
/// generator is loaded, everything else while values are processed or tasks run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Invalid generator metadata (unknown type, missing field, bad enum value, bad rule syntax).
    #[error("invalid {field}: {message}")]
    Construction { field: String, message: String },

    /// A template failed to parse or render.
    #[error("failed to render template `{template}`: {message}")]
    Render { template: String, message: String },

    /// A value could not be converted to its declared data type.
    #[error("unable to cast {value} to {kind}")]
    Cast { kind: &'static str, value: String },

    /// A transform rule could not be applied.
    #[error("transform `{rule}` failed: {message}")]
    Transform { rule: &'static str, message: String },

    /// A value failed its validation rules.
    #[error("invalid value for `{key}`: {message}")]
    Validation { key: String, message: String },

    /// A value override referenced a key the generator does not declare.
    #[error("unknown value `{0}`")]
    UnknownValue(String),

    /// A rendered path resolved outside of its sandbox root.
    #[error("path `{path}` escapes root {}", root.display())]
    PathTraversal { path: String, root: PathBuf },

    /// A path that must exist does not.
    #[error("path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    /// A file-system operation failed.
    #[error("failed to {op} {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File content could not be decoded or encoded with its content type.
    #[error("invalid {content_type} content in {}: {message}", path.display())]
    Content {
        content_type: &'static str,
        path: PathBuf,
        message: String,
    },

    /// The merge engine was asked to combine incompatible kinds.
    #[error("cannot {action} {arg} to {subject}")]
    Merge {
        action: &'static str,
        subject: &'static str,
        arg: &'static str,
    },

    /// A generator could not be found in the store.
    #[error("generator `{0}` not found")]
    GeneratorNotFound(String),

    /// A plugin could not be loaded or its call failed.
    #[error("plugin `{plugin}` failed: {message}")]
    Plugin { plugin: String, message: String },

    /// The interactive prompter failed or was cancelled.
    #[error("prompt failed: {0}")]
    Prompt(String),
}

impl Error {
    pub(crate) fn construction(field: impl Into<String>, message: impl ToString) -> Self {
        Self::Construction {
            field: field.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn plugin(plugin: impl Into<String>, message: impl ToString) -> Self {
        Self::Plugin {
            plugin: plugin.into(),
            message: message.to_string(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Attach the failing operation and path to an [`std::io::Error`].
pub(crate) trait IoContext<T> {
    fn io_context(self, op: &'static str, path: &Path) -> Result<T>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn io_context(self, op: &'static str, path: &Path) -> Result<T> {
        self.map_err(|source| Error::Io {
            op,
            path: path.to_path_buf(),
            source,
        })
    }
}

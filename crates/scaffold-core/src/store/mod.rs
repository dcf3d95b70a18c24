//! Generator packages and where they are loaded from
//!
//! This module provides:
//! - `Metadata`, the parsed `generator.yaml`
//! - The `Store` lookup trait and the directory-backed `DirStore`
//! - Installation, removal and packing of generators (`install`)

pub mod install;
pub mod metadata;

pub use metadata::{Metadata, MANIFEST_FILES};

use crate::error::{Error, IoContext, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A loaded generator package
#[derive(Debug, Clone)]
pub struct Package {
    name: String,
    path: PathBuf,
    pub metadata: Metadata,
}

impl Package {
    pub fn new(name: impl Into<String>, path: &Path, metadata: Metadata) -> Self {
        Self {
            name: name.into(),
            path: path.to_path_buf(),
            metadata,
        }
    }

    /// Load the package rooted at `path`
    pub fn from_dir(name: impl Into<String>, path: &Path) -> Result<Self> {
        let name = name.into();
        let manifest = find_manifest(path).ok_or_else(|| Error::GeneratorNotFound(name.clone()))?;
        let text = std::fs::read_to_string(&manifest).io_context("read", &manifest)?;
        let metadata = Metadata::parse(&text, &manifest)?;
        Ok(Self::new(name, path, metadata))
    }

    /// Store name, e.g. `api/handler`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Package directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sub-generators: direct subdirectories holding their own manifest
    pub fn children(&self) -> Result<Vec<Package>> {
        let mut children = Vec::new();
        let entries = std::fs::read_dir(&self.path).io_context("read directory", &self.path)?;
        for entry in entries {
            let entry = entry.io_context("read directory", &self.path)?;
            let path = entry.path();
            if !path.is_dir() || find_manifest(&path).is_none() {
                continue;
            }
            let dir_name = entry.file_name().to_string_lossy().into_owned();
            children.push(Package::from_dir(format!("{}/{}", self.name, dir_name), &path)?);
        }
        children.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(children)
    }
}

/// Lookup of generator packages by name
pub trait Store {
    fn load(&self, name: &str) -> Result<Package>;
}

/// Generators stored as directories under a root
///
/// Slash-separated names address nested directories, so `api/handler` is
/// `<root>/api/handler/generator.yaml`.
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory a generator name maps to
    pub fn path_for(&self, name: &str) -> Result<PathBuf> {
        let segments = validate_name(name)?;
        Ok(segments.iter().fold(self.root.clone(), |path, s| path.join(s)))
    }

    /// Every installed generator, including nested ones, sorted by name
    pub fn list(&self) -> Result<Vec<Package>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut packages = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| Error::Io {
                op: "walk",
                path: self.root.clone(),
                source: e.into(),
            })?;
            if !entry.file_type().is_dir() || find_manifest(entry.path()).is_none() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            match Package::from_dir(name.clone(), entry.path()) {
                Ok(package) => packages.push(package),
                Err(e) => tracing::warn!(generator = %name, error = %e, "skipping unreadable generator"),
            }
        }
        Ok(packages)
    }
}

impl Store for DirStore {
    fn load(&self, name: &str) -> Result<Package> {
        let path = self.path_for(name)?;
        tracing::debug!(generator = name, path = %path.display(), "loading generator");
        if !path.is_dir() {
            return Err(Error::GeneratorNotFound(name.to_string()));
        }
        Package::from_dir(name, &path)
    }
}

/// Split a generator name into path segments, rejecting anything that could escape the root
pub fn validate_name(name: &str) -> Result<Vec<&str>> {
    let segments: Vec<&str> = name.trim().trim_matches('/').split('/').collect();
    let valid = segments.iter().all(|s| {
        !s.is_empty()
            && *s != "."
            && *s != ".."
            && s.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    });
    if valid {
        Ok(segments)
    } else {
        Err(Error::construction(
            "generator",
            format!("`{}` is not a valid generator name", name),
        ))
    }
}

pub(crate) fn find_manifest(dir: &Path) -> Option<PathBuf> {
    MANIFEST_FILES
        .iter()
        .map(|file| dir.join(file))
        .find(|path| path.is_file())
}

//! Generator installation from local directories or zip archives
//!
//! Both sources end up as a plain directory under the store root:
//! - Local: the directory tree is copied file by file
//! - Remote: a zip is downloaded over http(s) and extracted
//!
//! `pack` builds the zip format that remote installation consumes.

use super::{find_manifest, DirStore, MANIFEST_FILES};
use anyhow::{Context, Result};
use std::io::{Cursor, Read, Write};
use std::path::{Component, Path, PathBuf};
use url::Url;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// Where a generator is installed from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallSource {
    Remote(Url),
    Local(PathBuf),
}

impl InstallSource {
    /// Interpret a CLI argument: http(s) URLs are remote, anything else a path
    pub fn parse(source: &str) -> Self {
        match Url::parse(source) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Self::Remote(url),
            _ => Self::Local(PathBuf::from(source)),
        }
    }

    /// Name derived from the source: the directory name or the archive file stem
    pub fn default_name(&self) -> Option<String> {
        let name = match self {
            Self::Remote(url) => url
                .path_segments()
                .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
                .map(|s| s.trim_end_matches(".zip").to_string()),
            Self::Local(path) => crate::fs::sandbox::absolute(path)
                .ok()
                .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned())),
        };
        name.filter(|n| !n.is_empty())
    }
}

/// Install a generator into the store, returning its directory
pub async fn install(store: &DirStore, source: &str, name: Option<&str>) -> Result<PathBuf> {
    let source = InstallSource::parse(source);
    let name = match name {
        Some(name) => name.to_string(),
        None => source
            .default_name()
            .context("Cannot derive a generator name from the source, pass --name")?,
    };
    let target = store.path_for(&name)?;
    if target.exists() {
        anyhow::bail!(
            "Generator '{}' is already installed at {}",
            name,
            target.display()
        );
    }

    let populated = match &source {
        InstallSource::Remote(url) => {
            let bytes = download(url).await?;
            extract_archive(&bytes, &target)
        }
        InstallSource::Local(path) => copy_dir(path, &target),
    };
    if let Err(e) = populated {
        discard(&target);
        return Err(e);
    }

    if find_manifest(&target).is_none() {
        discard(&target);
        anyhow::bail!("Source does not contain a {} file", MANIFEST_FILES[0]);
    }

    tracing::debug!(generator = %name, path = %target.display(), "installed generator");
    Ok(target)
}

/// Remove a partially installed target, reporting leftovers
fn discard(target: &Path) {
    if !target.exists() {
        return;
    }
    if let Err(e) = std::fs::remove_dir_all(target) {
        tracing::warn!(path = %target.display(), error = %e, "failed to remove partial install");
    }
}

async fn download(url: &Url) -> Result<Vec<u8>> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("scaffold/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new());

    let response = client
        .get(url.clone())
        .send()
        .await
        .with_context(|| format!("Failed to fetch generator archive from {}", url))?;

    if !response.status().is_success() {
        anyhow::bail!(
            "Failed to fetch generator archive from {}: HTTP {}",
            url,
            response.status()
        );
    }

    Ok(response.bytes().await?.to_vec())
}

/// Copy a generator directory tree into `target`
pub fn copy_dir(source: &Path, target: &Path) -> Result<()> {
    if find_manifest(source).is_none() {
        anyhow::bail!(
            "{} is not a generator directory (no {} found)",
            source.display(),
            MANIFEST_FILES[0]
        );
    }

    for entry in WalkDir::new(source).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", source.display()))?;
        let relative = entry.path().strip_prefix(source)?;
        let destination = target.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&destination)
                .with_context(|| format!("Failed to create directory: {}", destination.display()))?;
        } else {
            std::fs::copy(entry.path(), &destination)
                .with_context(|| format!("Failed to copy file: {}", entry.path().display()))?;
        }
    }
    Ok(())
}

/// Extract a generator zip into `target`
///
/// A single top-level directory wrapping the manifest is stripped, so archives
/// made by `pack` and archives of a bare directory both install the same way.
pub fn extract_archive(zip_bytes: &[u8], target: &Path) -> Result<()> {
    let mut archive =
        ZipArchive::new(Cursor::new(zip_bytes)).context("Failed to read generator archive")?;

    let names: Vec<PathBuf> = (0..archive.len())
        .filter_map(|i| archive.by_index(i).ok().and_then(|f| f.enclosed_name()))
        .collect();
    let prefix = common_prefix(&names);

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let Some(enclosed) = file.enclosed_name() else {
            tracing::warn!(entry = file.name(), "skipping archive entry outside of the target");
            continue;
        };
        let relative = match &prefix {
            Some(prefix) => match enclosed.strip_prefix(prefix) {
                Ok(rest) => rest.to_path_buf(),
                Err(_) => enclosed.clone(),
            },
            None => enclosed.clone(),
        };
        if relative.as_os_str().is_empty() {
            continue;
        }
        let destination = target.join(&relative);

        if file.is_dir() {
            std::fs::create_dir_all(&destination)
                .with_context(|| format!("Failed to create directory: {}", destination.display()))?;
            continue;
        }
        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let mut contents = Vec::new();
        file.read_to_end(&mut contents)?;
        std::fs::write(&destination, &contents)
            .with_context(|| format!("Failed to write file: {}", destination.display()))?;

        #[cfg(unix)]
        if let Some(mode) = file.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&destination, std::fs::Permissions::from_mode(mode & 0o7777))
                .with_context(|| format!("Failed to set permissions on {}", destination.display()))?;
        }
    }
    Ok(())
}

/// Top-level directory shared by every entry, unless a manifest sits at the archive root
fn common_prefix(names: &[PathBuf]) -> Option<PathBuf> {
    if names
        .iter()
        .any(|n| MANIFEST_FILES.iter().any(|m| n.as_path() == Path::new(m)))
    {
        return None;
    }
    let first = match names.first()?.components().next()? {
        Component::Normal(first) => PathBuf::from(first),
        _ => return None,
    };
    names
        .iter()
        .all(|n| n.starts_with(&first))
        .then_some(first)
}

/// Remove an installed generator
pub fn uninstall(store: &DirStore, name: &str) -> Result<PathBuf> {
    let target = store.path_for(name)?;
    if find_manifest(&target).is_none() {
        anyhow::bail!("Generator '{}' is not installed", name);
    }
    std::fs::remove_dir_all(&target)
        .with_context(|| format!("Failed to remove {}", target.display()))?;
    Ok(target)
}

/// Build a distributable zip of a generator directory
///
/// Entries are stored under `<name>/` with their permission bits.
pub fn build_zip(dir: &Path, name: &str) -> Result<Vec<u8>> {
    if find_manifest(dir).is_none() {
        anyhow::bail!(
            "{} is not a generator directory (no {} found)",
            dir.display(),
            MANIFEST_FILES[0]
        );
    }

    let mut zip_buffer = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut zip_buffer));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        for entry in WalkDir::new(dir).min_depth(1).sort_by_file_name() {
            let entry = entry.with_context(|| format!("Failed to walk {}", dir.display()))?;
            let relative = entry
                .path()
                .strip_prefix(dir)?
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let zip_path = format!("{}/{}", name, relative);

            if entry.file_type().is_dir() {
                zip.add_directory(zip_path.as_str(), options)?;
                continue;
            }

            let content = std::fs::read(entry.path())
                .with_context(|| format!("Failed to read {}", entry.path().display()))?;
            zip.start_file(zip_path.as_str(), options.unix_permissions(file_mode(entry.path())))?;
            zip.write_all(&content)?;
        }

        zip.finish()?;
    }

    Ok(zip_buffer)
}

/// Write `build_zip` output to `out`, defaulting to `<name>.zip` in the current directory
pub fn pack(dir: &Path, out: Option<&Path>) -> Result<(PathBuf, usize)> {
    let name = InstallSource::Local(dir.to_path_buf())
        .default_name()
        .context("Cannot derive a generator name from the directory")?;
    let zip_bytes = build_zip(dir, &name)?;
    let zip_path = out
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(format!("{}.zip", name)));
    std::fs::write(&zip_path, &zip_bytes)
        .with_context(|| format!("Failed to write {}", zip_path.display()))?;
    Ok((zip_path, zip_bytes.len()))
}

#[cfg(unix)]
fn file_mode(path: &Path) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o7777)
        .unwrap_or(0o644)
}

#[cfg(not(unix))]
fn file_mode(_path: &Path) -> u32 {
    0o644
}

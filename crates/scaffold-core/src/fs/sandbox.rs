//! Path sandboxing
//!
//! Rendered paths are joined to a root and normalized lexically. A path whose
//! normalized form is not inside the normalized root is rejected.

use crate::error::{Error, IoContext, Result};
use std::path::{Component, Path, PathBuf};

/// Resolve `rendered` against `root`, refusing anything that escapes it
pub fn resolve(root: &Path, rendered: &str) -> Result<PathBuf> {
    if rendered.trim().is_empty() {
        return Err(Error::construction("path", "path renders to an empty string"));
    }

    let root = absolute(root)?;
    let candidate = Path::new(rendered);
    let joined = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        root.join(candidate)
    };
    let resolved = normalize(&joined);

    if !resolved.starts_with(&root) {
        return Err(Error::PathTraversal {
            path: rendered.to_string(),
            root,
        });
    }
    Ok(resolved)
}

/// Refuse `path` when it or any directory between it and `root` is a symlink
///
/// Both paths must already be resolved. The root itself may be a link.
pub fn reject_links(root: &Path, path: &Path) -> Result<()> {
    let root = absolute(root)?;
    for ancestor in path.ancestors() {
        if ancestor == root || !ancestor.starts_with(&root) {
            break;
        }
        let is_link = std::fs::symlink_metadata(ancestor)
            .map(|metadata| metadata.file_type().is_symlink())
            .unwrap_or(false);
        if is_link {
            return Err(Error::PathTraversal {
                path: path.to_string_lossy().into_owned(),
                root,
            });
        }
    }
    Ok(())
}

/// Make `path` absolute against the current directory and normalize it
pub fn absolute(path: &Path) -> Result<PathBuf> {
    let abs = std::path::absolute(path).io_context("resolve", path)?;
    Ok(normalize(&abs))
}

/// Lexically remove `.` and `..` components
///
/// `..` never climbs above the filesystem root.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                let at_root = matches!(
                    out.components().next_back(),
                    None | Some(Component::RootDir) | Some(Component::Prefix(_))
                );
                if at_root {
                    if !out.has_root() {
                        out.push("..");
                    }
                } else if out.ends_with("..") {
                    out.push("..");
                } else {
                    out.pop();
                }
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path_resolves_under_root() {
        let resolved = resolve(Path::new("/work/project"), "src/./main.rs").unwrap();
        assert_eq!(resolved, PathBuf::from("/work/project/src/main.rs"));
    }

    #[test]
    fn test_inner_parent_segments_are_allowed() {
        let resolved = resolve(Path::new("/work/project"), "src/../README.md").unwrap();
        assert_eq!(resolved, PathBuf::from("/work/project/README.md"));
    }

    #[test]
    fn test_traversal_is_rejected() {
        for path in ["../outside", "src/../../outside", "../project-evil/x", "/etc/passwd"] {
            let err = resolve(Path::new("/work/project"), path).unwrap_err();
            assert!(
                matches!(err, Error::PathTraversal { .. }),
                "expected traversal error for {}",
                path
            );
        }
    }

    #[test]
    fn test_absolute_path_inside_root_is_allowed() {
        let resolved = resolve(Path::new("/work/project"), "/work/project/a.txt").unwrap();
        assert_eq!(resolved, PathBuf::from("/work/project/a.txt"));
    }

    #[test]
    fn test_root_itself_resolves() {
        let resolved = resolve(Path::new("/work/project/"), ".").unwrap();
        assert_eq!(resolved, PathBuf::from("/work/project"));
    }

    #[test]
    fn test_empty_path_is_rejected() {
        assert!(matches!(
            resolve(Path::new("/work"), "  "),
            Err(Error::Construction { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_links_below_root_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let root = tmp.path().join("root");
        std::fs::create_dir_all(root.join("plain")).unwrap();
        std::os::unix::fs::symlink(outside.path(), root.join("linked")).unwrap();

        let linked = resolve(&root, "linked/secret.txt").unwrap();
        assert!(matches!(
            reject_links(&root, &linked),
            Err(Error::PathTraversal { .. })
        ));
        assert!(reject_links(&root, &resolve(&root, "plain/a.txt").unwrap()).is_ok());
        assert!(reject_links(&root, &resolve(&root, "missing.txt").unwrap()).is_ok());
    }

    #[test]
    fn test_normalize_does_not_climb_above_root() {
        assert_eq!(normalize(Path::new("/../a/./b/..")), PathBuf::from("/a"));
        assert_eq!(normalize(Path::new("a/../../b")), PathBuf::from("../b"));
    }
}

//! Scaffold home directory and the locations derived from it

use crate::error::{Error, Result};
use crate::plugin::ProcessPluginLoader;
use crate::store::DirStore;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Environment variable overriding the scaffold home directory
pub const HOME_ENV: &str = "SCAFFOLD_HOME";

/// Environment variable holding the `tracing` filter for diagnostics
pub const LOG_ENV: &str = "SCAFFOLD_LOG";

/// Home directory name under the user's home when nothing else is configured
pub const DEFAULT_HOME_DIR: &str = ".scaffold";

/// Resolved locations for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    home: PathBuf,
}

impl Settings {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    /// Resolve the home directory: `flag`, else `$SCAFFOLD_HOME`, else `~/.scaffold`
    pub fn resolve(flag: Option<&Path>) -> Result<Self> {
        Self::resolve_from(flag, std::env::var_os(HOME_ENV), dirs::home_dir())
    }

    fn resolve_from(
        flag: Option<&Path>,
        env: Option<OsString>,
        user_home: Option<PathBuf>,
    ) -> Result<Self> {
        let configured = flag
            .map(|p| p.as_os_str().to_os_string())
            .or(env)
            .filter(|s| !s.is_empty());

        let home = match configured {
            Some(raw) => expand(&raw),
            None => user_home
                .map(|home| home.join(DEFAULT_HOME_DIR))
                .ok_or_else(|| {
                    Error::construction(
                        "home",
                        format!("cannot determine the user home directory; set {}", HOME_ENV),
                    )
                })?,
        };
        tracing::debug!(home = %home.display(), "resolved scaffold home");
        Ok(Self::new(home))
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Installed generators live here
    pub fn generators_dir(&self) -> PathBuf {
        self.home.join("generators")
    }

    /// Searched for plugin executables before `PATH`
    pub fn plugins_dir(&self) -> PathBuf {
        self.home.join("plugins")
    }

    pub fn store(&self) -> DirStore {
        DirStore::new(self.generators_dir())
    }

    pub fn plugin_loader(&self) -> ProcessPluginLoader {
        ProcessPluginLoader::new(vec![self.plugins_dir()])
    }
}

fn expand(raw: &OsString) -> PathBuf {
    let text = raw.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&text).into_owned())
}

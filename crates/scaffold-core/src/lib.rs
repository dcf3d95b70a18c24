//! Scaffold Core - Engine for running project generators
//!
//! A generator is a directory holding a `generator.yaml` manifest plus file
//! templates. The engine loads it, asks for its typed input values and runs its
//! task list against a destination directory.
//!
//! # Architecture
//!
//! The library is organized into layers:
//!
//! - **Layer 1: Building blocks** - Merge engine, template rendering, sandboxed source and destination files
//! - **Layer 2: Values and tasks** - `ValueSet` pipeline (render, cast, transform, validate, prompt) and the `TaskSet` interpreter
//! - **Layer 3: Generators** - `Generator` assembly from a `Store`, plus store adapters and process plugins
//! - **Layer 4: CLI/TUI Interface** - Optional cliclack-based prompts (feature-gated)
//!
//! # Feature Flags
//!
//! - `tui` (default): Enables the cliclack-based prompter and run flow
//!
//! # Example Usage (without TUI)
//!
//! ```ignore
//! use scaffold_core::{ConsoleLogger, DefaultsPrompter, Generator, RunContext, Settings};
//!
//! let settings = Settings::resolve(None)?;
//! let store = settings.store();
//! let plugins = settings.plugin_loader();
//! let logger = ConsoleLogger::new(false);
//! let ctx = RunContext::new(&logger, &DefaultsPrompter, &store, &plugins);
//!
//! let mut generator = Generator::load(&store, "rust/cli")?;
//! generator.run(&ctx, &["./my-tool".to_string()], &[])?;
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod fs;
pub mod generator;
pub mod logger;
pub mod merge;
pub mod plugin;
pub mod prompt;
pub mod store;
pub mod task;
pub mod template;
pub mod value;
pub mod version;

#[cfg(feature = "tui")]
pub mod tui;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use config::Settings;
pub use context::RunContext;
pub use error::{Error, Result};
pub use generator::Generator;
pub use logger::{ConsoleLogger, FileAction, Logger};
pub use merge::{modify, Action, MergeConfig, MergeType};
pub use plugin::{Plugin, PluginLoader, ProcessPluginLoader};
pub use prompt::{DefaultsPrompter, Prompter};
pub use store::{DirStore, Metadata, Package, Store};
pub use task::{Task, TaskSet};
pub use value::{DataType, Value, ValueSet};

#[cfg(feature = "tui")]
pub use tui::run;

/// Engine version - used for generator `requires` checks
pub const VERSION: &str = version::ENGINE_VERSION;

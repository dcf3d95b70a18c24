//! Interactive front end using cliclack (Charm-style inline prompts)
//!
//! This module is optional and only available when the `tui` feature is enabled.

#[cfg(feature = "tui")]
mod prompts;

#[cfg(feature = "tui")]
pub use prompts::{install_terminal_guards, restore_cursor, run, CliclackPrompter, NewArgs};

//! User-facing action log

use colored::Colorize;
use std::fmt;
use std::path::Path;

/// What happened to a destination path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    Create,
    Replace,
    Keep,
    Delete,
    Update,
    Skip,
    Mkdir,
}

impl FileAction {
    pub fn as_str(self) -> &'static str {
        match self {
            FileAction::Create => "create",
            FileAction::Replace => "replace",
            FileAction::Keep => "keep",
            FileAction::Delete => "delete",
            FileAction::Update => "update",
            FileAction::Skip => "skip",
            FileAction::Mkdir => "mkdir",
        }
    }
}

impl fmt::Display for FileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receiver of action and status lines during a run
pub trait Logger {
    fn action(&self, action: FileAction, path: &Path);
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
}

/// Colored terminal output
#[derive(Debug, Clone, Default)]
pub struct ConsoleLogger {
    dry_run: bool,
}

impl ConsoleLogger {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    fn prefix(&self) -> String {
        if self.dry_run {
            format!("{} ", "(dry run)".dimmed())
        } else {
            String::new()
        }
    }
}

impl Logger for ConsoleLogger {
    fn action(&self, action: FileAction, path: &Path) {
        let label = format!("{:>8}", action.as_str());
        let label = match action {
            FileAction::Create | FileAction::Mkdir => label.green(),
            FileAction::Replace | FileAction::Update => label.yellow(),
            FileAction::Delete => label.red(),
            FileAction::Keep | FileAction::Skip => label.blue(),
        };
        println!("  {}{} {}", self.prefix(), label.bold(), path.display());
    }

    fn info(&self, message: &str) {
        println!("  {}{} {}", self.prefix(), "->".blue(), message);
    }

    fn warn(&self, message: &str) {
        eprintln!("  {}{} {}", self.prefix(), "Warning:".yellow(), message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_names() {
        assert_eq!(FileAction::Replace.to_string(), "replace");
        assert_eq!(FileAction::Mkdir.as_str(), "mkdir");
    }
}

//! Per-run configuration shared by every task

use crate::logger::Logger;
use crate::plugin::PluginLoader;
use crate::prompt::Prompter;
use crate::store::Store;

/// Collaborators and switches for one generator run
///
/// Carries configuration only; a run is never cancelled from here.
#[derive(Clone, Copy)]
pub struct RunContext<'a> {
    /// Report and prompt as usual but leave the file system untouched
    pub dry_run: bool,
    pub logger: &'a dyn Logger,
    pub prompter: &'a dyn Prompter,
    pub store: &'a dyn Store,
    pub plugins: &'a dyn PluginLoader,
    /// Sub-generator nesting level, zero for the generator being run
    pub depth: usize,
}

impl<'a> RunContext<'a> {
    pub fn new(
        logger: &'a dyn Logger,
        prompter: &'a dyn Prompter,
        store: &'a dyn Store,
        plugins: &'a dyn PluginLoader,
    ) -> Self {
        Self {
            dry_run: false,
            logger,
            prompter,
            store,
            plugins,
            depth: 0,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Context for a sub-generator invoked from this one
    pub fn nested(self) -> Self {
        Self {
            depth: self.depth + 1,
            ..self
        }
    }
}

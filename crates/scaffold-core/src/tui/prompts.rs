//! Charm-style CLI prompts using cliclack

use crate::config::Settings;
use crate::context::RunContext;
use crate::error::{Error, Result as CoreResult};
use crate::fs::DST_PATH;
use crate::generator::Generator;
use crate::logger::ConsoleLogger;
use crate::prompt::{DefaultsPrompter, Prompter, Validator};
use anyhow::Result;
use serde_json::Value;

/// Arguments for generating a project
#[derive(Debug, Clone, Default)]
pub struct NewArgs {
    /// Generator name in the store
    pub generator: String,

    /// Positional arguments, bound to `arg` values in order
    pub args: Vec<String>,

    /// `KEY=VALUE` overrides addressed by key or flag name
    pub overrides: Vec<(String, Value)>,

    /// Report actions without touching the file system
    pub dry_run: bool,

    /// Accept every default instead of prompting (non-interactive mode)
    pub yes: bool,
}

/// Restore the terminal cursor hidden by an interrupted prompt
pub fn restore_cursor() {
    let _ = console::Term::stderr().show_cursor();
}

/// Make sure the cursor comes back on panic and on Ctrl+C
pub fn install_terminal_guards() {
    let default_panic = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        restore_cursor();
        default_panic(info);
    }));

    ctrlc::set_handler(move || {
        restore_cursor();
        std::process::exit(130);
    })
    .ok();
}

/// Load a generator, ask for its values and run it
pub fn run(settings: &Settings, args: NewArgs) -> Result<()> {
    cliclack::intro(format!("scaffold {}", args.generator))?;

    let store = settings.store();
    let plugins = settings.plugin_loader();

    let spinner = cliclack::spinner();
    spinner.start("Loading generator...");
    let mut generator = match Generator::load(&store, &args.generator) {
        Ok(generator) => {
            let metadata = &generator.package().metadata;
            let title = metadata.name().unwrap_or(&args.generator);
            if metadata.description().is_empty() {
                spinner.stop(format!("Generator: {}", title));
            } else {
                spinner.stop(format!("Generator: {} - {}", title, metadata.description()));
            }
            generator
        }
        Err(e) => {
            spinner.stop("Failed to load generator");
            return Err(e.into());
        }
    };

    let logger = ConsoleLogger::new(args.dry_run);
    let interactive = CliclackPrompter;
    let defaults = DefaultsPrompter;
    let prompter: &dyn Prompter = if args.yes {
        cliclack::log::info("Using defaults for every value (--yes mode)")?;
        &defaults
    } else {
        &interactive
    };
    let ctx = RunContext::new(&logger, prompter, &store, &plugins).with_dry_run(args.dry_run);

    let values = generator.run(&ctx, &args.args, &args.overrides)?;

    if args.dry_run {
        cliclack::outro("Dry run finished, nothing was written")?;
    } else {
        let dst = values
            .get(DST_PATH)
            .map(crate::value::display)
            .unwrap_or_else(|| ".".to_string());
        cliclack::outro(format!("Generated into {}", dst))?;
    }
    Ok(())
}

/// Asks questions on the terminal
///
/// cliclack validators must be `'static`, so answers are checked after the
/// prompt returns and the question is asked again on failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct CliclackPrompter;

fn prompt_error(e: std::io::Error) -> Error {
    Error::Prompt(e.to_string())
}

fn show_help(help: &str) -> CoreResult<()> {
    if help.is_empty() {
        return Ok(());
    }
    cliclack::log::remark(help).map_err(prompt_error)
}

/// Keep asking until `validate` accepts the answer
fn until_valid<T>(
    validate: Validator<'_>,
    as_value: impl Fn(&T) -> Value,
    mut ask: impl FnMut() -> std::io::Result<T>,
) -> CoreResult<T> {
    loop {
        let answer = ask().map_err(prompt_error)?;
        match validate(&as_value(&answer)) {
            Ok(()) => return Ok(answer),
            Err(message) => cliclack::log::error(message).map_err(prompt_error)?,
        }
    }
}

impl Prompter for CliclackPrompter {
    fn confirm(&self, prompt: &str, default: bool, help: &str) -> CoreResult<bool> {
        show_help(help)?;
        cliclack::confirm(prompt)
            .initial_value(default)
            .interact()
            .map_err(prompt_error)
    }

    fn input(
        &self,
        prompt: &str,
        default: &str,
        help: &str,
        validate: Validator<'_>,
    ) -> CoreResult<String> {
        show_help(help)?;
        until_valid(
            validate,
            |answer: &String| Value::String(answer.clone()),
            || {
                cliclack::input(prompt)
                    .placeholder(default)
                    .default_input(default)
                    .required(false)
                    .interact()
            },
        )
    }

    fn select(
        &self,
        prompt: &str,
        options: &[String],
        default: Option<&str>,
        help: &str,
        validate: Validator<'_>,
    ) -> CoreResult<String> {
        show_help(help)?;
        until_valid(
            validate,
            |answer: &String| Value::String(answer.clone()),
            || {
                let mut select = cliclack::select(prompt);
                for option in options {
                    select = select.item(option.clone(), option, "");
                }
                if let Some(default) = default {
                    select = select.initial_value(default.to_string());
                }
                select.interact()
            },
        )
    }

    fn multi_select(
        &self,
        prompt: &str,
        options: &[String],
        defaults: &[String],
        help: &str,
        validate: Validator<'_>,
    ) -> CoreResult<Vec<String>> {
        show_help(help)?;
        until_valid(
            validate,
            |answer: &Vec<String>| Value::Array(answer.iter().cloned().map(Value::String).collect()),
            || {
                let mut multi = cliclack::multiselect(prompt);
                for option in options {
                    multi = multi.item(option.clone(), option, "");
                }
                multi.initial_values(defaults.to_vec()).required(false).interact()
            },
        )
    }
}

//! scaffold CLI - Generate projects from installed generators

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use scaffold_core::config::LOG_ENV;
use scaffold_core::store::install;
use scaffold_core::tui::{self, NewArgs};
use scaffold_core::Settings;
use serde_json::Value;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "scaffold")]
#[command(about = "CLI for generating projects from installed generators")]
#[command(version)]
pub struct Args {
    /// Scaffold home directory (defaults to $SCAFFOLD_HOME, then ~/.scaffold)
    #[arg(long, global = true)]
    pub home: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate files from an installed generator
    New(CliNewArgs),
    /// List installed generators
    List,
    /// Install a generator from a local directory or a zip archive URL
    Install(InstallArgs),
    /// Remove an installed generator
    Uninstall(UninstallArgs),
    /// Build a distributable zip of a generator directory (for development use)
    Pack(PackArgs),
}

#[derive(Parser, Debug)]
pub struct CliNewArgs {
    /// Generator name, e.g. `rust/cli`
    pub generator: String,

    /// Positional values, usually the destination directory
    pub args: Vec<String>,

    /// Set a value by key or flag name (repeatable)
    #[arg(short, long = "set", value_name = "KEY=VALUE", value_parser = parse_override)]
    pub set: Vec<(String, Value)>,

    /// Show what would be done without writing anything
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Accept defaults for every value (non-interactive mode)
    #[arg(short, long)]
    pub yes: bool,
}

impl From<CliNewArgs> for NewArgs {
    fn from(args: CliNewArgs) -> Self {
        NewArgs {
            generator: args.generator,
            args: args.args,
            overrides: args.set,
            dry_run: args.dry_run,
            yes: args.yes,
        }
    }
}

#[derive(Parser, Debug)]
pub struct InstallArgs {
    /// Local generator directory or http(s) URL of a zip archive
    pub source: String,

    /// Name to install under (defaults to the directory or archive name)
    #[arg(short, long)]
    pub name: Option<String>,
}

#[derive(Parser, Debug)]
pub struct UninstallArgs {
    /// Installed generator name
    pub name: String,
}

#[derive(Parser, Debug)]
pub struct PackArgs {
    /// Generator directory to pack
    pub dir: PathBuf,

    /// Output archive path (defaults to `<dir>.zip`)
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

fn parse_override(raw: &str) -> Result<(String, Value), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), Value::String(value.to_string())))
        }
        _ => Err(format!("expected KEY=VALUE, got `{}`", raw)),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn list(settings: &Settings) -> Result<()> {
    let packages = settings.store().list()?;
    if packages.is_empty() {
        println!(
            "No generators installed in {}",
            settings.generators_dir().display()
        );
        return Ok(());
    }

    println!("{}", "Installed generators".cyan().bold());
    println!();
    for package in &packages {
        let description = package.metadata.description();
        match package.metadata.version() {
            Some(version) => println!(
                "  {} {} {}",
                package.name().bold(),
                format!("v{}", version.trim_start_matches('v')).dimmed(),
                description
            ),
            None => println!("  {} {}", package.name().bold(), description),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Ensure terminal cursor is restored on panic and Ctrl+C
    tui::install_terminal_guards();
    init_tracing();

    let args = Args::parse();
    let settings = Settings::resolve(args.home.as_deref())?;

    match args.command {
        Command::New(new_args) => {
            let result = tui::run(&settings, new_args.into());

            // Ensure cursor is visible on normal exit
            tui::restore_cursor();

            result
        }
        Command::List => list(&settings),
        Command::Install(install_args) => {
            let target = install::install(
                &settings.store(),
                &install_args.source,
                install_args.name.as_deref(),
            )
            .await?;
            println!("{} {}", "Installed".green().bold(), target.display());
            Ok(())
        }
        Command::Uninstall(uninstall_args) => {
            let removed = install::uninstall(&settings.store(), &uninstall_args.name)?;
            println!("{} {}", "Removed".green().bold(), removed.display());
            Ok(())
        }
        Command::Pack(pack_args) => {
            let (path, size) = install::pack(&pack_args.dir, pack_args.out.as_deref())?;
            println!(
                "{} {} ({} bytes)",
                "Built".green().bold(),
                path.display(),
                size
            );
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_override() {
        assert_eq!(
            parse_override("Name=my app").unwrap(),
            ("Name".to_string(), Value::String("my app".to_string()))
        );
        assert_eq!(
            parse_override("url=http://x?a=b").unwrap().1,
            Value::String("http://x?a=b".to_string())
        );
        assert!(parse_override("novalue").is_err());
        assert!(parse_override("=x").is_err());
    }

    #[test]
    fn test_new_args_parse() {
        let args = Args::try_parse_from([
            "scaffold", "new", "rust/cli", "out", "--set", "Name=demo", "--dry-run", "-y",
        ])
        .unwrap();
        let Command::New(new_args) = args.command else {
            panic!("expected new");
        };
        let new_args: NewArgs = new_args.into();
        assert_eq!(new_args.generator, "rust/cli");
        assert_eq!(new_args.args, vec!["out".to_string()]);
        assert_eq!(new_args.overrides.len(), 1);
        assert!(new_args.dry_run && new_args.yes);
    }
}

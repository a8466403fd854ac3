//! CLI argument parsing and command dispatch

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use log::LevelFilter;

use operator_repo::defaults::{DEFAULT_REPO_PATH, REPO_ENV_VAR};
use operator_repo::model::Repo;
use operator_repo::output::OutputConfig;
use operator_repo::suggestions;

use crate::commands;

/// Operator repository manipulation tool
#[derive(Parser, Debug)]
#[command(name = "operator-repo")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Path to the root of the operator repository
    #[arg(short, long, global = true, value_name = "DIR", env = REPO_ENV_VAR, default_value = DEFAULT_REPO_PATH)]
    repo: PathBuf,

    /// Increase log verbosity (-v warnings, -vv info, -vvv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the contents of the repository, operators or bundles
    #[command(visible_alias = "ls")]
    List(commands::list::ListArgs),

    /// Check the validity of operators and bundles
    Check(commands::check::CheckArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

/// Map the `-v` count to a log level
pub fn log_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Error,
        1 => LevelFilter::Warn,
        2 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    }
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        // RUST_LOG, when set, overrides the -v level
        env_logger::Builder::new()
            .filter_level(log_level(self.verbose))
            .parse_default_env()
            .init();
        let output = OutputConfig::from_env_and_flag(&self.color);
        console::set_colors_enabled(output.use_color);

        match self.command {
            Commands::List(args) => commands::list::execute(&open_repo(&self.repo)?, args),
            Commands::Check(args) => {
                if args.list {
                    commands::check::list_checks(&args)
                } else {
                    commands::check::execute(&open_repo(&self.repo)?, args, &output)
                }
            }
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}

fn open_repo(path: &Path) -> Result<Repo> {
    Repo::new(path).map_err(|_| suggestions::invalid_repo(path))
}

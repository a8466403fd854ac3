//! # Operator Repository CLI
//!
//! This is the binary entry point for the `operator-repo` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Executing the appropriate command based on the parsed arguments.
//! - Handling top-level application errors and translating them into a
//!   non-zero exit status.
//!
//! The resource model and the check engine live in the `lib.rs` library
//! crate, so the binary stays a thin wrapper around them.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}

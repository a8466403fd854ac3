//! # CLI Command Implementations
//!
//! Each subcommand of `operator-repo` lives in its own file with:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and performs the
//!   command's logic by calling into the `operator_repo` library.
//!
//! Targets shared by `list` and `check` are resolved here.

pub mod check;
pub mod completions;
pub mod list;

use anyhow::{Context, Result};

use operator_repo::model::{Bundle, Operator, Repo};
use operator_repo::suggestions;

/// An operator or bundle named on the command line
#[derive(Debug, Clone)]
pub enum Target {
    Operator(Operator),
    Bundle(Bundle),
}

/// Resolve `<operator>` or `<operator>/<version>` against `repo`
pub fn resolve_target(repo: &Repo, target: &str) -> Result<Target> {
    let (name, version) = match target.split_once('/') {
        Some((name, version)) => (name, Some(version)),
        None => (target, None),
    };
    if !repo.has(name) {
        return Err(unknown_target(repo, target));
    }
    let operator = repo
        .operator(name)
        .with_context(|| format!("Failed to load operator {name}"))?;
    match version {
        None => Ok(Target::Operator(operator)),
        Some(version) if operator.has(version) => {
            let bundle = operator
                .bundle(version)
                .with_context(|| format!("Failed to load bundle {target}"))?;
            Ok(Target::Bundle(bundle))
        }
        Some(_) => Err(unknown_target(repo, target)),
    }
}

/// Resolve every target, or every operator of `repo` when none are given
pub fn resolve_targets(repo: &Repo, targets: &[String]) -> Result<Vec<Target>> {
    if targets.is_empty() {
        let operators = repo
            .all_operators()
            .context("Failed to list the repository's operators")?;
        return Ok(operators.into_iter().map(Target::Operator).collect());
    }
    targets
        .iter()
        .map(|target| resolve_target(repo, target))
        .collect()
}

fn unknown_target(repo: &Repo, target: &str) -> anyhow::Error {
    let operators = repo.all_operators().unwrap_or_default();
    let names: Vec<&str> = operators.iter().map(Operator::name).collect();
    suggestions::unknown_target(target, &names)
}

//! # Check Command Implementation
//!
//! Runs a check suite over operators, bundles and their catalog entries, and
//! prints one line (or one JSON object) per result.
//!
//! The command fails when any result is an error, or any result is a warning
//! and `--strict` is given.

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};

use operator_repo::checks::{
    builtin_suite, get_checks, run_suite, CheckResult, Resource, Severity, Suite, CHECK_PREFIX,
};
use operator_repo::defaults::DEFAULT_SUITE;
use operator_repo::model::Repo;
use operator_repo::output::{severity_label, OutputConfig};
use operator_repo::suggestions;

use super::{resolve_targets, Target};

/// Output format for check results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Check the validity of operators and bundles
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Check suite to run
    #[arg(short, long, value_name = "SUITE", default_value = DEFAULT_SUITE)]
    pub suite: String,

    /// List the checks of the suite instead of running them
    #[arg(short, long)]
    pub list: bool,

    /// Also check each operator's bundles and catalog entries
    #[arg(short = 'R', long)]
    pub recursive: bool,

    /// Skip the named check (repeatable)
    #[arg(long, value_name = "NAME")]
    pub skip: Vec<String>,

    /// Run only the named check (repeatable)
    #[arg(long, value_name = "NAME")]
    pub only: Vec<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Treat warnings as failures
    #[arg(long)]
    pub strict: bool,

    /// Operators (`name`) or bundles (`name/version`) to check; all operators by default
    #[arg(value_name = "TARGET")]
    pub targets: Vec<String>,
}

fn load_suite(name: &str) -> Result<Suite> {
    builtin_suite(name).ok_or_else(|| suggestions::unknown_suite(name))
}

/// Print the checks of the selected suite, grouped by resource kind.
pub fn list_checks(args: &CheckArgs) -> Result<()> {
    let suite = load_suite(&args.suite)?;
    for (kind, checks) in get_checks(&suite, &args.skip) {
        println!("{kind} checks:");
        for check in checks {
            let name = check.name.strip_prefix(CHECK_PREFIX).unwrap_or(check.name);
            println!(" - {}: {}", name, check.description);
        }
    }
    Ok(())
}

/// Resources to check for `targets`, in run order
fn collect_resources(targets: Vec<Target>, recursive: bool) -> Result<Vec<Resource>> {
    let mut resources = Vec::new();
    for target in targets {
        match target {
            Target::Operator(operator) => {
                let descendants = if recursive {
                    let catalogs = operator
                        .all_operator_catalogs()
                        .with_context(|| format!("Failed to list the catalogs of {operator}"))?;
                    let bundles = operator
                        .all_bundles()
                        .with_context(|| format!("Failed to list the bundles of {operator}"))?;
                    Some((catalogs, bundles))
                } else {
                    None
                };
                resources.push(Resource::from(operator));
                if let Some((catalogs, bundles)) = descendants {
                    resources.push(Resource::from(catalogs));
                    resources.extend(bundles.into_iter().map(Resource::from));
                }
            }
            Target::Bundle(bundle) => resources.push(Resource::from(bundle)),
        }
    }
    Ok(resources)
}

fn ensure_known_checks(suite: &Suite, names: &[String]) -> Result<()> {
    let available: Vec<&str> = get_checks(suite, &[])
        .into_values()
        .flatten()
        .map(|check| check.name)
        .collect();
    match names.iter().find(|name| !available.contains(&name.as_str())) {
        Some(name) => Err(suggestions::unknown_check(name, &available)),
        None => Ok(()),
    }
}

fn print_text(result: &CheckResult, output: &OutputConfig) {
    println!(
        "{}: {}({}): {}",
        severity_label(output, result.severity),
        result.check,
        result.origin,
        result.reason
    );
}

/// Execute the `check` command.
pub fn execute(repo: &Repo, args: CheckArgs, output: &OutputConfig) -> Result<()> {
    let suite = load_suite(&args.suite)?;
    ensure_known_checks(&suite, &args.only)?;
    ensure_known_checks(&suite, &args.skip)?;

    let targets = resolve_targets(repo, &args.targets)?;
    let resources = collect_resources(targets, args.recursive)?;
    let only = (!args.only.is_empty()).then_some(args.only.as_slice());

    let mut errors = 0usize;
    let mut warnings = 0usize;
    let mut collected = Vec::new();
    for result in run_suite(resources, &suite, only, &args.skip) {
        match result.severity {
            Severity::Error => errors += 1,
            Severity::Warning => warnings += 1,
            Severity::Success => {}
        }
        match args.format {
            OutputFormat::Text => print_text(&result, output),
            OutputFormat::Json => collected.push(result),
        }
    }
    if args.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&collected)?);
    }

    if errors > 0 {
        bail!("{} error(s) and {} warning(s) found", errors, warnings);
    }
    if args.strict && warnings > 0 {
        bail!("{} warning(s) found with --strict", warnings);
    }
    Ok(())
}

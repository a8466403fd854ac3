//! # Error Suggestions
//!
//! Helpers for building error messages that tell users what went wrong AND
//! how to fix it.
//!
//! ```rust,ignore
//! use operator_repo::suggestions;
//!
//! // Instead of:
//! anyhow::bail!("{} is not a valid operator repository", path.display());
//!
//! // Use:
//! return Err(suggestions::invalid_repo(path));
//! ```

use std::path::Path;

use crate::checks::builtin_suites;
use crate::defaults::REPO_ENV_VAR;

/// Error for a path that does not hold an operator repository.
pub fn invalid_repo(path: &Path) -> anyhow::Error {
    anyhow::anyhow!(
        "{path} is not a valid operator repository\n\n\
         hint: The repository root must contain an 'operators' directory\n\
         hint: Use -r/--repo to point at a different directory\n\
         hint: Set the {REPO_ENV_VAR} environment variable",
        path = path.display()
    )
}

/// Error for a suite name that is not built in.
pub fn unknown_suite(suite: &str) -> anyhow::Error {
    let suites = builtin_suites();
    let did_you_mean = find_similar(suite, suites)
        .map(|s| format!("\nhint: Did you mean '{s}'?"))
        .unwrap_or_default();

    anyhow::anyhow!(
        "Unknown check suite: {suite}{did_you_mean}\n\n\
         Available suites are: {names}",
        names = suites.join(", ")
    )
}

/// Error for a check name that the selected suite does not define.
pub fn unknown_check(check: &str, available: &[&str]) -> anyhow::Error {
    let did_you_mean = find_similar(check, available)
        .map(|s| format!("\nhint: Did you mean '{s}'?"))
        .unwrap_or_default();

    anyhow::anyhow!(
        "Unknown check: {check}{did_you_mean}\n\n\
         hint: Run 'operator-repo check --list' to see the available checks"
    )
}

/// Error for a target that names no operator or bundle of the repository.
pub fn unknown_target(target: &str, operators: &[&str]) -> anyhow::Error {
    let operator = target.split_once('/').map_or(target, |(name, _)| name);
    let did_you_mean = find_similar(operator, operators)
        .map(|s| format!("\nhint: Did you mean '{s}'?"))
        .unwrap_or_default();

    anyhow::anyhow!(
        "{target} is not an operator or bundle of this repository{did_you_mean}\n\n\
         hint: Targets are written as <operator> or <operator>/<version>\n\
         hint: Run 'operator-repo list' to see the available operators"
    )
}

/// Find a similar string from a list of candidates using edit distance.
///
/// Returns Some(candidate) if a close match is found (edit distance <= 2).
fn find_similar<'a>(input: &str, candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .filter_map(|&candidate| {
            let distance = edit_distance(input, candidate);
            if distance <= 2 && distance < input.len() {
                Some((candidate, distance))
            } else {
                None
            }
        })
        .min_by_key(|(_, distance)| *distance)
        .map(|(candidate, _)| candidate)
}

/// Calculate the Levenshtein edit distance between two strings.
fn edit_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    // Single rolling row
    let mut row: Vec<usize> = (0..=b_chars.len()).collect();
    for (i, a_char) in a_chars.iter().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = usize::from(a_char != b_char);
            let next = (row[j + 1] + 1).min(row[j] + 1).min(diagonal + cost);
            diagonal = row[j + 1];
            row[j + 1] = next;
        }
    }
    row[b_chars.len()]
}

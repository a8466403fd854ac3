//! Default values shared by the commands.

pub use crate::checks::DEFAULT_SUITE;

/// Environment variable that selects the repository when `--repo` is absent.
pub const REPO_ENV_VAR: &str = "OPERATOR_REPO";

/// Repository used when neither `--repo` nor the environment names one.
pub const DEFAULT_REPO_PATH: &str = ".";

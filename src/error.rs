//! # Error Handling
//!
//! This module defines the centralized error type for the `operator-repo`
//! library. It uses the `thiserror` library to build one `Error` enum that
//! covers every failure the resource model and the update graph builder can
//! report.
//!
//! ## Categories
//!
//! - **Structural errors**: a path does not look like a repository, operator,
//!   bundle, catalog or operator catalog. They are raised when a resource is
//!   constructed and are fatal only to that construction.
//!
//! - **Content errors**: malformed YAML, a missing or malformed CSV, an
//!   invalid `replaces`/`skips` reference, a cross-operator replacement,
//!   inconsistent operator names in one channel, or an unsupported update
//!   strategy. They are raised by the operation that detects them.
//!
//! Errors raised while running a validation rule never surface as this type:
//! the check engine turns them into error-severity results.
//!
//! The `Result` type alias is used to return `Result<T, Error>` from
//! functions throughout the library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for operator-repo operations
#[derive(Error, Debug)]
pub enum Error {
    /// The path is not a directory containing an `operators` subdirectory.
    #[error("Not a valid operator repository: {}", .path.display())]
    InvalidRepo { path: PathBuf },

    /// The path is not a directory containing at least one bundle.
    #[error("Not a valid operator: {}", .path.display())]
    InvalidOperator { path: PathBuf },

    /// The path is not a directory with both `metadata` and `manifests`.
    #[error("Not a valid bundle: {}", .path.display())]
    InvalidBundle { path: PathBuf },

    /// The path is not a directory containing at least one operator catalog.
    #[error("Not a valid catalog: {}", .path.display())]
    InvalidCatalog { path: PathBuf },

    /// The path is not a directory containing a `catalog.yaml` file.
    #[error("Not a valid operator catalog: {}", .path.display())]
    InvalidOperatorCatalog { path: PathBuf },

    /// A bundle's files exist but their content is unusable.
    #[error("{message}")]
    BundleContent { message: String },

    /// No YAML file was found under any of the accepted extensions.
    #[error("Can't find yaml file. Tried: {tried}")]
    YamlNotFound { tried: String },

    /// A YAML document could not be parsed.
    #[error("Malformed YAML document {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A configuration document does not match the expected schema.
    #[error("Configuration parsing error: {message}{}", .hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// A `replaces` or `skips` entry is not of the form `<operator>.<version>`.
    #[error("{bundle} has invalid 'replaces' field: '{value}'")]
    InvalidReplaces { bundle: String, value: String },

    /// A `replaces` or `skips` entry names another operator.
    #[error("{bundle} replaces a bundle from a different operator: '{value}'")]
    CrossOperatorReplaces { bundle: String, value: String },

    /// The bundles of one channel declare different CSV operator names.
    #[error("{operator} has bundles with different operator names: {names}")]
    MultipleOperatorNames { operator: String, names: String },

    /// The `updateGraph` value in `ci.yaml` is not a known strategy.
    #[error("{operator}: unsupported updateGraph value: {strategy}")]
    UnsupportedUpdateStrategy { operator: String, strategy: String },

    /// A channel has no bundles, so it has no head.
    #[error("{operator} has no bundles in channel {channel}")]
    EmptyChannel { operator: String, channel: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A directory listing error, wrapped from `walkdir::Error`.
    #[error("Directory listing error: {0}")]
    Walk(#[from] walkdir::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),
}

impl Error {
    /// Returns true when the error means "the optional file is absent".
    ///
    /// Callers use this to fall back to an empty document, while malformed
    /// documents still propagate.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::YamlNotFound { .. } => true,
            Error::Io(err) => err.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

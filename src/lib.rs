//! # Operator Repository Library
//!
//! This library models repositories of operator bundles and validates them.
//! It is designed to be used by the `operator-repo` command-line tool, but it
//! can also back any CI pipeline that needs to inspect such repositories.
//!
//! ## Quick Example
//!
//! ```no_run
//! use operator_repo::checks::{builtin_suite, run_suite, Resource, DEFAULT_SUITE};
//! use operator_repo::model::Repo;
//!
//! let repo = Repo::new("path/to/repo").unwrap();
//! let operator = repo.operator("hello").unwrap();
//!
//! // Channels and their upgrade graphs
//! for channel in operator.channels().unwrap() {
//!     let graph = operator.update_graph(&channel).unwrap();
//!     println!("{channel}: {} edges", graph.len());
//! }
//!
//! // Run the built-in checks on the operator
//! let suite = builtin_suite(DEFAULT_SUITE).unwrap();
//! for result in run_suite(vec![Resource::from(operator)], &suite, None, &[]) {
//!     println!("{result}");
//! }
//! ```
//!
//! ## Core Concepts
//!
//! - **Resource model (`model`)**: lazily-resolved, cached handles for the
//!   repository, its operators, their bundles, and the catalogs that
//!   publish them.
//! - **Version ordering (`version`)**: semver-aware comparison with a lexical
//!   fallback that never fails.
//! - **Update graph (`graph`)**: per-channel upgrade edges derived in
//!   `semver-mode` or `replaces-mode`.
//! - **Check engine (`checks`)**: registered validation rules run with
//!   per-rule failure isolation.
//!
//! ## Repository Layout
//!
//! ```text
//! <repo>/
//!   ci/pipeline-config.yaml
//!   operators/<name>/ci.yaml
//!   operators/<name>/<version>/metadata/annotations.yaml
//!   operators/<name>/<version>/manifests/<x>.clusterserviceversion.yaml
//!   catalogs/<catalog>/<name>/catalog.yaml
//! ```

pub mod cache;
pub mod checks;
pub mod config;
pub mod defaults;
pub mod error;
pub mod graph;
pub mod model;
pub mod output;
pub mod suggestions;
pub mod version;
pub mod yaml;

#[cfg(test)]
mod version_proptest;

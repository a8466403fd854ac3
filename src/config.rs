//! # Configuration Documents
//!
//! Two optional YAML documents configure the repository:
//!
//! - **`OperatorConfig`**: `operators/<name>/ci.yaml`, per-operator settings.
//!   The only key the library interprets is `updateGraph`, which selects the
//!   update strategy (`replaces-mode` when absent).
//!
//! - **`PipelineConfig`**: `ci/pipeline-config.yaml`, repository-wide
//!   settings such as the registries bundle images may be pulled from.
//!
//! Both keep unknown keys in `extra` so that rules can inspect settings this
//! crate does not model. A missing or empty document is equivalent to the
//! default configuration.

use std::collections::BTreeMap;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::error::{Error, Result};
use crate::yaml;

/// Per-operator configuration (`ci.yaml`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorConfig {
    /// Update strategy name (`semver-mode` or `replaces-mode`)
    #[serde(default)]
    pub update_graph: Option<String>,
    /// Every other key, kept verbatim
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Repository-wide configuration (`ci/pipeline-config.yaml`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Registry prefixes that catalog bundle images must start with
    #[serde(default)]
    pub allowed_registries: Vec<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Parse a configuration document, mapping a null document to the default
pub fn parse<T>(value: Value) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if value.is_null() {
        return Ok(T::default());
    }
    if !value.is_mapping() {
        return Err(Error::ConfigParse {
            message: "configuration document is not a mapping".to_string(),
            hint: Some("The document must contain key: value pairs at the top level".to_string()),
        });
    }
    serde_yaml::from_value(value).map_err(|err| Error::ConfigParse {
        message: err.to_string(),
        hint: hint_for(&err.to_string()),
    })
}

/// Load and parse a configuration file (`.yaml` or `.yml`)
pub fn from_file<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    parse(yaml::load_yaml(path)?)
}

fn hint_for(message: &str) -> Option<String> {
    if message.contains("updateGraph") {
        Some("updateGraph must be a string: 'semver-mode' or 'replaces-mode'".to_string())
    } else if message.contains("allowed_registries") {
        Some("allowed_registries must be a list of registry prefixes".to_string())
    } else {
        None
    }
}

//! YAML document loading
//!
//! Every file the resource model reads is YAML. Files may use either the
//! `.yaml` or the `.yml` extension; [`find_yaml`] tries the path as given and
//! then the alternate extension.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Deserialize;
use serde_yaml::Value;

use crate::error::{Error, Result};

const YAML_EXTENSIONS: [&str; 2] = ["yaml", "yml"];

/// Locate a YAML file, accepting both `.yaml` and `.yml` extensions
///
/// The path is tried first as given, then with every other accepted
/// extension. Returns [`Error::YamlNotFound`] listing the tried paths.
pub fn find_yaml(path: &Path) -> Result<PathBuf> {
    let mut tried = vec![path.to_path_buf()];
    if path.is_file() {
        return Ok(path.to_path_buf());
    }
    let current = path.extension().and_then(|ext| ext.to_str());
    for ext in YAML_EXTENSIONS {
        if current == Some(ext) {
            continue;
        }
        let candidate = path.with_extension(ext);
        if candidate.is_file() {
            return Ok(candidate);
        }
        tried.push(candidate);
    }
    Err(Error::YamlNotFound {
        tried: tried
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", "),
    })
}

fn read(path: &Path) -> Result<(PathBuf, String)> {
    let found = find_yaml(path)?;
    debug!("Loading {}", found.display());
    let content = fs::read_to_string(&found)?;
    Ok((found, content))
}

/// Load a single YAML document; an empty file yields `Value::Null`
pub fn load_yaml(path: &Path) -> Result<Value> {
    let (found, content) = read(path)?;
    if content.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_yaml::from_str(&content).map_err(|source| Error::Yaml {
        path: found,
        source,
    })
}

/// Load every document of a multi-document YAML file, skipping empty ones
pub fn load_yaml_documents(path: &Path) -> Result<Vec<Value>> {
    let (found, content) = read(path)?;
    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(&content) {
        let value = Value::deserialize(document).map_err(|source| Error::Yaml {
            path: found.clone(),
            source,
        })?;
        if !value.is_null() {
            documents.push(value);
        }
    }
    Ok(documents)
}

/// Look up a dotted path (`spec.install.spec`) in a YAML value
pub fn lookup<'a>(value: &'a Value, dotted: &str) -> Option<&'a Value> {
    dotted
        .split('.')
        .try_fold(value, |current, key| current.get(key))
}

/// Look up a dotted path and return it as a string
pub fn lookup_str<'a>(value: &'a Value, dotted: &str) -> Option<&'a str> {
    lookup(value, dotted).and_then(Value::as_str)
}

//! # Update Graph
//!
//! Builds the per-channel upgrade graph of an operator. The graph maps each
//! bundle to the set of bundles it can be upgraded to.
//!
//! Two strategies are supported, selected by `updateGraph` in the operator's
//! `ci.yaml`:
//!
//! - **`semver-mode`**: the channel's bundles sorted by version form a
//!   linear chain.
//! - **`replaces-mode`** (default): edges come from the CSV `spec.replaces`
//!   and `spec.skips` fields. Each reference must be `<operator>.<version>`
//!   and name the bundle's own operator. References to versions the channel
//!   does not contain are ignored here; `check_upgrade` reports the bundles
//!   they leave disconnected.
//!
//! Every bundle of the channel must declare the same CSV operator name,
//! whatever the strategy.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use log::debug;
use serde_yaml::Value;

use crate::error::{Error, Result};
use crate::model::{Bundle, Operator};
use crate::version;

/// Upgrade edges: each key can be upgraded to any bundle of its value set
pub type UpdateGraph = BTreeMap<Bundle, BTreeSet<Bundle>>;

/// How upgrade edges are derived for an operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateStrategy {
    /// Linear chain in version order
    SemverMode,
    /// Explicit `replaces`/`skips` references
    #[default]
    ReplacesMode,
}

impl UpdateStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateStrategy::SemverMode => "semver-mode",
            UpdateStrategy::ReplacesMode => "replaces-mode",
        }
    }
}

impl FromStr for UpdateStrategy {
    /// The rejected value
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value {
            "semver-mode" => Ok(UpdateStrategy::SemverMode),
            "replaces-mode" => Ok(UpdateStrategy::ReplacesMode),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for UpdateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the update graph of `channel` for `operator`
pub fn build(operator: &Operator, channel: &str) -> Result<UpdateGraph> {
    let bundles = operator.channel_bundles(channel)?;

    let names = bundles
        .iter()
        .map(Bundle::csv_operator_name)
        .collect::<Result<BTreeSet<&str>>>()?;
    if names.len() > 1 {
        return Err(Error::MultipleOperatorNames {
            operator: operator.to_string(),
            names: format!("{:?}", names),
        });
    }

    let strategy = operator.update_strategy()?;
    debug!(
        "Building update graph for {} channel {} ({} bundles, {})",
        operator,
        channel,
        bundles.len(),
        strategy
    );
    match strategy {
        UpdateStrategy::SemverMode => Ok(semver_graph(&bundles)),
        UpdateStrategy::ReplacesMode => replaces_graph(&bundles),
    }
}

fn semver_graph(bundles: &[Bundle]) -> UpdateGraph {
    bundles
        .windows(2)
        .map(|pair| (pair[0].clone(), BTreeSet::from([pair[1].clone()])))
        .collect()
}

/// `bundles` are the members of a single channel
fn replaces_graph(bundles: &[Bundle]) -> Result<UpdateGraph> {
    let mut by_version: HashMap<&str, &Bundle> = HashMap::new();
    for bundle in bundles {
        by_version.insert(bundle.csv_operator_version()?, bundle);
    }

    let mut graph = UpdateGraph::new();
    for bundle in bundles {
        for reference in previous_versions(bundle)? {
            let (operator_name, replaced_version) =
                reference
                    .split_once('.')
                    .ok_or_else(|| Error::InvalidReplaces {
                        bundle: bundle.to_string(),
                        value: reference.clone(),
                    })?;
            if operator_name != bundle.csv_operator_name()? {
                return Err(Error::CrossOperatorReplaces {
                    bundle: bundle.to_string(),
                    value: reference.clone(),
                });
            }
            // The index only holds channel members: edges never leave the channel
            let Some(replaced) = by_version.get(version::strip_prefix(replaced_version)) else {
                debug!("{}: ignoring reference outside the channel: {}", bundle, reference);
                continue;
            };
            graph
                .entry((*replaced).clone())
                .or_default()
                .insert(bundle.clone());
        }
    }
    Ok(graph)
}

/// Union of `spec.replaces` and `spec.skips` of the bundle's CSV
fn previous_versions(bundle: &Bundle) -> Result<BTreeSet<String>> {
    let mut previous = BTreeSet::new();
    let Some(spec) = bundle.csv()?.get("spec") else {
        return Ok(previous);
    };

    match spec.get("replaces") {
        None | Some(Value::Null) => {}
        Some(Value::String(name)) => {
            previous.insert(name.clone());
        }
        Some(other) => return Err(invalid_reference(bundle, other)),
    }

    match spec.get("skips") {
        None | Some(Value::Null) => {}
        Some(Value::Sequence(skips)) => {
            for skip in skips {
                match skip {
                    Value::String(name) => {
                        previous.insert(name.clone());
                    }
                    other => return Err(invalid_reference(bundle, other)),
                }
            }
        }
        Some(other) => return Err(invalid_reference(bundle, other)),
    }

    Ok(previous)
}

fn invalid_reference(bundle: &Bundle, value: &Value) -> Error {
    let rendered = serde_yaml::to_string(value)
        .map(|text| text.trim_end().to_string())
        .unwrap_or_else(|_| format!("{:?}", value));
    Error::InvalidReplaces {
        bundle: bundle.to_string(),
        value: rendered,
    }
}

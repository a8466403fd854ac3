//! # List Command Implementation
//!
//! Shows the repository, or the given operators and bundles, as a tree.
//!
//! ```text
//! Repo(/srv/operators)
//! ├─ Operator(hello)
//! │  ├─ Bundle(hello/0.0.1)
//! │  └─ Bundle(hello/0.0.2)
//! └─ Operator(world)
//! ```
//!
//! This command is read-only.

use anyhow::{Context, Result};
use clap::Args;
use log::warn;
use ptree::{print_tree, TreeItem};
use serde_yaml::Value;

use operator_repo::model::{Bundle, Operator, Repo};
use operator_repo::yaml;

use super::{resolve_target, Target};

/// List the contents of the repository, operators or bundles
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Descend into bundles and catalogs
    #[arg(short = 'R', long)]
    pub recursive: bool,

    /// Operators (`name`) or bundles (`name/version`) to show
    #[arg(value_name = "TARGET")]
    pub targets: Vec<String>,
}

/// Execute the `list` command.
pub fn execute(repo: &Repo, args: ListArgs) -> Result<()> {
    let nodes = if args.targets.is_empty() {
        vec![repo_node(repo, args.recursive)?]
    } else {
        args.targets
            .iter()
            .map(|target| match resolve_target(repo, target)? {
                Target::Operator(operator) => operator_node(&operator, args.recursive),
                Target::Bundle(bundle) => Ok(bundle_node(&bundle, true)),
            })
            .collect::<Result<Vec<_>>>()?
    };
    for node in &nodes {
        print_tree(node).map_err(|e| anyhow::anyhow!("Failed to display tree: {}", e))?;
    }
    Ok(())
}

fn repo_node(repo: &Repo, recursive: bool) -> Result<TreeNode> {
    let operators = repo
        .all_operators()
        .context("Failed to list the repository's operators")?;
    let children = operators
        .iter()
        .map(|operator| {
            if recursive {
                operator_node(operator, true)
            } else {
                Ok(TreeNode::leaf(operator.to_string()))
            }
        })
        .collect::<Result<_>>()?;
    Ok(TreeNode {
        label: repo.to_string(),
        children,
    })
}

fn operator_node(operator: &Operator, recursive: bool) -> Result<TreeNode> {
    let mut children: Vec<TreeNode> = operator
        .all_bundles()
        .with_context(|| format!("Failed to list the bundles of {operator}"))?
        .iter()
        .map(|bundle| bundle_node(bundle, recursive))
        .collect();
    let catalogs = operator
        .all_operator_catalogs()
        .with_context(|| format!("Failed to list the catalogs of {operator}"))?;
    children.extend(catalogs.iter().map(|catalog| TreeNode::leaf(catalog.to_string())));
    Ok(TreeNode {
        label: operator.to_string(),
        children,
    })
}

fn bundle_node(bundle: &Bundle, details: bool) -> TreeNode {
    let children = if details {
        match bundle_details(bundle) {
            Ok(lines) => lines.into_iter().map(TreeNode::leaf).collect(),
            Err(err) => {
                warn!("Failed to read {}: {:#}", bundle, err);
                vec![TreeNode::leaf(format!("Error: {err}"))]
            }
        }
    } else {
        Vec::new()
    };
    TreeNode {
        label: bundle.to_string(),
        children,
    }
}

fn bundle_details(bundle: &Bundle) -> operator_repo::error::Result<Vec<String>> {
    let csv = bundle.csv()?;
    let or_none = |value: Option<&str>| value.unwrap_or("(none)").to_string();
    let channels: Vec<String> = bundle.channels()?.into_iter().collect();
    let skips: Vec<&str> = yaml::lookup(csv, "spec.skips")
        .and_then(Value::as_sequence)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .collect();

    Ok(vec![
        format!(
            "Description: {}",
            or_none(yaml::lookup_str(csv, "metadata.annotations.description"))
        ),
        format!(
            "Name: {}.v{}",
            bundle.csv_operator_name()?,
            bundle.csv_operator_version()?
        ),
        format!("Channels: {}", channels.join(", ")),
        format!(
            "Default channel: {}",
            or_none(bundle.default_channel()?.as_deref())
        ),
        format!(
            "Container image: {}",
            or_none(yaml::lookup_str(csv, "metadata.annotations.containerImage"))
        ),
        format!("Replaces: {}", or_none(yaml::lookup_str(csv, "spec.replaces"))),
        format!("Skips: {}", skips.join(", ")),
    ])
}

/// Tree node structure for ptree visualization
#[derive(Clone)]
struct TreeNode {
    label: String,
    children: Vec<TreeNode>,
}

impl TreeNode {
    fn leaf(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            children: vec![],
        }
    }
}

impl TreeItem for TreeNode {
    type Child = TreeNode;

    fn write_self<W: std::io::Write>(
        &self,
        f: &mut W,
        _style: &ptree::Style,
    ) -> std::io::Result<()> {
        write!(f, "{}", self.label)
    }

    fn children(&self) -> std::borrow::Cow<'_, [Self::Child]> {
        std::borrow::Cow::Borrowed(&self.children)
    }
}

//! Bundle-level checks

use std::collections::BTreeSet;

use anyhow::Result;
use serde_yaml::Value;

use crate::checks::{Check, Findings};
use crate::model::Bundle;
use crate::version;
use crate::yaml;

pub fn checks() -> Vec<Check> {
    vec![
        Check::bundle(
            "check_operator_name",
            "Check that operator names in the CSV, annotations and filesystem agree",
            check_operator_name,
        ),
        Check::bundle(
            "check_image",
            "Check that containerImage is defined and used by a deployment",
            check_image,
        ),
        Check::bundle(
            "check_semver",
            "Check that the bundle version is valid semver",
            check_semver,
        ),
    ]
}

fn render_names(names: &BTreeSet<Option<String>>) -> String {
    let rendered: Vec<&str> = names
        .iter()
        .map(|name| name.as_deref().unwrap_or("(none)"))
        .collect();
    format!("[{}]", rendered.join(", "))
}

/// Compare a bundle's name with the one shared by its siblings
///
/// When the siblings disagree among themselves only a warning is issued.
fn check_consistency(
    findings: &mut Findings,
    name: Option<&str>,
    all_names: &BTreeSet<Option<String>>,
    other_names: &BTreeSet<Option<String>>,
    source: &str,
) {
    if other_names.len() == 1 {
        let common = other_names.iter().next().and_then(Option::as_deref);
        if common != name {
            findings.fail(format!(
                "Operator name {} ({}) does not match the name defined in other bundles ({})",
                source,
                name.unwrap_or("(none)"),
                common.unwrap_or("(none)")
            ));
        }
    } else {
        findings.warn(format!(
            "Operator name {} is not consistent across bundles: {}",
            source,
            render_names(all_names)
        ));
    }
}

/// Operator names from annotations.yaml, the CSV and the directory must agree,
/// within the bundle and across the operator's bundles
pub fn check_operator_name(bundle: &Bundle, findings: &mut Findings) -> Result<()> {
    let Some(metadata_name) = bundle.metadata_operator_name()? else {
        findings.fail("Bundle does not define the operator name in annotations.yaml");
        return Ok(());
    };
    let csv_name = bundle.csv_operator_name()?;

    let siblings = bundle.operator()?.all_bundles()?;
    let mut all_metadata_names = BTreeSet::new();
    let mut all_csv_names = BTreeSet::new();
    let mut other_metadata_names = BTreeSet::new();
    let mut other_csv_names = BTreeSet::new();
    for sibling in &siblings {
        let sibling_metadata_name = sibling.metadata_operator_name()?;
        let sibling_csv_name = Some(sibling.csv_operator_name()?.to_string());
        if sibling.root() != bundle.root() {
            other_metadata_names.insert(sibling_metadata_name.clone());
            other_csv_names.insert(sibling_csv_name.clone());
        }
        all_metadata_names.insert(sibling_metadata_name);
        all_csv_names.insert(sibling_csv_name);
    }

    // Zero or one distinct name among the other bundles is consistent
    let consistent_metadata_names = other_metadata_names.len() < 2;
    let consistent_csv_names = other_csv_names.len() < 2;
    let has_siblings = siblings.iter().any(|sibling| sibling.root() != bundle.root());

    if has_siblings {
        check_consistency(
            findings,
            Some(metadata_name.as_str()),
            &all_metadata_names,
            &other_metadata_names,
            "from annotations.yaml",
        );
        check_consistency(
            findings,
            Some(csv_name),
            &all_csv_names,
            &other_csv_names,
            "from the CSV",
        );
    }

    if metadata_name != csv_name {
        let message = format!(
            "Operator name from annotations.yaml ({}) does not match the name defined in the CSV ({})",
            metadata_name, csv_name
        );
        if consistent_metadata_names && consistent_csv_names {
            findings.fail(message);
        } else {
            findings.warn(message);
        }
    }

    if metadata_name != bundle.operator_name() {
        let message = format!(
            "Operator name from annotations.yaml ({}) does not match the operator's directory name ({})",
            metadata_name,
            bundle.operator_name()
        );
        if consistent_metadata_names {
            findings.fail(message);
        } else {
            findings.warn(message);
        }
    }

    Ok(())
}

/// The CSV's containerImage must be the image of a deployment container
pub fn check_image(bundle: &Bundle, findings: &mut Findings) -> Result<()> {
    if let Err(err) = find_container_image(bundle, findings) {
        findings.fail(err.to_string());
    }
    Ok(())
}

fn find_container_image(bundle: &Bundle, findings: &mut Findings) -> crate::error::Result<()> {
    let csv = bundle.csv()?;
    let Some(container_image) = yaml::lookup_str(csv, "metadata.annotations.containerImage")
    else {
        findings.fail("CSV doesn't define .metadata.annotations.containerImage");
        return Ok(());
    };
    let Some(deployments) = yaml::lookup(csv, "spec.install.spec.deployments") else {
        findings.fail("CSV doesn't define .spec.install.spec.deployments");
        return Ok(());
    };

    let used = deployments
        .as_sequence()
        .into_iter()
        .flatten()
        .filter_map(|deployment| yaml::lookup(deployment, "spec.template.spec.containers"))
        .filter_map(Value::as_sequence)
        .flatten()
        .any(|container| {
            container.get("image").and_then(Value::as_str) == Some(container_image)
        });
    if !used {
        findings.fail(format!(
            "container image {} not used by any deployment",
            container_image
        ));
    }
    Ok(())
}

/// Warn when the filesystem or CSV version is not valid semver
pub fn check_semver(bundle: &Bundle, findings: &mut Findings) -> Result<()> {
    if semver::Version::parse(bundle.operator_version()).is_err() {
        findings.warn(format!(
            "Version from filesystem ({}) is not valid semver",
            bundle.operator_version()
        ));
    }
    let csv_version = bundle.csv_operator_version()?;
    if !version::is_semver(csv_version) {
        findings.warn(format!(
            "Version from CSV ({}) is not valid semver",
            csv_version
        ));
    }
    Ok(())
}

//! Catalog-level checks

use anyhow::Result;
use serde_yaml::Value;

use crate::checks::{Check, Findings};
use crate::model::{OperatorCatalog, OperatorCatalogList};
use crate::yaml;

pub fn checks() -> Vec<Check> {
    vec![Check::operator_catalogs(
        "check_bundle_images_in_fbc",
        "Validate that bundle images in catalogs come from allowed registries",
        check_bundle_images_in_fbc,
    )]
}

fn bundle_images(catalog: &OperatorCatalog) -> crate::error::Result<Vec<String>> {
    Ok(catalog
        .catalog_content()?
        .iter()
        .filter(|item| yaml::lookup_str(item, "schema") == Some("olm.bundle"))
        .filter_map(|item| item.get("image").and_then(Value::as_str))
        .filter(|image| !image.is_empty())
        .map(str::to_string)
        .collect())
}

fn check_catalog(
    catalog: &OperatorCatalog,
    allowed_registries: &[String],
    findings: &mut Findings,
) -> crate::error::Result<()> {
    let invalid: Vec<String> = bundle_images(catalog)?
        .into_iter()
        .filter(|image| {
            !allowed_registries
                .iter()
                .any(|registry| image.starts_with(registry.as_str()))
        })
        .collect();
    if !invalid.is_empty() {
        findings.fail(format!(
            "Invalid bundle image(s) found in catalog {}: {}",
            catalog,
            invalid.join(", ")
        ));
    }
    Ok(())
}

/// Bundle images published in catalogs must come from an allowed registry
///
/// Nothing is checked when the repository sets no `allowed_registries`.
pub fn check_bundle_images_in_fbc(
    operator_catalogs: &OperatorCatalogList,
    findings: &mut Findings,
) -> Result<()> {
    let mut allowed_registries: Option<Vec<String>> = None;
    for catalog in operator_catalogs {
        if allowed_registries.is_none() {
            // Every entry belongs to the same repository: read its config once
            match catalog
                .repo()
                .and_then(|repo| Ok(repo.config()?.allowed_registries.clone()))
            {
                Ok(registries) => allowed_registries = Some(registries),
                Err(err) => {
                    findings.fail(err.to_string());
                    continue;
                }
            }
        }
        let registries = allowed_registries.as_deref().unwrap_or_default();
        if registries.is_empty() {
            break;
        }
        if let Err(err) = check_catalog(catalog, registries, findings) {
            findings.fail(err.to_string());
        }
    }
    Ok(())
}

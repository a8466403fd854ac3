//! Integration tests for the built-in checks, run against repositories on
//! disk.

mod common;

use common::prelude::*;
use operator_repo::checks::bundle::{check_image, check_operator_name, check_semver};
use operator_repo::checks::catalog::check_bundle_images_in_fbc;
use operator_repo::checks::operator::check_upgrade;
use operator_repo::checks::{
    builtin_suite, run_suite, CheckResult, Findings, Resource, RuleFn, Severity, DEFAULT_SUITE,
};

fn run<T>(rule: RuleFn<T>, target: &T) -> Vec<(Severity, String)> {
    let mut findings = Findings::new();
    rule(target, &mut findings).unwrap();
    findings
        .into_vec()
        .into_iter()
        .map(|finding| (finding.severity, finding.reason))
        .collect()
}

fn fail(reason: &str) -> (Severity, String) {
    (Severity::Error, reason.to_string())
}

fn warn(reason: &str) -> (Severity, String) {
    (Severity::Warning, reason.to_string())
}

// ============================================================================
// check_upgrade
// ============================================================================

#[test]
fn test_upgrade_connected_channel() {
    let fixture = RepoFixture::new()
        .with_bundle("hello", "0.0.1")
        .with_bundle_spec(BundleSpec::new("hello", "0.0.2").replaces("hello.v0.0.1"));
    let operator = fixture.repo().operator("hello").unwrap();

    assert!(run(check_upgrade, &operator).is_empty());
}

#[test]
fn test_upgrade_dangling_bundle() {
    let fixture = RepoFixture::new()
        .with_bundle("hello", "0.0.1")
        .with_bundle("hello", "0.0.2");
    let operator = fixture.repo().operator("hello").unwrap();

    assert_eq!(
        run(check_upgrade, &operator),
        vec![fail("Channel beta has dangling bundles: {Bundle(hello/0.0.1)}")]
    );
}

#[test]
fn test_upgrade_semver_mode_has_no_dangling_bundles() {
    let fixture = RepoFixture::new()
        .with_bundle("hello", "0.0.1")
        .with_bundle("hello", "0.0.2")
        .with_bundle("hello", "0.0.3")
        .with_operator_config("hello", "updateGraph: semver-mode\n");
    let operator = fixture.repo().operator("hello").unwrap();

    assert!(run(check_upgrade, &operator).is_empty());
}

#[test]
fn test_upgrade_mixed_version_channel() {
    let fixture = RepoFixture::new()
        .with_bundle("hello", "1.5")
        .with_bundle_spec(BundleSpec::new("hello", "1.9.0").replaces("hello.v1.5"))
        .with_bundle_spec(BundleSpec::new("hello", "1.10.0").replaces("hello.v1.9.0"))
        .with_bundle_spec(BundleSpec::new("hello", "2.0.0").replaces("hello.v1.10.0"));
    let operator = fixture.repo().operator("hello").unwrap();

    assert!(run(check_upgrade, &operator).is_empty());
}

#[test]
fn test_upgrade_reports_graph_errors() {
    let fixture = RepoFixture::new()
        .with_bundle("hello", "0.0.1")
        .with_bundle_spec(BundleSpec::new("hello", "0.0.2").replaces("rubbish"));
    let operator = fixture.repo().operator("hello").unwrap();

    assert_eq!(
        run(check_upgrade, &operator),
        vec![fail("Bundle(hello/0.0.2) has invalid 'replaces' field: 'rubbish'")]
    );
}

#[test]
fn test_upgrade_empty_default_channel() {
    let fixture = RepoFixture::new().with_bundle_spec(
        BundleSpec::new("hello", "0.0.1").default_channel(Some("stable")),
    );
    let operator = fixture.repo().operator("hello").unwrap();

    assert_eq!(
        run(check_upgrade, &operator),
        vec![fail("Operator(hello) has no bundles in channel stable")]
    );
}

// ============================================================================
// check_operator_name
// ============================================================================

#[test]
fn test_operator_name_consistent() {
    let fixture = RepoFixture::new()
        .with_bundle("hello", "0.0.1")
        .with_bundle("hello", "0.0.2");
    let bundle = fixture.repo().operator("hello").unwrap().bundle("0.0.2").unwrap();

    assert!(run(check_operator_name, &bundle).is_empty());
}

#[test]
fn test_operator_name_missing_annotation() {
    let fixture =
        RepoFixture::new().with_bundle_spec(BundleSpec::new("hello", "0.0.1").package(None));
    let bundle = fixture.repo().operator("hello").unwrap().bundle("0.0.1").unwrap();

    assert_eq!(
        run(check_operator_name, &bundle),
        vec![fail("Bundle does not define the operator name in annotations.yaml")]
    );
}

#[test]
fn test_operator_name_csv_mismatch() {
    let fixture = RepoFixture::new()
        .with_bundle_spec(BundleSpec::new("hello", "0.0.1").csv_name("goodbye.v0.0.1"));
    let bundle = fixture.repo().operator("hello").unwrap().bundle("0.0.1").unwrap();

    assert_eq!(
        run(check_operator_name, &bundle),
        vec![fail(
            "Operator name from annotations.yaml (hello) does not match the name defined in the CSV (goodbye)"
        )]
    );
}

#[test]
fn test_operator_name_directory_mismatch() {
    let fixture = RepoFixture::new().with_bundle_spec(
        BundleSpec::new("hello", "0.0.1")
            .package(Some("world"))
            .csv_name("world.v0.0.1"),
    );
    let bundle = fixture.repo().operator("hello").unwrap().bundle("0.0.1").unwrap();

    assert_eq!(
        run(check_operator_name, &bundle),
        vec![fail(
            "Operator name from annotations.yaml (world) does not match the operator's directory name (hello)"
        )]
    );
}

#[test]
fn test_operator_name_differs_from_siblings() {
    let fixture = RepoFixture::new()
        .with_bundle("hello", "0.0.1")
        .with_bundle("hello", "0.0.2")
        .with_bundle_spec(BundleSpec::new("hello", "0.0.3").package(Some("world")));
    let operator = fixture.repo().operator("hello").unwrap();

    assert_eq!(
        run(check_operator_name, &operator.bundle("0.0.3").unwrap()),
        vec![
            fail("Operator name from annotations.yaml (world) does not match the name defined in other bundles (hello)"),
            fail("Operator name from annotations.yaml (world) does not match the name defined in the CSV (hello)"),
            fail("Operator name from annotations.yaml (world) does not match the operator's directory name (hello)"),
        ]
    );

    // The siblings only see an inconsistency they can't attribute
    assert_eq!(
        run(check_operator_name, &operator.bundle("0.0.1").unwrap()),
        vec![warn(
            "Operator name from annotations.yaml is not consistent across bundles: [hello, world]"
        )]
    );
}

// ============================================================================
// check_image
// ============================================================================

#[test]
fn test_image_used_by_deployment() {
    let fixture = RepoFixture::new().with_bundle("hello", "0.0.1");
    let bundle = fixture.repo().operator("hello").unwrap().bundle("0.0.1").unwrap();

    assert!(run(check_image, &bundle).is_empty());
}

#[test]
fn test_image_missing_container_image() {
    let fixture = RepoFixture::new()
        .with_bundle_spec(BundleSpec::new("hello", "0.0.1").container_image(None));
    let bundle = fixture.repo().operator("hello").unwrap().bundle("0.0.1").unwrap();

    assert_eq!(
        run(check_image, &bundle),
        vec![fail("CSV doesn't define .metadata.annotations.containerImage")]
    );
}

#[test]
fn test_image_not_used_by_any_deployment() {
    let fixture = RepoFixture::new().with_bundle_spec(
        BundleSpec::new("hello", "0.0.1").deployment_image(Some("quay.io/example/other:1.0")),
    );
    let bundle = fixture.repo().operator("hello").unwrap().bundle("0.0.1").unwrap();

    assert_eq!(
        run(check_image, &bundle),
        vec![fail(
            "container image quay.io/example/hello:0.0.1 not used by any deployment"
        )]
    );
}

#[test]
fn test_image_missing_csv() {
    let fixture = RepoFixture::new()
        .with_bundle("hello", "0.0.1")
        .with_file("operators/hello/0.0.2/metadata/annotations.yaml", "annotations: {}\n")
        .with_file("operators/hello/0.0.2/manifests/README", "");
    let bundle = fixture.repo().operator("hello").unwrap().bundle("0.0.2").unwrap();

    assert_eq!(
        run(check_image, &bundle),
        vec![fail("CSV file for hello/0.0.2 not found")]
    );
}

// ============================================================================
// check_semver
// ============================================================================

#[test]
fn test_semver_valid() {
    let fixture = RepoFixture::new().with_bundle("hello", "0.0.1");
    let bundle = fixture.repo().operator("hello").unwrap().bundle("0.0.1").unwrap();

    assert!(run(check_semver, &bundle).is_empty());
}

#[test]
fn test_semver_invalid_versions() {
    let fixture =
        RepoFixture::new().with_bundle_spec(BundleSpec::new("hello", "v1").csv_name("hello.v1"));
    let bundle = fixture.repo().operator("hello").unwrap().bundle("v1").unwrap();

    assert_eq!(
        run(check_semver, &bundle),
        vec![
            warn("Version from filesystem (v1) is not valid semver"),
            warn("Version from CSV (1) is not valid semver"),
        ]
    );
}

// ============================================================================
// check_bundle_images_in_fbc
// ============================================================================

#[test]
fn test_fbc_without_allowed_registries() {
    let fixture = RepoFixture::new()
        .with_bundle("hello", "0.0.1")
        .with_catalog("v4.14", "hello", &["docker.io/evil/hello:0.0.1"]);
    let catalogs = fixture.repo().operator("hello").unwrap().all_operator_catalogs().unwrap();

    assert!(run(check_bundle_images_in_fbc, &catalogs).is_empty());
}

#[test]
fn test_fbc_images_from_allowed_registries() {
    let fixture = RepoFixture::new()
        .with_bundle("hello", "0.0.1")
        .with_pipeline_config("allowed_registries:\n  - quay.io/example\n")
        .with_catalog("v4.14", "hello", &["quay.io/example/hello:0.0.1"])
        .with_catalog(
            "v4.15",
            "hello",
            &["quay.io/example/hello:0.0.1", "docker.io/evil/hello:0.0.1"],
        );
    let catalogs = fixture.repo().operator("hello").unwrap().all_operator_catalogs().unwrap();

    assert_eq!(
        run(check_bundle_images_in_fbc, &catalogs),
        vec![fail(
            "Invalid bundle image(s) found in catalog OperatorCatalog(v4.15/hello): docker.io/evil/hello:0.0.1"
        )]
    );
}

// ============================================================================
// Suite runs
// ============================================================================

#[test]
fn test_suite_over_healthy_repository() {
    let fixture = RepoFixture::new()
        .with_bundle("hello", "0.0.1")
        .with_bundle_spec(BundleSpec::new("hello", "0.0.2").replaces("hello.v0.0.1"))
        .with_pipeline_config("allowed_registries:\n  - quay.io/example\n")
        .with_catalog("v4.14", "hello", &["quay.io/example/hello:0.0.2"]);
    let operator = fixture.repo().operator("hello").unwrap();
    let suite = builtin_suite(DEFAULT_SUITE).unwrap();

    let mut targets = vec![
        Resource::from(operator.clone()),
        Resource::from(operator.all_operator_catalogs().unwrap()),
    ];
    targets.extend(operator.all_bundles().unwrap().into_iter().map(Resource::from));

    let results: Vec<CheckResult> = run_suite(targets, &suite, None, &[]).collect();
    // 1 operator check, 1 catalog check, 3 checks for each of the 2 bundles
    assert_eq!(results.len(), 8);
    assert!(results.iter().all(|result| result.severity == Severity::Success));
    assert!(results.iter().all(|result| result.suite == DEFAULT_SUITE));
}

#[test]
fn test_suite_results_carry_their_origin() {
    let fixture = RepoFixture::new()
        .with_bundle("hello", "0.0.1")
        .with_bundle("hello", "0.0.2");
    let operator = fixture.repo().operator("hello").unwrap();
    let suite = builtin_suite(DEFAULT_SUITE).unwrap();

    let results: Vec<String> = run_suite(vec![Resource::from(operator)], &suite, None, &[])
        .map(|result| result.to_string())
        .collect();
    assert_eq!(
        results,
        vec!["error: check_upgrade(Operator(hello)): Channel beta has dangling bundles: {Bundle(hello/0.0.1)}"]
    );
}

#[test]
fn test_suite_skip_and_only() {
    let fixture = RepoFixture::new()
        .with_bundle_spec(BundleSpec::new("hello", "v1").csv_name("hello.v1"));
    let bundle = fixture.repo().operator("hello").unwrap().bundle("v1").unwrap();
    let suite = builtin_suite(DEFAULT_SUITE).unwrap();

    let only = vec!["check_semver".to_string()];
    let results: Vec<CheckResult> =
        run_suite(vec![Resource::from(bundle.clone())], &suite, Some(only.as_slice()), &[]).collect();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|result| result.check == "check_semver"));

    let skip = vec!["check_semver".to_string(), "check_image".to_string()];
    let results: Vec<CheckResult> =
        run_suite(vec![Resource::from(bundle)], &suite, None, &skip).collect();
    let checks: Vec<&str> = results.iter().map(|result| result.check.as_str()).collect();
    assert_eq!(checks, vec!["check_operator_name"]);
}

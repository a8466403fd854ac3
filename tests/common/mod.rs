//! Shared test utilities for integration and E2E tests.
//!
//! Add `mod common;` to a test file, then build repositories on disk:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = RepoFixture::new()
//!         .with_bundle("hello", "0.0.1")
//!         .with_bundle_spec(BundleSpec::new("hello", "0.0.2").replaces("hello.v0.0.1"));
//!     let repo = fixture.repo();
//!     // ... test code
//! }
//! ```

#![allow(dead_code)]

use std::path::Path;

use assert_fs::prelude::*;
use serde_json::{json, Value};

use operator_repo::model::{CHANNELS_ANNOTATION, DEFAULT_CHANNEL_ANNOTATION, PACKAGE_ANNOTATION};
use operator_repo::model::Repo;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::{BundleSpec, RepoFixture};
}

/// Contents of one bundle directory.
///
/// Defaults describe a healthy bundle: package annotation equal to the
/// operator name, channel `beta` as both channel and default channel, a CSV
/// named `<name>.v<version>` whose container image is used by a deployment.
#[derive(Debug, Clone)]
pub struct BundleSpec {
    pub name: String,
    pub version: String,
    pub package: Option<String>,
    pub channels: Option<String>,
    pub default_channel: Option<String>,
    pub csv_name: String,
    pub replaces: Option<String>,
    pub skips: Vec<Value>,
    pub container_image: Option<String>,
    pub deployment_image: Option<String>,
}

impl BundleSpec {
    pub fn new(name: &str, version: &str) -> Self {
        let image = format!("quay.io/example/{name}:{version}");
        Self {
            name: name.to_string(),
            version: version.to_string(),
            package: Some(name.to_string()),
            channels: Some("beta".to_string()),
            default_channel: Some("beta".to_string()),
            csv_name: format!("{name}.v{version}"),
            replaces: None,
            skips: Vec::new(),
            container_image: Some(image.clone()),
            deployment_image: Some(image),
        }
    }

    pub fn package(mut self, package: Option<&str>) -> Self {
        self.package = package.map(str::to_string);
        self
    }

    pub fn channels(mut self, channels: Option<&str>) -> Self {
        self.channels = channels.map(str::to_string);
        self
    }

    pub fn default_channel(mut self, channel: Option<&str>) -> Self {
        self.default_channel = channel.map(str::to_string);
        self
    }

    pub fn csv_name(mut self, csv_name: &str) -> Self {
        self.csv_name = csv_name.to_string();
        self
    }

    pub fn replaces(mut self, replaces: &str) -> Self {
        self.replaces = Some(replaces.to_string());
        self
    }

    pub fn skips(mut self, skips: &[&str]) -> Self {
        self.skips = skips.iter().map(|skip| json!(skip)).collect();
        self
    }

    /// Raw `spec.skips` entries, for malformed values
    pub fn raw_skips(mut self, skips: Vec<Value>) -> Self {
        self.skips = skips;
        self
    }

    pub fn container_image(mut self, image: Option<&str>) -> Self {
        self.container_image = image.map(str::to_string);
        self
    }

    pub fn deployment_image(mut self, image: Option<&str>) -> Self {
        self.deployment_image = image.map(str::to_string);
        self
    }

    fn annotations(&self) -> Value {
        let mut annotations = serde_json::Map::new();
        if let Some(package) = &self.package {
            annotations.insert(PACKAGE_ANNOTATION.to_string(), json!(package));
        }
        if let Some(channels) = &self.channels {
            annotations.insert(CHANNELS_ANNOTATION.to_string(), json!(channels));
        }
        if let Some(channel) = &self.default_channel {
            annotations.insert(DEFAULT_CHANNEL_ANNOTATION.to_string(), json!(channel));
        }
        json!({ "annotations": annotations })
    }

    fn csv(&self) -> Value {
        let mut metadata = json!({ "name": self.csv_name });
        if let Some(image) = &self.container_image {
            metadata["annotations"] = json!({
                "containerImage": image,
                "description": format!("The {} operator", self.name),
            });
        }
        let containers: Vec<Value> = self
            .deployment_image
            .iter()
            .map(|image| json!({ "name": "manager", "image": image }))
            .collect();
        let mut spec = json!({
            "install": {
                "spec": {
                    "deployments": [
                        { "name": "manager", "spec": { "template": { "spec": { "containers": containers } } } }
                    ]
                }
            }
        });
        if let Some(replaces) = &self.replaces {
            spec["replaces"] = json!(replaces);
        }
        if !self.skips.is_empty() {
            spec["skips"] = Value::Array(self.skips.clone());
        }
        json!({
            "apiVersion": "operators.coreos.com/v1alpha1",
            "kind": "ClusterServiceVersion",
            "metadata": metadata,
            "spec": spec,
        })
    }
}

/// A temporary operator repository.
///
/// ```rust,ignore
/// let fixture = RepoFixture::new().with_bundle("hello", "0.0.1");
///
/// let mut cmd = cargo_bin_cmd!("operator-repo");
/// cmd.arg("--repo").arg(fixture.path()).arg("ls").assert().success();
/// ```
pub struct RepoFixture {
    temp_dir: assert_fs::TempDir,
}

impl RepoFixture {
    /// Create an empty repository (an `operators` directory only).
    pub fn new() -> Self {
        let temp_dir = assert_fs::TempDir::new().expect("Failed to create temp directory");
        temp_dir
            .child("operators")
            .create_dir_all()
            .expect("Failed to create operators directory");
        Self { temp_dir }
    }

    /// Add a healthy bundle.
    pub fn with_bundle(self, name: &str, version: &str) -> Self {
        self.with_bundle_spec(BundleSpec::new(name, version))
    }

    /// Add a bundle described by `spec`.
    pub fn with_bundle_spec(self, spec: BundleSpec) -> Self {
        let bundle_dir = format!("operators/{}/{}", spec.name, spec.version);
        self.with_yaml(
            &format!("{bundle_dir}/metadata/annotations.yaml"),
            &spec.annotations(),
        )
        .with_yaml(
            &format!("{bundle_dir}/manifests/{}.clusterserviceversion.yaml", spec.name),
            &spec.csv(),
        )
    }

    /// Write `operators/<name>/ci.yaml`.
    pub fn with_operator_config(self, name: &str, content: &str) -> Self {
        self.with_file(&format!("operators/{name}/ci.yaml"), content)
    }

    /// Write `ci/pipeline-config.yaml`.
    pub fn with_pipeline_config(self, content: &str) -> Self {
        self.with_file("ci/pipeline-config.yaml", content)
    }

    /// Write `catalogs/<catalog>/<operator>/catalog.yaml` with one
    /// `olm.bundle` document per image.
    pub fn with_catalog(self, catalog: &str, operator: &str, images: &[&str]) -> Self {
        let mut documents = vec![serde_yaml::to_string(&json!({
            "schema": "olm.package",
            "name": operator,
        }))
        .expect("Failed to render package document")];
        for image in images {
            documents.push(
                serde_yaml::to_string(&json!({
                    "schema": "olm.bundle",
                    "package": operator,
                    "image": image,
                }))
                .expect("Failed to render bundle document"),
            );
        }
        self.with_file(
            &format!("catalogs/{catalog}/{operator}/catalog.yaml"),
            &documents.join("---\n"),
        )
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    fn with_yaml(self, path: &str, value: &Value) -> Self {
        let content = serde_yaml::to_string(value).expect("Failed to render YAML");
        self.with_file(path, &content)
    }

    /// Get the path to the repository root.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Open the repository.
    pub fn repo(&self) -> Repo {
        Repo::new(self.path()).expect("Fixture should be a valid repository")
    }

    /// Create a child path in the repository.
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }
}

impl Default for RepoFixture {
    fn default() -> Self {
        Self::new()
    }
}

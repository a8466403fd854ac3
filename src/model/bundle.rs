//! Bundles: one immutable version of an operator
//!
//! A bundle directory looks like this:
//!
//! ```text
//! <operator>/<version>/
//!   metadata/annotations.yaml      annotations: {package, channels, ...}
//!   metadata/dependencies.yaml     dependencies: [...]
//!   manifests/<x>.clusterserviceversion.yaml
//! ```
//!
//! The filesystem position gives the bundle its *filesystem identity*
//! (operator name, version), which is used for hashing and display. The CSV
//! `.metadata.name` (`<name>.<version>`) gives its *CSV identity*, which is
//! used for equality and ordering.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::{debug, warn};
use once_cell::unsync::OnceCell;
use serde_yaml::{Mapping, Value};

use crate::error::{Error, Result};
use crate::model::operator::{Operator, OperatorInner};
use crate::model::{
    file_name, resolve_path, Parent, CHANNELS_ANNOTATION, DEFAULT_CHANNEL_ANNOTATION,
    PACKAGE_ANNOTATION,
};
use crate::version::{self, VersionKey};
use crate::yaml;

/// Bundle metadata directory
pub const METADATA_DIR: &str = "metadata";
/// Bundle manifests directory
pub const MANIFESTS_DIR: &str = "manifests";

const CSV_PATTERNS: [&str; 2] = ["*.clusterserviceversion.yaml", "*.clusterserviceversion.yml"];

/// One version of an operator
#[derive(Clone)]
pub struct Bundle {
    inner: Rc<BundleInner>,
}

struct BundleInner {
    operator_name: String,
    operator_version: String,
    root: PathBuf,
    operator: Parent<OperatorInner>,
    annotations: OnceCell<Mapping>,
    dependencies: OnceCell<Vec<Value>>,
    csv_file_name: OnceCell<PathBuf>,
    csv: OnceCell<Value>,
    csv_identity: OnceCell<(String, String)>,
    sort_identity: OnceCell<(String, String)>,
    version_key: OnceCell<VersionKey>,
}

impl Bundle {
    /// Open the bundle at `path`; its operator is resolved on demand
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_parent(path.as_ref(), Parent::detached())
    }

    pub(crate) fn attached(path: PathBuf, operator: &Rc<OperatorInner>) -> Result<Self> {
        Self::with_parent(&path, Parent::attached(operator))
    }

    fn with_parent(path: &Path, operator: Parent<OperatorInner>) -> Result<Self> {
        let root = resolve_path(path);
        if !Self::probe(&root) {
            return Err(Error::InvalidBundle { path: root });
        }
        let operator_version = file_name(&root);
        let operator_name = root.parent().map(file_name).unwrap_or_default();
        debug!(
            "Loaded bundle {}/{} from {}",
            operator_name,
            operator_version,
            root.display()
        );
        Ok(Self {
            inner: Rc::new(BundleInner {
                operator_name,
                operator_version,
                root,
                operator,
                annotations: OnceCell::new(),
                dependencies: OnceCell::new(),
                csv_file_name: OnceCell::new(),
                csv: OnceCell::new(),
                csv_identity: OnceCell::new(),
                sort_identity: OnceCell::new(),
                version_key: OnceCell::new(),
            }),
        })
    }

    /// A bundle is a directory with both `metadata` and `manifests`
    pub fn probe(path: &Path) -> bool {
        path.is_dir() && path.join(METADATA_DIR).is_dir() && path.join(MANIFESTS_DIR).is_dir()
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// Operator name from the filesystem position
    pub fn operator_name(&self) -> &str {
        &self.inner.operator_name
    }

    /// Version from the filesystem position
    pub fn operator_version(&self) -> &str {
        &self.inner.operator_version
    }

    /// The operator this bundle belongs to
    pub fn operator(&self) -> Result<Operator> {
        let inner = self.inner.operator.resolve(|| {
            let operator_root = self
                .inner
                .root
                .parent()
                .ok_or_else(|| Error::InvalidOperator {
                    path: self.inner.root.clone(),
                })?;
            Ok(Operator::new(operator_root)?.into_inner())
        })?;
        Ok(Operator::from_inner(inner))
    }

    /// Load a YAML document from the `metadata` directory
    ///
    /// A missing or empty file yields an empty mapping. Any other
    /// non-mapping document is a content error.
    pub fn load_metadata(&self, filename: &str) -> Result<Mapping> {
        let path = self.inner.root.join(METADATA_DIR).join(filename);
        match yaml::load_yaml(&path) {
            Ok(Value::Mapping(mapping)) => Ok(mapping),
            Ok(Value::Null) => Ok(Mapping::new()),
            Ok(_) => Err(Error::BundleContent {
                message: format!("Invalid {} contents ({})", filename, path.display()),
            }),
            Err(err) if err.is_not_found() => Ok(Mapping::new()),
            Err(err) => Err(err),
        }
    }

    /// The `annotations` mapping of `metadata/annotations.yaml`
    pub fn annotations(&self) -> Result<&Mapping> {
        self.inner.annotations.get_or_try_init(|| {
            match self.load_metadata("annotations.yaml")?.remove("annotations") {
                Some(Value::Mapping(annotations)) => Ok(annotations),
                None | Some(Value::Null) => Ok(Mapping::new()),
                Some(_) => Err(Error::BundleContent {
                    message: format!("Invalid annotations.yaml contents for {}", self),
                }),
            }
        })
    }

    /// The `dependencies` list of `metadata/dependencies.yaml`
    pub fn dependencies(&self) -> Result<&[Value]> {
        self.inner
            .dependencies
            .get_or_try_init(|| {
                match self.load_metadata("dependencies.yaml")?.remove("dependencies") {
                    Some(Value::Sequence(dependencies)) => Ok(dependencies),
                    None | Some(Value::Null) => Ok(Vec::new()),
                    Some(_) => Err(Error::BundleContent {
                        message: format!("Invalid dependencies.yaml contents for {}", self),
                    }),
                }
            })
            .map(Vec::as_slice)
    }

    /// Path of the ClusterServiceVersion manifest
    pub fn csv_file_name(&self) -> Result<&Path> {
        self.inner
            .csv_file_name
            .get_or_try_init(|| {
                let manifests = self.inner.root.join(MANIFESTS_DIR);
                let escaped = glob::Pattern::escape(&manifests.to_string_lossy());
                for pattern in CSV_PATTERNS {
                    let mut matches: Vec<PathBuf> = glob::glob(&format!("{}/{}", escaped, pattern))?
                        .filter_map(|entry| entry.ok())
                        .collect();
                    matches.sort();
                    if let Some(first) = matches.into_iter().next() {
                        return Ok(first);
                    }
                }
                Err(Error::BundleContent {
                    message: format!(
                        "CSV file for {}/{} not found",
                        self.inner.operator_name, self.inner.operator_version
                    ),
                })
            })
            .map(PathBuf::as_path)
    }

    /// The ClusterServiceVersion document (always a mapping)
    pub fn csv(&self) -> Result<&Value> {
        self.inner.csv.get_or_try_init(|| {
            let path = self.csv_file_name()?;
            let document = yaml::load_yaml(path)?;
            if !document.is_mapping() {
                return Err(Error::BundleContent {
                    message: format!("Invalid CSV contents ({})", path.display()),
                });
            }
            Ok(document)
        })
    }

    fn csv_identity(&self) -> Result<&(String, String)> {
        self.inner.csv_identity.get_or_try_init(|| {
            yaml::lookup_str(self.csv()?, "metadata.name")
                .and_then(|name| name.split_once('.'))
                .map(|(name, version)| {
                    (name.to_string(), version::strip_prefix(version).to_string())
                })
                .ok_or_else(|| Error::BundleContent {
                    message: format!("CSV for {} has invalid .metadata.name", self),
                })
        })
    }

    /// Operator name from the CSV `.metadata.name`
    pub fn csv_operator_name(&self) -> Result<&str> {
        self.csv_identity().map(|(name, _)| name.as_str())
    }

    /// Version from the CSV `.metadata.name`, without a leading `v`
    pub fn csv_operator_version(&self) -> Result<&str> {
        self.csv_identity().map(|(_, version)| version.as_str())
    }

    fn annotation(&self, key: &str) -> Result<Option<&str>> {
        Ok(self.annotations()?.get(key).and_then(Value::as_str))
    }

    /// Channels declared in the annotations; empty when absent
    pub fn channels(&self) -> Result<BTreeSet<String>> {
        Ok(self
            .annotation(CHANNELS_ANNOTATION)?
            .map(|channels| {
                channels
                    .split(',')
                    .map(str::trim)
                    .filter(|channel| !channel.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Default channel declared in the annotations
    pub fn default_channel(&self) -> Result<Option<String>> {
        Ok(self
            .annotation(DEFAULT_CHANNEL_ANNOTATION)?
            .map(str::trim)
            .filter(|channel| !channel.is_empty())
            .map(str::to_string))
    }

    /// Operator name declared in the annotations
    pub fn metadata_operator_name(&self) -> Result<Option<String>> {
        Ok(self.annotation(PACKAGE_ANNOTATION)?.map(str::to_string))
    }

    /// CSV identity, or the filesystem identity when the CSV is unusable
    fn sort_identity(&self) -> &(String, String) {
        self.inner
            .sort_identity
            .get_or_init(|| match self.csv_identity() {
                Ok(identity) => identity.clone(),
                Err(err) => {
                    warn!("{}: using filesystem identity for ordering: {}", self, err);
                    (
                        self.inner.operator_name.clone(),
                        self.inner.operator_version.clone(),
                    )
                }
            })
    }

    /// Version used to order this bundle among its siblings
    pub fn sort_key(&self) -> &str {
        &self.sort_identity().1
    }

    fn version_key(&self) -> &VersionKey {
        self.inner
            .version_key
            .get_or_init(|| VersionKey::new(self.sort_key()))
    }

    /// Returns true if both handles share the same cached state
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Rc::ptr_eq(&this.inner, &other.inner)
    }
}

impl PartialEq for Bundle {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Bundle {}

impl PartialOrd for Bundle {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Bundle {
    fn cmp(&self, other: &Self) -> Ordering {
        let (name, _) = self.sort_identity();
        let (other_name, _) = other.sort_identity();
        name.cmp(other_name)
            .then_with(|| self.version_key().cmp(other.version_key()))
    }
}

impl Hash for Bundle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.operator_name.hash(state);
        self.inner.operator_version.hash(state);
    }
}

impl fmt::Display for Bundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Bundle({}/{})",
            self.inner.operator_name, self.inner.operator_version
        )
    }
}

impl fmt::Debug for Bundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bundle")
            .field("operator_name", &self.inner.operator_name)
            .field("operator_version", &self.inner.operator_version)
            .field("root", &self.inner.root)
            .field("operator", &self.inner.operator)
            .finish()
    }
}

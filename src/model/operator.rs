//! Operators: the named packages of a repository

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::{debug, info};
use once_cell::unsync::OnceCell;

use crate::cache::MemoCache;
use crate::config::{self, OperatorConfig};
use crate::error::{Error, Result};
use crate::graph::{self, UpdateGraph, UpdateStrategy};
use crate::model::bundle::Bundle;
use crate::model::catalog::OperatorCatalogList;
use crate::model::repo::{Repo, RepoInner};
use crate::model::{child_dirs, file_name, resolve_path, Parent};
use crate::version;

/// Per-operator configuration file
pub const OPERATOR_CONFIG: &str = "ci.yaml";

/// A named operator and its bundles
#[derive(Clone)]
pub struct Operator {
    inner: Rc<OperatorInner>,
}

pub(crate) struct OperatorInner {
    name: String,
    root: PathBuf,
    repo: Parent<RepoInner>,
    config: OnceCell<OperatorConfig>,
    bundles: MemoCache<String, Bundle>,
    channels: OnceCell<BTreeSet<String>>,
    default_channel: OnceCell<Option<String>>,
}

impl Operator {
    /// Open the operator at `path`; its repository is resolved on demand
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_parent(path.as_ref(), Parent::detached())
    }

    pub(crate) fn attached(path: PathBuf, repo: &Rc<RepoInner>) -> Result<Self> {
        Self::with_parent(&path, Parent::attached(repo))
    }

    fn with_parent(path: &Path, repo: Parent<RepoInner>) -> Result<Self> {
        let root = resolve_path(path);
        if !Self::probe(&root) {
            return Err(Error::InvalidOperator { path: root });
        }
        let name = file_name(&root);
        debug!("Loaded operator {} from {}", name, root.display());
        Ok(Self {
            inner: Rc::new(OperatorInner {
                name,
                root,
                repo,
                config: OnceCell::new(),
                bundles: MemoCache::new(),
                channels: OnceCell::new(),
                default_channel: OnceCell::new(),
            }),
        })
    }

    /// An operator is a directory containing at least one bundle
    pub fn probe(path: &Path) -> bool {
        path.is_dir()
            && child_dirs(path)
                .map(|dirs| dirs.iter().any(|dir| Bundle::probe(dir)))
                .unwrap_or(false)
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The repository this operator belongs to
    pub fn repo(&self) -> Result<Repo> {
        let inner = self.inner.repo.resolve(|| {
            let repo_root = self
                .inner
                .root
                .parent()
                .and_then(Path::parent)
                .ok_or_else(|| Error::InvalidRepo {
                    path: self.inner.root.clone(),
                })?;
            Ok(Repo::new(repo_root)?.into_inner())
        })?;
        Ok(Repo::from_inner(inner))
    }

    /// Operator configuration from `ci.yaml`; empty when the file is absent
    pub fn config(&self) -> Result<&OperatorConfig> {
        self.inner.config.get_or_try_init(|| {
            match config::from_file(&self.inner.root.join(OPERATOR_CONFIG)) {
                Err(err) if err.is_not_found() => {
                    info!("{} has no {}", self, OPERATOR_CONFIG);
                    Ok(OperatorConfig::default())
                }
                other => other,
            }
        })
    }

    pub fn bundle_path(&self, version: &str) -> PathBuf {
        self.inner.root.join(version)
    }

    /// Resolve a bundle by version, sharing the instance across lookups
    pub fn bundle(&self, version: &str) -> Result<Bundle> {
        self.inner
            .bundles
            .get_or_try_insert_with(version.to_string(), || {
                Bundle::attached(self.bundle_path(version), &self.inner)
            })
    }

    /// Returns true if `version` is a valid bundle of this operator
    pub fn has(&self, version: &str) -> bool {
        Bundle::probe(&self.bundle_path(version))
    }

    /// Every valid bundle, in directory name order
    pub fn all_bundles(&self) -> Result<Vec<Bundle>> {
        child_dirs(&self.inner.root)?
            .iter()
            .filter(|path| Bundle::probe(path))
            .map(|path| self.bundle(&file_name(path)))
            .collect()
    }

    /// Every channel any bundle of this operator belongs to
    pub fn channels(&self) -> Result<BTreeSet<String>> {
        self.inner
            .channels
            .get_or_try_init(|| {
                let mut channels = BTreeSet::new();
                for bundle in self.all_bundles()? {
                    channels.extend(bundle.channels()?);
                }
                Ok(channels)
            })
            .cloned()
    }

    /// Default channel declared by the highest-version bundle declaring one
    pub fn default_channel(&self) -> Result<Option<String>> {
        self.inner
            .default_channel
            .get_or_try_init(|| {
                let mut declared = Vec::new();
                for bundle in self.all_bundles()? {
                    if let Some(channel) = bundle.default_channel()? {
                        declared.push((bundle, channel));
                    }
                }
                Ok(version::max_by_version(declared, |(bundle, _)| bundle.sort_key())
                    .map(|(_, channel)| channel))
            })
            .cloned()
    }

    /// Bundles belonging to `channel`, lowest version first
    pub fn channel_bundles(&self, channel: &str) -> Result<Vec<Bundle>> {
        let mut members = Vec::new();
        for bundle in self.all_bundles()? {
            if bundle.channels()?.contains(channel) {
                members.push(bundle);
            }
        }
        version::sort_by_version(&mut members, Bundle::sort_key);
        Ok(members)
    }

    /// Highest-version bundle of `channel`
    pub fn head(&self, channel: &str) -> Result<Bundle> {
        self.channel_bundles(channel)?
            .pop()
            .ok_or_else(|| Error::EmptyChannel {
                operator: self.to_string(),
                channel: channel.to_string(),
            })
    }

    /// Update strategy selected by `updateGraph` in `ci.yaml`
    pub fn update_strategy(&self) -> Result<UpdateStrategy> {
        match self.config()?.update_graph.as_deref() {
            None => Ok(UpdateStrategy::default()),
            Some(value) => value
                .parse()
                .map_err(|strategy| Error::UnsupportedUpdateStrategy {
                    operator: self.to_string(),
                    strategy,
                }),
        }
    }

    /// Upgrade edges between the bundles of `channel`
    pub fn update_graph(&self, channel: &str) -> Result<UpdateGraph> {
        graph::build(self, channel)
    }

    /// Catalog entries for this operator across every catalog of the repo
    pub fn all_operator_catalogs(&self) -> Result<OperatorCatalogList> {
        let mut found = OperatorCatalogList::new();
        for catalog in self.repo()?.all_catalogs()? {
            if catalog.has(self.name()) {
                found.push(catalog.operator_catalog(self.name())?);
            }
        }
        Ok(found)
    }

    /// Returns true if both handles share the same cached state
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Rc::ptr_eq(&this.inner, &other.inner)
    }

    pub(crate) fn from_inner(inner: Rc<OperatorInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn into_inner(self) -> Rc<OperatorInner> {
        self.inner
    }
}

impl PartialEq for Operator {
    fn eq(&self, other: &Self) -> bool {
        self.inner.name == other.inner.name
    }
}

impl Eq for Operator {}

impl PartialOrd for Operator {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Operator {
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner.name.cmp(&other.inner.name)
    }
}

impl Hash for Operator {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.name.hash(state);
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Operator({})", self.inner.name)
    }
}

impl fmt::Debug for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operator")
            .field("name", &self.inner.name)
            .field("root", &self.inner.root)
            .field("repo", &self.inner.repo)
            .finish()
    }
}

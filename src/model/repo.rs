//! The repository root

use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::{debug, warn};
use once_cell::unsync::OnceCell;

use crate::cache::MemoCache;
use crate::config::{self, PipelineConfig};
use crate::error::{Error, Result};
use crate::model::catalog::Catalog;
use crate::model::operator::Operator;
use crate::model::{child_dirs, file_name, resolve_path};

/// Directory holding one subdirectory per operator
pub const OPERATORS_DIR: &str = "operators";
/// Directory holding one subdirectory per catalog
pub const CATALOGS_DIR: &str = "catalogs";
/// Repository-wide configuration file
pub const PIPELINE_CONFIG: &str = "ci/pipeline-config.yaml";

/// A repository of operators and catalogs
#[derive(Clone)]
pub struct Repo {
    inner: Rc<RepoInner>,
}

pub(crate) struct RepoInner {
    root: PathBuf,
    config: OnceCell<PipelineConfig>,
    operators: MemoCache<String, Operator>,
    catalogs: MemoCache<String, Catalog>,
}

impl Repo {
    /// Open the repository rooted at `path`
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let root = resolve_path(path.as_ref());
        if !Self::probe(&root) {
            return Err(Error::InvalidRepo { path: root });
        }
        debug!("Opened repository {}", root.display());
        Ok(Self {
            inner: Rc::new(RepoInner {
                root,
                config: OnceCell::new(),
                operators: MemoCache::new(),
                catalogs: MemoCache::new(),
            }),
        })
    }

    /// A repository is a directory with an `operators` subdirectory
    pub fn probe(path: &Path) -> bool {
        path.is_dir() && path.join(OPERATORS_DIR).is_dir()
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// Repository-wide configuration; empty when the file is absent
    pub fn config(&self) -> Result<&PipelineConfig> {
        self.inner.config.get_or_try_init(|| {
            match config::from_file(&self.inner.root.join(PIPELINE_CONFIG)) {
                Err(err) if err.is_not_found() => {
                    warn!("{} has no pipeline configuration: {}", self, err);
                    Ok(PipelineConfig::default())
                }
                other => other,
            }
        })
    }

    pub fn operator_path(&self, name: &str) -> PathBuf {
        self.inner.root.join(OPERATORS_DIR).join(name)
    }

    /// Resolve an operator by name, sharing the instance across lookups
    pub fn operator(&self, name: &str) -> Result<Operator> {
        self.inner
            .operators
            .get_or_try_insert_with(name.to_string(), || {
                Operator::attached(self.operator_path(name), &self.inner)
            })
    }

    /// Returns true if `name` is a valid operator of this repository
    pub fn has(&self, name: &str) -> bool {
        Operator::probe(&self.operator_path(name))
    }

    /// Every valid operator, in directory name order
    pub fn all_operators(&self) -> Result<Vec<Operator>> {
        child_dirs(&self.inner.root.join(OPERATORS_DIR))?
            .iter()
            .filter(|path| Operator::probe(path))
            .map(|path| self.operator(&file_name(path)))
            .collect()
    }

    pub fn catalog_path(&self, name: &str) -> PathBuf {
        self.inner.root.join(CATALOGS_DIR).join(name)
    }

    /// Resolve a catalog by name, sharing the instance across lookups
    pub fn catalog(&self, name: &str) -> Result<Catalog> {
        self.inner
            .catalogs
            .get_or_try_insert_with(name.to_string(), || {
                Catalog::attached(self.catalog_path(name), &self.inner)
            })
    }

    pub fn has_catalog(&self, name: &str) -> bool {
        Catalog::probe(&self.catalog_path(name))
    }

    /// Every valid catalog, in directory name order
    pub fn all_catalogs(&self) -> Result<Vec<Catalog>> {
        child_dirs(&self.inner.root.join(CATALOGS_DIR))?
            .iter()
            .filter(|path| Catalog::probe(path))
            .map(|path| self.catalog(&file_name(path)))
            .collect()
    }

    pub(crate) fn from_inner(inner: Rc<RepoInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn into_inner(self) -> Rc<RepoInner> {
        self.inner
    }
}

impl PartialEq for Repo {
    fn eq(&self, other: &Self) -> bool {
        self.inner.root == other.inner.root
    }
}

impl Eq for Repo {}

impl fmt::Display for Repo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Repo({})", self.inner.root.display())
    }
}

impl fmt::Debug for Repo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repo")
            .field("root", &self.inner.root)
            .field("operators", &self.inner.operators.len())
            .field("catalogs", &self.inner.catalogs.len())
            .finish()
    }
}

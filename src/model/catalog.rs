//! File-based catalogs
//!
//! `catalogs/<catalog>/<operator>/catalog.yaml` holds the file-based-catalog
//! documents (`olm.package`, `olm.channel`, `olm.bundle`, ...) that publish
//! one operator in one catalog.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::debug;
use once_cell::unsync::OnceCell;
use serde_yaml::Value;

use crate::cache::MemoCache;
use crate::error::{Error, Result};
use crate::model::operator::Operator;
use crate::model::repo::{Repo, RepoInner};
use crate::model::{child_dirs, file_name, resolve_path, Parent};
use crate::yaml;

/// Name of the file holding an operator's catalog content
pub const CATALOG_FILE: &str = "catalog.yaml";

/// A named catalog of the repository
#[derive(Clone)]
pub struct Catalog {
    inner: Rc<CatalogInner>,
}

pub(crate) struct CatalogInner {
    name: String,
    root: PathBuf,
    repo: Parent<RepoInner>,
    operator_catalogs: MemoCache<String, OperatorCatalog>,
}

impl Catalog {
    /// Open the catalog at `path`; its repository is resolved on demand
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_parent(path.as_ref(), Parent::detached())
    }

    pub(crate) fn attached(path: PathBuf, repo: &Rc<RepoInner>) -> Result<Self> {
        Self::with_parent(&path, Parent::attached(repo))
    }

    fn with_parent(path: &Path, repo: Parent<RepoInner>) -> Result<Self> {
        let root = resolve_path(path);
        if !Self::probe(&root) {
            return Err(Error::InvalidCatalog { path: root });
        }
        let name = file_name(&root);
        debug!("Loaded catalog {} from {}", name, root.display());
        Ok(Self {
            inner: Rc::new(CatalogInner {
                name,
                root,
                repo,
                operator_catalogs: MemoCache::new(),
            }),
        })
    }

    /// A catalog is a directory containing at least one operator catalog
    pub fn probe(path: &Path) -> bool {
        path.is_dir()
            && child_dirs(path)
                .map(|dirs| dirs.iter().any(|dir| OperatorCatalog::probe(dir)))
                .unwrap_or(false)
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

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

    pub fn operator_catalog_path(&self, operator_name: &str) -> PathBuf {
        self.inner.root.join(operator_name)
    }

    /// Resolve an operator's entry in this catalog
    pub fn operator_catalog(&self, operator_name: &str) -> Result<OperatorCatalog> {
        self.inner
            .operator_catalogs
            .get_or_try_insert_with(operator_name.to_string(), || {
                OperatorCatalog::attached(self.operator_catalog_path(operator_name), &self.inner)
            })
    }

    pub fn has(&self, operator_name: &str) -> bool {
        OperatorCatalog::probe(&self.operator_catalog_path(operator_name))
    }

    /// Every operator catalog, in directory name order
    pub fn all_operator_catalogs(&self) -> Result<Vec<OperatorCatalog>> {
        child_dirs(&self.inner.root)?
            .iter()
            .filter(|path| OperatorCatalog::probe(path))
            .map(|path| self.operator_catalog(&file_name(path)))
            .collect()
    }

    pub(crate) fn from_inner(inner: Rc<CatalogInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn into_inner(self) -> Rc<CatalogInner> {
        self.inner
    }
}

impl PartialEq for Catalog {
    fn eq(&self, other: &Self) -> bool {
        self.inner.name == other.inner.name
    }
}

impl Eq for Catalog {}

impl PartialOrd for Catalog {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Catalog {
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner.name.cmp(&other.inner.name)
    }
}

impl fmt::Display for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Catalog({})", self.inner.name)
    }
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Catalog")
            .field("name", &self.inner.name)
            .field("root", &self.inner.root)
            .field("repo", &self.inner.repo)
            .finish()
    }
}

/// One operator's content in one catalog
#[derive(Clone)]
pub struct OperatorCatalog {
    inner: Rc<OperatorCatalogInner>,
}

struct OperatorCatalogInner {
    operator_name: String,
    catalog_name: String,
    root: PathBuf,
    catalog: Parent<CatalogInner>,
    content: OnceCell<Vec<Value>>,
}

impl OperatorCatalog {
    /// Open the operator catalog at `path`; its catalog is resolved on demand
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_parent(path.as_ref(), Parent::detached())
    }

    pub(crate) fn attached(path: PathBuf, catalog: &Rc<CatalogInner>) -> Result<Self> {
        Self::with_parent(&path, Parent::attached(catalog))
    }

    fn with_parent(path: &Path, catalog: Parent<CatalogInner>) -> Result<Self> {
        let root = resolve_path(path);
        if !Self::probe(&root) {
            return Err(Error::InvalidOperatorCatalog { path: root });
        }
        let operator_name = file_name(&root);
        let catalog_name = root.parent().map(file_name).unwrap_or_default();
        Ok(Self {
            inner: Rc::new(OperatorCatalogInner {
                operator_name,
                catalog_name,
                root,
                catalog,
                content: OnceCell::new(),
            }),
        })
    }

    /// An operator catalog is a directory containing `catalog.yaml`
    pub fn probe(path: &Path) -> bool {
        path.is_dir() && yaml::find_yaml(&path.join(CATALOG_FILE)).is_ok()
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    pub fn operator_name(&self) -> &str {
        &self.inner.operator_name
    }

    pub fn catalog_name(&self) -> &str {
        &self.inner.catalog_name
    }

    pub fn catalog(&self) -> Result<Catalog> {
        let inner = self.inner.catalog.resolve(|| {
            let catalog_root = self
                .inner
                .root
                .parent()
                .ok_or_else(|| Error::InvalidCatalog {
                    path: self.inner.root.clone(),
                })?;
            Ok(Catalog::new(catalog_root)?.into_inner())
        })?;
        Ok(Catalog::from_inner(inner))
    }

    pub fn repo(&self) -> Result<Repo> {
        self.catalog()?.repo()
    }

    /// The operator this entry publishes
    pub fn operator(&self) -> Result<Operator> {
        self.repo()?.operator(&self.inner.operator_name)
    }

    pub fn catalog_content_path(&self) -> Result<PathBuf> {
        yaml::find_yaml(&self.inner.root.join(CATALOG_FILE))
    }

    /// Every YAML document of `catalog.yaml`
    pub fn catalog_content(&self) -> Result<&[Value]> {
        self.inner
            .content
            .get_or_try_init(|| yaml::load_yaml_documents(&self.catalog_content_path()?))
            .map(Vec::as_slice)
    }

    fn identity(&self) -> (&str, &str) {
        (self.inner.catalog_name.as_str(), self.inner.operator_name.as_str())
    }
}

impl PartialEq for OperatorCatalog {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for OperatorCatalog {}

impl PartialOrd for OperatorCatalog {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OperatorCatalog {
    fn cmp(&self, other: &Self) -> Ordering {
        self.identity().cmp(&other.identity())
    }
}

impl Hash for OperatorCatalog {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl fmt::Display for OperatorCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "OperatorCatalog({}/{})",
            self.inner.catalog_name, self.inner.operator_name
        )
    }
}

impl fmt::Debug for OperatorCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorCatalog")
            .field("catalog_name", &self.inner.catalog_name)
            .field("operator_name", &self.inner.operator_name)
            .field("root", &self.inner.root)
            .finish()
    }
}

/// Insertion-ordered set of operator catalogs, unique by identity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperatorCatalogList {
    items: Vec<OperatorCatalog>,
}

impl OperatorCatalogList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `item` unless an entry with the same identity is present.
    /// Returns true if it was added.
    pub fn push(&mut self, item: OperatorCatalog) -> bool {
        if self.contains(&item) {
            return false;
        }
        self.items.push(item);
        true
    }

    pub fn contains(&self, item: &OperatorCatalog) -> bool {
        self.items.contains(item)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, OperatorCatalog> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl FromIterator<OperatorCatalog> for OperatorCatalogList {
    fn from_iter<T: IntoIterator<Item = OperatorCatalog>>(iter: T) -> Self {
        let mut list = Self::new();
        for item in iter {
            list.push(item);
        }
        list
    }
}

impl IntoIterator for OperatorCatalogList {
    type Item = OperatorCatalog;
    type IntoIter = std::vec::IntoIter<OperatorCatalog>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a OperatorCatalogList {
    type Item = &'a OperatorCatalog;
    type IntoIter = std::slice::Iter<'a, OperatorCatalog>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl fmt::Display for OperatorCatalogList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items: Vec<String> = self.items.iter().map(ToString::to_string).collect();
        write!(f, "[{}]", items.join(", "))
    }
}

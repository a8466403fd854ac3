//! # Resource Model
//!
//! Lazily-resolved handles over an operator repository on disk:
//!
//! ```text
//! Repo ── operators/<name>/           Operator
//!    │        └── <version>/          Bundle
//!    └─── catalogs/<catalog>/         Catalog
//!             └── <operator>/         OperatorCatalog
//! ```
//!
//! Every handle is a cheap `Rc` clone. Parents own their children through
//! per-parent [`MemoCache`](crate::cache::MemoCache)s, so resolving the same
//! child twice yields the same shared instance. Children refer back to their
//! parent through a `Weak` link; when the parent is gone, or the child was
//! constructed directly from a path, the parent is re-materialized from the
//! filesystem on first use and kept alive by the child.
//!
//! Content-bearing properties (annotations, CSV, configuration, channels) are
//! read on first access and cached for the lifetime of the handle. Handles
//! are not thread-safe.

pub mod bundle;
pub mod catalog;
pub mod operator;
pub mod repo;

pub use bundle::Bundle;
pub use catalog::{Catalog, OperatorCatalog, OperatorCatalogList};
pub use operator::Operator;
pub use repo::Repo;

use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};

use once_cell::unsync::OnceCell;
use walkdir::WalkDir;

use crate::error::Result;

/// Annotation holding the operator (package) name
pub const PACKAGE_ANNOTATION: &str = "operators.operatorframework.io.bundle.package.v1";
/// Annotation holding the default channel of a bundle
pub const DEFAULT_CHANNEL_ANNOTATION: &str =
    "operators.operatorframework.io.bundle.channel.default.v1";
/// Annotation holding the comma-separated channels of a bundle
pub const CHANNELS_ANNOTATION: &str = "operators.operatorframework.io.bundle.channels.v1";

/// Back-reference from a child handle to its parent's shared state
pub(crate) struct Parent<I> {
    attached: Weak<I>,
    detached: OnceCell<Rc<I>>,
}

impl<I> Parent<I> {
    /// Link to a parent that owns the child through its cache
    pub(crate) fn attached(parent: &Rc<I>) -> Self {
        Self {
            attached: Rc::downgrade(parent),
            detached: OnceCell::new(),
        }
    }

    /// No known parent yet: it will be materialized on first use
    pub(crate) fn detached() -> Self {
        Self {
            attached: Weak::new(),
            detached: OnceCell::new(),
        }
    }

    /// Upgrade the weak link, or materialize (once) and keep the parent
    pub(crate) fn resolve<F>(&self, materialize: F) -> Result<Rc<I>>
    where
        F: FnOnce() -> Result<Rc<I>>,
    {
        if let Some(parent) = self.attached.upgrade() {
            return Ok(parent);
        }
        self.detached.get_or_try_init(materialize).cloned()
    }
}

impl<I> fmt::Debug for Parent<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.attached.strong_count() > 0 {
            "attached"
        } else if self.detached.get().is_some() {
            "materialized"
        } else {
            "detached"
        };
        f.write_str(state)
    }
}

/// Canonicalize a path, falling back to its absolute form when it does not
/// exist (or cannot be resolved)
pub(crate) fn resolve_path(path: &Path) -> PathBuf {
    path.canonicalize()
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Last component of a path as a string
pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Subdirectories of `dir`, sorted by file name; empty if `dir` is missing
pub(crate) fn child_dirs(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut dirs = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if entry.path().is_dir() {
            dirs.push(entry.into_path());
        }
    }
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_child_dirs_sorted_and_filtered() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("b")).unwrap();
        fs::create_dir(temp.path().join("a")).unwrap();
        fs::write(temp.path().join("file.txt"), "x").unwrap();

        let names: Vec<String> = child_dirs(temp.path())
            .unwrap()
            .iter()
            .map(|p| file_name(p))
            .collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(child_dirs(&temp.path().join("missing")).unwrap().is_empty());
    }

    #[test]
    fn test_resolve_path_missing_is_absolute() {
        let resolved = resolve_path(Path::new("does/not/exist"));
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("does/not/exist"));
    }

    #[test]
    fn test_parent_materializes_once() {
        let parent: Parent<String> = Parent::detached();
        let first = parent.resolve(|| Ok(Rc::new("repo".to_string()))).unwrap();
        let second = parent
            .resolve(|| Ok(Rc::new("other".to_string())))
            .unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(format!("{:?}", parent), "materialized");
    }

    #[test]
    fn test_parent_prefers_live_link() {
        let owner = Rc::new("owner".to_string());
        let parent = Parent::attached(&owner);
        let resolved = parent.resolve(|| Ok(Rc::new("fallback".to_string()))).unwrap();
        assert!(Rc::ptr_eq(&owner, &resolved));

        drop(resolved);
        drop(owner);
        let resolved = parent.resolve(|| Ok(Rc::new("fallback".to_string()))).unwrap();
        assert_eq!(resolved.as_str(), "fallback");
    }
}

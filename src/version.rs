//! # Version Ordering
//!
//! Bundle versions are compared with a semantic-version-aware order that
//! degrades gracefully: when a version cannot be parsed as semver, it is
//! still ordered and a warning is logged instead of failing. Malformed
//! versions therefore lower the precision of channel and graph computations
//! but never abort them.
//!
//! ## Rules
//!
//! 1.  A single leading `v` is stripped (`v1.2.3` and `1.2.3` are the same
//!     version).
//! 2.  Versions that parse as semver are compared numerically.
//! 3.  Versions that do not parse sort before every semver version and are
//!     compared byte by byte among themselves.
//!
//! The rules define one total order, captured by [`VersionKey`]. Pairwise
//! [`compare`], [`sort_by_version`] and bundle ordering all go through it, so
//! mixing parseable and unparseable versions keeps every order consistent.

use std::cmp::Ordering;

use log::warn;
use semver::Version;

/// Sort key of a version string.
///
/// Unparseable versions order before semver ones (variant order), so a
/// malformed version never becomes a channel head over a valid one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VersionKey {
    Lexical(String),
    Semver(Version),
}

impl VersionKey {
    pub fn new(version: &str) -> Self {
        match parse(version) {
            Some(parsed) => VersionKey::Semver(parsed),
            None => VersionKey::Lexical(strip_prefix(version).to_string()),
        }
    }

    pub fn is_semver(&self) -> bool {
        matches!(self, VersionKey::Semver(_))
    }
}

/// Strip a single leading `v` from a version string
pub fn strip_prefix(version: &str) -> &str {
    version.strip_prefix('v').unwrap_or(version)
}

/// Parse a version string as semver, ignoring a leading `v`
pub fn parse(version: &str) -> Option<Version> {
    Version::parse(strip_prefix(version)).ok()
}

/// Returns true if the version string is valid semver (leading `v` allowed)
pub fn is_semver(version: &str) -> bool {
    parse(version).is_some()
}

/// Compare two version strings.
///
/// Uses semver ordering when both versions parse. Otherwise unparseable
/// versions sort first and compare lexically; this fallback is logged at
/// warning level.
pub fn compare(a: &str, b: &str) -> Ordering {
    let (left, right) = (VersionKey::new(a), VersionKey::new(b));
    if !(left.is_semver() && right.is_semver()) {
        warn!(
            "Can't compare versions {} and {} as semver: using lexical order instead",
            a, b
        );
    }
    left.cmp(&right)
}

/// Sort items by a version key.
///
/// Items follow the order of [`compare`]. A single warning is logged when
/// any key is not valid semver. The sort is stable.
pub fn sort_by_version<T, F>(items: &mut [T], key: F)
where
    F: Fn(&T) -> &str,
{
    if !items.iter().all(|item| is_semver(key(item))) {
        warn!("Found versions that are not valid semver: ordering them before semver versions");
    }
    items.sort_by_cached_key(|item| VersionKey::new(key(item)));
}

/// Return the item with the highest version, using the same rule as
/// [`sort_by_version`].
pub fn max_by_version<T, F>(items: Vec<T>, key: F) -> Option<T>
where
    F: Fn(&T) -> &str,
{
    let mut items = items;
    sort_by_version(&mut items, key);
    items.pop()
}

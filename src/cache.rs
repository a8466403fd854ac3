//! Per-parent memoization of resolved child resources

use std::borrow::Borrow;
use std::cell::RefCell;
use std::collections::HashMap;
use std::hash::Hash;

/// Append-only cache mapping a child's name to its shared handle
///
/// Entries are never evicted: once a child has been resolved, every later
/// lookup returns the same handle for the lifetime of the parent.
#[derive(Debug)]
pub struct MemoCache<K, V> {
    entries: RefCell<HashMap<K, V>>,
}

impl<K, V> MemoCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Create a new empty cache
    pub fn new() -> Self {
        Self {
            entries: RefCell::new(HashMap::new()),
        }
    }

    /// Get a cached value without computing it
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.entries.borrow().get(key).cloned()
    }

    /// Check if a key exists in cache
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.entries.borrow().contains_key(key)
    }

    /// Get a cached value, or compute and cache it if not present
    ///
    /// A failed computation caches nothing. The borrow is released while
    /// `resolve` runs, so it may consult this cache itself.
    pub fn get_or_try_insert_with<F, E>(&self, key: K, resolve: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(cached) = self.entries.borrow().get(&key) {
            return Ok(cached.clone());
        }

        let value = resolve()?;

        // First insertion wins
        Ok(self
            .entries
            .borrow_mut()
            .entry(key)
            .or_insert(value)
            .clone())
    }

    /// Get the number of cached entries
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Check if cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl<K, V> Default for MemoCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

//! Coalescing cache for externally fetched project metadata.
//!
//! Concurrent requests for the same key share one in-flight future, so the
//! upstream fetch runs once and every caller sees the same value. A change
//! event replaces the entry instead of mutating it: requests already holding
//! the old future finish with the old value, the next request fetches anew.

use std::hash::Hash;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::debug;

/// A shared, clonable handle to one fetch.
pub type SharedFetch<V> = Shared<BoxFuture<'static, V>>;

pub struct MetadataCache<K, V>
where
    V: Clone,
{
    entries: Mutex<FxHashMap<K, SharedFetch<V>>>,
}

impl<K, V> Default for MetadataCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn default() -> Self {
        Self {
            entries: Mutex::new(FxHashMap::default()),
        }
    }
}

impl<K, V> MetadataCache<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// The future for `key`, starting `fetch` only when no entry exists.
    ///
    /// `fetch` is called under the lock but only builds the future; nothing
    /// is polled until a caller awaits the returned handle.
    pub fn get_or_fetch<F>(&self, key: K, fetch: F) -> SharedFetch<V>
    where
        F: FnOnce() -> BoxFuture<'static, V>,
    {
        let mut entries = self.entries.lock();
        if let Some(existing) = entries.get(&key) {
            return existing.clone();
        }
        debug!(key = ?key, "fetching metadata");
        let shared = fetch().shared();
        entries.insert(key, shared.clone());
        shared
    }

    /// Drop the entry for `key`. Returns whether one existed.
    pub fn invalidate(&self, key: &K) -> bool {
        let removed = self.entries.lock().remove(key).is_some();
        if removed {
            debug!(key = ?key, "metadata invalidated");
        }
        removed
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

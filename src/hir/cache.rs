//! Snapshot publication and the per-project resolution cache.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use tracing::{info, trace};

use super::oracle::MemberKind;
use super::types::{MemberInfo, TypeInfo};

// ============================================================================
// SNAPSHOT CELL
// ============================================================================

/// Single-writer / multi-reader publication of an immutable value.
///
/// Readers get the current `Arc` and keep using it for as long as they like;
/// writers are serialized and replace the whole value at once, so a reader
/// sees either the old or the new snapshot.
#[derive(Debug)]
pub struct SnapshotCell<T> {
    current: RwLock<Arc<T>>,
    writer: Mutex<()>,
}

impl<T> SnapshotCell<T> {
    pub fn new(value: T) -> Self {
        Self {
            current: RwLock::new(Arc::new(value)),
            writer: Mutex::new(()),
        }
    }

    /// The published snapshot.
    pub fn load(&self) -> Arc<T> {
        Arc::clone(&self.current.read())
    }

    pub fn publish(&self, value: T) -> Arc<T> {
        let _guard = self.writer.lock();
        let value = Arc::new(value);
        *self.current.write() = Arc::clone(&value);
        value
    }

    /// Compute a successor from the current snapshot and publish it. Only
    /// one refresh runs at a time; on error nothing is published.
    pub fn refresh<E>(&self, build: impl FnOnce(&T) -> Result<T, E>) -> Result<Arc<T>, E> {
        let _guard = self.writer.lock();
        let current = self.load();
        let next = Arc::new(build(&current)?);
        *self.current.write() = Arc::clone(&next);
        Ok(next)
    }
}

impl<T: Default> Default for SnapshotCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

// ============================================================================
// RESOLUTION CACHE
// ============================================================================

/// Identifies a member lookup on one declaring type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MemberKey {
    pub name: SmolStr,
    pub arity: usize,
    pub kind: MemberKind,
}

impl MemberKey {
    pub fn new(name: impl Into<SmolStr>, arity: usize, kind: MemberKind) -> Self {
        Self {
            name: name.into(),
            arity,
            kind,
        }
    }
}

type MemberMap = FxHashMap<(SmolStr, MemberKey), Option<Arc<MemberInfo>>>;

/// One generation of memoized oracle answers.
#[derive(Debug, Default)]
struct Generation {
    id: u64,
    types: Mutex<FxHashMap<SmolStr, Option<Arc<TypeInfo>>>>,
    members: Mutex<MemberMap>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub generation: u64,
}

/// Memoizes oracle answers (including "does not exist") until the project
/// is told that type information changed.
///
/// Errors are never cached. A value computed while an invalidation happens
/// lands in the retired generation and is dropped with it.
#[derive(Debug)]
pub struct ResolutionCache {
    current: SnapshotCell<Generation>,
    next_generation: AtomicU64,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl Default for ResolutionCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self {
            current: SnapshotCell::new(Generation::default()),
            next_generation: AtomicU64::new(1),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Type by qualified name, computing it with `fetch` on a miss.
    pub fn type_info<E>(
        &self,
        name: &str,
        fetch: impl FnOnce() -> Result<Option<TypeInfo>, E>,
    ) -> Result<Option<Arc<TypeInfo>>, E> {
        let generation = self.current.load();
        if let Some(hit) = generation.types.lock().get(name) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(hit.clone());
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        trace!(type_name = name, "resolution cache miss");
        let value = fetch()?.map(Arc::new);
        generation
            .types
            .lock()
            .insert(SmolStr::new(name), value.clone());
        Ok(value)
    }

    /// Member of `declaring_type`, computing it with `fetch` on a miss.
    pub fn member<E>(
        &self,
        declaring_type: &str,
        key: MemberKey,
        fetch: impl FnOnce() -> Result<Option<MemberInfo>, E>,
    ) -> Result<Option<Arc<MemberInfo>>, E> {
        let generation = self.current.load();
        let map_key = (SmolStr::new(declaring_type), key);
        if let Some(hit) = generation.members.lock().get(&map_key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(hit.clone());
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let value = fetch()?.map(Arc::new);
        generation.members.lock().insert(map_key, value.clone());
        Ok(value)
    }

    /// Drop everything and start a new generation.
    pub fn invalidate(&self) {
        let id = self.next_generation.fetch_add(1, Ordering::SeqCst);
        self.current.publish(Generation {
            id,
            ..Default::default()
        });
        info!(generation = id, "resolution cache invalidated");
    }

    pub fn generation(&self) -> u64 {
        self.current.load().id
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            generation: self.generation(),
        }
    }
}

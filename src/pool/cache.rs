//! Bounded, key-addressed pool with lazy construction and LRU eviction

use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use linked_hash_map::LinkedHashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::entry::ResourceEntry;
use crate::error::{CacheError, Result};

/// Pool state guarded by the pool-wide lock.
///
/// The map keeps least-recently-used entries at the front; refreshing a
/// key moves it to the back. The pool-wide lock is held only for these
/// bookkeeping steps, never across construction or payload use.
pub(crate) struct PoolInner<K, T> {
    entries: LinkedHashMap<K, Arc<ResourceEntry<K, T>>>,
    capacity: Option<usize>,
}

impl<K, T> PoolInner<K, T>
where
    K: Clone + Eq + Hash + fmt::Display,
{
    /// Mark a key most-recently-used. Absent keys are ignored.
    pub(crate) fn refresh(&mut self, key: &K) {
        self.entries.get_refresh(key);
    }

    /// Evict least-recently-used entries until the pool is within bound.
    ///
    /// Entries still loading are never evicted, and neither is `keep`
    /// (the entry whose insertion triggered this check). Ties between
    /// eviction candidates fall to the oldest insertion, which is the
    /// map's front-to-back order.
    fn evict_over_capacity(&mut self, keep: &K) {
        let Some(capacity) = self.capacity else {
            return;
        };
        while self.entries.len() > capacity {
            let victim = self
                .entries
                .iter()
                .find(|(key, entry)| *key != keep && entry.is_ready())
                .map(|(key, _)| key.clone());
            match victim {
                Some(key) => {
                    self.entries.remove(&key);
                    info!("evicted least-recently-used resource '{}'", key);
                }
                None => break,
            }
        }
    }
}

/// A bounded, thread-safe, key-addressed cache of shared resources.
///
/// Lookups are atomic get-or-create: the first request for an absent key
/// inserts a placeholder and runs the construction callback outside the
/// pool-wide lock; concurrent requests for the same key find the
/// placeholder and wait on its readiness signal instead of constructing a
/// second time. Construction failures remove the placeholder and release
/// every waiter with a construction error.
///
/// Pools are cheap handles; clones share the same underlying cache.
/// Construct them once at startup and pass them to whatever needs cache
/// access.
#[derive(Clone)]
pub struct ResourcePool<K, T> {
    inner: Arc<Mutex<PoolInner<K, T>>>,
}

impl<K, T> ResourcePool<K, T>
where
    K: Clone + Eq + Hash + fmt::Display,
{
    /// Create a pool holding at most `capacity` entries.
    ///
    /// `None` or `Some(0)` disables eviction entirely.
    pub fn new(capacity: Option<usize>) -> Self {
        let capacity = capacity.filter(|bound| *bound > 0);
        Self {
            inner: Arc::new(Mutex::new(PoolInner {
                entries: LinkedHashMap::new(),
                capacity,
            })),
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    /// Return the cached entry for `key`, constructing it if absent.
    ///
    /// The `build` callback runs outside the pool-wide lock; it may block
    /// on disk or network I/O without stalling unrelated keys. All
    /// concurrent callers for the same key receive the same entry, and
    /// `build` runs at most once per insertion.
    pub async fn get_or_create<F, Fut>(&self, key: K, build: F) -> Result<Arc<ResourceEntry<K, T>>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let entry = {
            let mut inner = self.inner.lock().await;
            if let Some(existing) = inner.entries.get_refresh(&key) {
                let existing = existing.clone();
                drop(inner);
                debug!("cache hit for '{}'", key);
                existing.await_ready().await?;
                return Ok(existing);
            }
            let entry = ResourceEntry::new(key.clone(), Arc::downgrade(&self.inner));
            inner.entries.insert(key.clone(), entry.clone());
            entry
        };

        debug!("cache miss for '{}', constructing", key);
        match build().await {
            Ok(payload) => {
                entry.finish_loading(payload).await;
                let mut inner = self.inner.lock().await;
                inner.evict_over_capacity(&key);
                Ok(entry)
            }
            Err(err) => {
                {
                    let mut inner = self.inner.lock().await;
                    inner.entries.remove(&key);
                }
                let reason = format!("{err:#}");
                entry.fail_loading(&reason);
                warn!("construction of '{}' failed: {}", key, reason);
                Err(CacheError::Construction {
                    key: key.to_string(),
                    reason,
                })
            }
        }
    }

    /// Look up an entry, waiting for any in-flight construction.
    ///
    /// A successful lookup marks the key most-recently-used. Returns
    /// `None` for absent keys; a construction failure observed while
    /// waiting surfaces as an error.
    pub async fn get(&self, key: &K) -> Result<Option<Arc<ResourceEntry<K, T>>>> {
        let found = {
            let mut inner = self.inner.lock().await;
            inner.entries.get_refresh(key).cloned()
        };
        match found {
            Some(entry) => {
                entry.await_ready().await?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    /// Remove an entry, returning it if present. Removing an absent key
    /// is a no-op.
    ///
    /// The returned entry stays alive while callers hold strong
    /// references; a caller releasing native resources should acquire the
    /// entry's exclusive lock first to drain in-flight users.
    pub async fn remove(&self, key: &K) -> Option<Arc<ResourceEntry<K, T>>> {
        let mut inner = self.inner.lock().await;
        inner.entries.remove(key)
    }

    /// Snapshot of the cached keys, least-recently-used first.
    pub async fn keys(&self) -> Vec<K> {
        let inner = self.inner.lock().await;
        inner.entries.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        let inner = self.inner.lock().await;
        inner.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn contains(&self, key: &K) -> bool {
        let inner = self.inner.lock().await;
        inner.entries.contains_key(key)
    }

    pub async fn capacity(&self) -> Option<usize> {
        let inner = self.inner.lock().await;
        inner.capacity
    }
}

//! Cache entries pairing a payload with an exclusive lock and a readiness signal

use std::fmt;
use std::hash::Hash;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Weak};

use tokio::sync::{watch, MappedMutexGuard, Mutex, MutexGuard};
use tracing::debug;

use super::cache::PoolInner;
use crate::error::{CacheError, Result};

/// Loading state carried by an entry's readiness signal.
///
/// The signal transitions exactly once, from `Loading` to either `Ready`
/// or `Failed`. Waiters block until it leaves `Loading`.
#[derive(Debug, Clone)]
pub enum LoadState {
    /// Construction is in flight; the payload is absent
    Loading,
    /// The payload is set and will stay set for the entry's lifetime
    Ready,
    /// Construction failed; the reason is shared by all waiters
    Failed(Arc<str>),
}

impl LoadState {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }
}

/// A cached resource with its exclusive lock and readiness signal.
///
/// The payload lives behind a `tokio::sync::Mutex` and is set exactly once,
/// by the task that performs construction. Every later use goes through
/// [`ResourceEntry::acquire`], which hands out a scoped guard: concurrent
/// users of the same entry serialize, users of different entries do not.
///
/// Entries hold a non-owning reference to their pool, used only to mark
/// the key most-recently-used on acquisition.
pub struct ResourceEntry<K, T> {
    key: K,
    payload: Mutex<Option<T>>,
    state_tx: watch::Sender<LoadState>,
    state_rx: watch::Receiver<LoadState>,
    pool: Weak<Mutex<PoolInner<K, T>>>,
}

impl<K, T> ResourceEntry<K, T>
where
    K: Clone + Eq + Hash + fmt::Display,
{
    /// Create a new entry in the `Loading` state.
    pub(crate) fn new(key: K, pool: Weak<Mutex<PoolInner<K, T>>>) -> Arc<Self> {
        let (state_tx, state_rx) = watch::channel(LoadState::Loading);
        Arc::new(Self {
            key,
            payload: Mutex::new(None),
            state_tx,
            state_rx,
            pool,
        })
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    /// Snapshot of the readiness signal.
    pub fn state(&self) -> LoadState {
        self.state_rx.borrow().clone()
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state(), LoadState::Ready)
    }

    /// Block until the readiness signal leaves `Loading`.
    ///
    /// Does not take the exclusive lock, so waiters never prevent the
    /// constructing task from installing the payload.
    pub async fn await_ready(&self) -> Result<()> {
        let mut rx = self.state_rx.clone();
        let state = rx
            .wait_for(|state| !state.is_loading())
            .await
            .map_err(|_| CacheError::NotReady {
                key: self.key.to_string(),
            })?;
        match &*state {
            LoadState::Ready => Ok(()),
            LoadState::Failed(reason) => Err(CacheError::Construction {
                key: self.key.to_string(),
                reason: reason.to_string(),
            }),
            LoadState::Loading => Err(CacheError::NotReady {
                key: self.key.to_string(),
            }),
        }
    }

    /// Wait for readiness, take the exclusive lock, and return a scoped
    /// guard to the payload.
    ///
    /// Acquisition marks the key most-recently-used in the owning pool.
    /// The lock is released when the guard drops, on every exit path.
    pub async fn acquire(&self) -> Result<ResourceGuard<'_, T>> {
        self.await_ready().await?;
        let guard = self.payload.lock().await;
        let mapped =
            MutexGuard::try_map(guard, |slot| slot.as_mut()).map_err(|_| CacheError::NotReady {
                key: self.key.to_string(),
            })?;
        self.touch().await;
        debug!("acquired resource '{}'", self.key);
        Ok(ResourceGuard { inner: mapped })
    }

    /// Install the payload and open the readiness signal.
    ///
    /// Called exactly once, by the constructing task.
    pub(crate) async fn finish_loading(&self, payload: T) {
        let mut slot = self.payload.lock().await;
        *slot = Some(payload);
        drop(slot);
        let _ = self.state_tx.send(LoadState::Ready);
    }

    /// Open the readiness signal in the failed state, releasing all
    /// waiters with a construction error.
    pub(crate) fn fail_loading(&self, reason: &str) {
        let _ = self.state_tx.send(LoadState::Failed(Arc::from(reason)));
    }

    /// Mark this key most-recently-used in the owning pool.
    async fn touch(&self) {
        if let Some(pool) = self.pool.upgrade() {
            let mut inner = pool.lock().await;
            inner.refresh(&self.key);
        }
    }
}

impl<K, T> fmt::Debug for ResourceEntry<K, T>
where
    K: Clone + Eq + Hash + fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceEntry")
            .field("key", &self.key.to_string())
            .field("state", &self.state())
            .finish()
    }
}

/// Scoped handle to an entry's payload, releasing the exclusive lock on drop.
pub struct ResourceGuard<'a, T> {
    inner: MappedMutexGuard<'a, T>,
}

impl<T> Deref for ResourceGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T> DerefMut for ResourceGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detached_entry<T>(key: &str) -> Arc<ResourceEntry<String, T>> {
        ResourceEntry::new(key.to_string(), Weak::new())
    }

    #[tokio::test]
    async fn entry_starts_loading() {
        let entry = detached_entry::<u32>("k");
        assert!(entry.state().is_loading());
        assert!(!entry.is_ready());
    }

    #[tokio::test]
    async fn acquire_after_finish_loading() {
        let entry = detached_entry("k");
        entry.finish_loading(41u32).await;

        let mut guard = entry.acquire().await.unwrap();
        assert_eq!(*guard, 41);
        *guard += 1;
        drop(guard);

        let guard = entry.acquire().await.unwrap();
        assert_eq!(*guard, 42);
    }

    #[tokio::test]
    async fn await_ready_unblocks_on_finish() {
        let entry = detached_entry("k");
        let waiter = {
            let entry = entry.clone();
            tokio::spawn(async move { entry.await_ready().await })
        };
        entry.finish_loading(7u32).await;
        waiter.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn failed_loading_propagates_to_waiters() {
        let entry = detached_entry::<u32>("k");
        let waiter = {
            let entry = entry.clone();
            tokio::spawn(async move { entry.await_ready().await })
        };
        entry.fail_loading("backend unavailable");

        let err = waiter.await.unwrap().unwrap_err();
        assert!(matches!(err, CacheError::Construction { .. }));
        assert!(err.to_string().contains("backend unavailable"));
    }

    #[tokio::test]
    async fn concurrent_acquires_serialize() {
        let entry = detached_entry("k");
        entry.finish_loading(0u32).await;

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let entry = entry.clone();
                tokio::spawn(async move {
                    let mut guard = entry.acquire().await.unwrap();
                    let seen = *guard;
                    tokio::task::yield_now().await;
                    *guard = seen + 1;
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let guard = entry.acquire().await.unwrap();
        assert_eq!(*guard, 8);
    }
}

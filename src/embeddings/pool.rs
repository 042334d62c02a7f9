//! Cache pool for loaded embedding models

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use super::{BackendRegistry, Device, Embedder, EmbeddingKey};
use crate::error::Result;
use crate::pool::ResourcePool;

/// Pool of embedding models keyed by `(model id, device)`.
///
/// A model is loaded at most once per key, no matter how many tasks
/// request it concurrently; later requests share the `Arc` handle.
/// Embedders are internally immutable, so sharing the handle is the
/// normal mode of use and the entry's exclusive lock is only held for
/// the moment of cloning it out.
pub struct EmbeddingPool {
    pool: ResourcePool<EmbeddingKey, Arc<dyn Embedder>>,
    registry: BackendRegistry,
}

impl EmbeddingPool {
    /// Create a pool with the built-in backend registry.
    ///
    /// `capacity` bounds the number of resident models; `None` or
    /// `Some(0)` keeps every loaded model resident.
    pub fn new(capacity: Option<usize>) -> Self {
        Self::with_registry(capacity, BackendRegistry::with_defaults())
    }

    /// Create a pool with a custom backend registry
    pub fn with_registry(capacity: Option<usize>, registry: BackendRegistry) -> Self {
        Self {
            pool: ResourcePool::new(capacity),
            registry,
        }
    }

    /// Load the embedding model for `(model_id, device)`, constructing it
    /// on first use.
    ///
    /// Construction dispatches through the backend registry and runs on a
    /// blocking thread, since model loading does file and network I/O.
    pub async fn load(&self, model_id: &str, device: Device) -> Result<Arc<dyn Embedder>> {
        let key = EmbeddingKey::new(model_id, device);
        let ctor = self.registry.resolve(&key)?;

        let build_key = key.clone();
        let entry = self
            .pool
            .get_or_create(key, || async move {
                info!("loading embedding model '{}'", build_key);
                let embedder = tokio::task::spawn_blocking(move || ctor(&build_key))
                    .await
                    .context("embedding constructor task failed")??;
                Ok(embedder)
            })
            .await?;

        let guard = entry.acquire().await?;
        Ok(Arc::clone(&*guard))
    }

    /// Snapshot of the resident model keys, least-recently-used first
    pub async fn keys(&self) -> Vec<EmbeddingKey> {
        self.pool.keys().await
    }

    pub async fn len(&self) -> usize {
        self.pool.len().await
    }

    pub async fn is_empty(&self) -> bool {
        self.pool.is_empty().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::embeddings::registry::{BackendRule, ModelMatch};
    use crate::test_support::StubEmbedder;

    fn counting_registry(calls: Arc<AtomicUsize>) -> BackendRegistry {
        let mut registry = BackendRegistry::empty();
        registry.register(BackendRule::new(
            "stub",
            ModelMatch::Any,
            Arc::new(move |key| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(StubEmbedder::new(&key.model_id, 8)) as Arc<dyn Embedder>)
            }),
        ));
        registry
    }

    #[tokio::test]
    async fn load_constructs_once_and_shares_the_handle() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pool = EmbeddingPool::with_registry(None, counting_registry(calls.clone()));

        let first = pool.load("stub-model", Device::Cpu).await.unwrap();
        let second = pool.load("stub-model", Device::Cpu).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_devices_are_distinct_entries() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pool = EmbeddingPool::with_registry(None, counting_registry(calls.clone()));

        pool.load("stub-model", Device::Cpu).await.unwrap();
        pool.load("stub-model", Device::Cuda).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(pool.len().await, 2);
    }

    #[tokio::test]
    async fn unknown_model_without_fallback_is_an_error() {
        let pool = EmbeddingPool::with_registry(None, BackendRegistry::empty());
        let err = pool.load("anything", Device::Cpu).await.unwrap_err();
        assert!(matches!(err, crate::error::CacheError::UnknownModel { .. }));
    }
}

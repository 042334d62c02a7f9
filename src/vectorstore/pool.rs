//! Cache pools for knowledge-base vector stores

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tracing::info;

use super::store::VectorStore;
use crate::config::CacheConfig;
use crate::embeddings::{Device, EmbeddingPool};
use crate::error::{CacheError, Result};
use crate::metadata::KbMetadata;
use crate::pool::{ResourceEntry, ResourcePool};

/// Shared handle to a pooled knowledge-base store; use
/// [`ResourceEntry::acquire`] for exclusive access to the store itself
pub type StoreHandle = Arc<ResourceEntry<StoreKey, VectorStore>>;

/// Shared handle to a pooled in-memory scratch store
pub type MemoStoreHandle = Arc<ResourceEntry<String, VectorStore>>;

/// Cache key for a knowledge-base vector store
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreKey {
    pub kb_id: String,
    pub variant: String,
}

impl StoreKey {
    pub fn new(kb_id: impl Into<String>, variant: impl Into<String>) -> Self {
        Self {
            kb_id: kb_id.into(),
            variant: variant.into(),
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kb_id, self.variant)
    }
}

/// Pool of persisted knowledge-base vector stores keyed by
/// `(kb id, variant)`.
///
/// Store construction resolves the knowledge base's embedding model
/// through the metadata provider, obtains the embedder from the embedding
/// pool (an independent pool with its own locks, so the nesting cannot
/// deadlock), then loads the persisted store or creates a fresh one.
pub struct VectorStorePool {
    pool: ResourcePool<StoreKey, VectorStore>,
    embeddings: Arc<EmbeddingPool>,
    metadata: Arc<dyn KbMetadata>,
    config: CacheConfig,
}

impl VectorStorePool {
    pub fn new(
        config: CacheConfig,
        embeddings: Arc<EmbeddingPool>,
        metadata: Arc<dyn KbMetadata>,
    ) -> Self {
        Self {
            pool: ResourcePool::new(config.cached_stores),
            embeddings,
            metadata,
            config,
        }
    }

    /// Load the vector store for `(kb_id, variant)`, reading it from disk
    /// or — with `create_if_missing` — creating and persisting an empty
    /// one.
    ///
    /// The variant defaults to the knowledge base's embedding model id.
    /// Returns [`CacheError::NotFound`] when nothing is persisted and
    /// creation was not requested.
    pub async fn load(
        &self,
        kb_id: &str,
        variant: Option<&str>,
        create_if_missing: bool,
    ) -> Result<StoreHandle> {
        let model_id = self.resolve_model(kb_id);
        let variant = variant.unwrap_or(&model_id);
        let key = StoreKey::new(kb_id, variant);
        let store_dir = self.config.store_path(kb_id, variant);

        if !create_if_missing
            && !self.pool.contains(&key).await
            && !VectorStore::exists_on_disk(&store_dir)
        {
            return Err(CacheError::NotFound {
                key: key.to_string(),
            });
        }

        let embeddings = Arc::clone(&self.embeddings);
        let device = self.config.device;
        let ctor_key = key.clone();
        self.pool
            .get_or_create(key, || async move {
                let embedder = embeddings.load(&model_id, device).await?;
                if VectorStore::exists_on_disk(&store_dir) {
                    info!("loading vector store '{}' from {:?}", ctor_key, store_dir);
                    Ok(VectorStore::load(&store_dir, embedder)?)
                } else if create_if_missing {
                    info!("creating vector store '{}' at {:?}", ctor_key, store_dir);
                    let store = VectorStore::new(embedder);
                    store.save(&store_dir)?;
                    Ok(store)
                } else {
                    Err(anyhow::anyhow!(
                        "vector store files for '{ctor_key}' disappeared during load"
                    ))
                }
            })
            .await
    }

    /// Persist a cached store to its configured location
    pub async fn save(&self, kb_id: &str, variant: Option<&str>) -> Result<()> {
        let key = self.key_for(kb_id, variant);
        let dir = self.config.store_path(&key.kb_id, &key.variant);
        self.save_key_to(&key, &dir).await
    }

    /// Persist a cached store to an explicit directory
    pub async fn save_to(&self, kb_id: &str, variant: Option<&str>, dir: &Path) -> Result<()> {
        let key = self.key_for(kb_id, variant);
        self.save_key_to(&key, dir).await
    }

    async fn save_key_to(&self, key: &StoreKey, dir: &Path) -> Result<()> {
        let entry = self
            .pool
            .get(key)
            .await?
            .ok_or_else(|| CacheError::NotFound {
                key: key.to_string(),
            })?;
        let guard = entry.acquire().await?;
        guard.save(dir)
    }

    /// Remove every document from a cached store, keeping the store itself
    pub async fn clear(&self, kb_id: &str, variant: Option<&str>) -> Result<()> {
        let key = self.key_for(kb_id, variant);
        let entry = self
            .pool
            .get(&key)
            .await?
            .ok_or_else(|| CacheError::NotFound {
                key: key.to_string(),
            })?;

        let mut guard = entry.acquire().await?;
        let removed = guard.delete_all();
        let remaining = guard.len();
        if remaining > 0 {
            return Err(CacheError::ClearIncomplete {
                key: key.to_string(),
                remaining,
            });
        }
        info!("cleared vector store '{}' ({} documents removed)", key, removed);
        Ok(())
    }

    /// Drop a store from the pool, releasing its resources once in-flight
    /// users finish. Unloading an absent store is a no-op.
    pub async fn unload(&self, kb_id: &str, variant: Option<&str>) -> Result<()> {
        let key = self.key_for(kb_id, variant);
        if let Some(entry) = self.pool.remove(&key).await {
            // Drain any in-flight user before the last handle drops.
            let _guard = entry.acquire().await.ok();
            info!("released vector store '{}'", key);
        }
        Ok(())
    }

    /// Snapshot of the cached store keys, least-recently-used first
    pub async fn keys(&self) -> Vec<StoreKey> {
        self.pool.keys().await
    }

    pub async fn len(&self) -> usize {
        self.pool.len().await
    }

    pub async fn contains(&self, kb_id: &str, variant: Option<&str>) -> bool {
        self.pool.contains(&self.key_for(kb_id, variant)).await
    }

    fn resolve_model(&self, kb_id: &str) -> String {
        self.metadata
            .embed_model_of(kb_id)
            .unwrap_or_else(|| self.config.default_embed_model.clone())
    }

    fn key_for(&self, kb_id: &str, variant: Option<&str>) -> StoreKey {
        match variant {
            Some(variant) => StoreKey::new(kb_id, variant),
            None => StoreKey::new(kb_id, self.resolve_model(kb_id)),
        }
    }
}

/// Pool of transient in-memory stores, for scratch indexes that never
/// touch disk (per-conversation uploads and the like).
pub struct MemoStorePool {
    pool: ResourcePool<String, VectorStore>,
    embeddings: Arc<EmbeddingPool>,
    default_embed_model: String,
    device: Device,
}

impl MemoStorePool {
    pub fn new(config: &CacheConfig, embeddings: Arc<EmbeddingPool>) -> Self {
        Self {
            pool: ResourcePool::new(config.cached_memo_stores),
            embeddings,
            default_embed_model: config.default_embed_model.clone(),
            device: config.device,
        }
    }

    /// Return the scratch store for `name`, creating an empty one on
    /// first use
    pub async fn load(&self, name: &str) -> Result<MemoStoreHandle> {
        let embeddings = Arc::clone(&self.embeddings);
        let model_id = self.default_embed_model.clone();
        let device = self.device;
        let ctor_name = name.to_string();
        self.pool
            .get_or_create(name.to_string(), || async move {
                info!("creating in-memory vector store '{}'", ctor_name);
                let embedder = embeddings.load(&model_id, device).await?;
                Ok(VectorStore::new(embedder))
            })
            .await
    }

    /// Drop a scratch store. Dropping an absent store is a no-op.
    pub async fn drop_store(&self, name: &str) -> Result<()> {
        if let Some(entry) = self.pool.remove(&name.to_string()).await {
            let _guard = entry.acquire().await.ok();
            info!("released in-memory vector store '{}'", name);
        }
        Ok(())
    }

    pub async fn keys(&self) -> Vec<String> {
        self.pool.keys().await
    }

    pub async fn len(&self) -> usize {
        self.pool.len().await
    }
}

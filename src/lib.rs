pub mod config;
pub mod embeddings;
pub mod error;
pub mod metadata;
pub mod pool;
pub mod test_support;
pub mod vectorstore;

pub use config::CacheConfig;
pub use embeddings::{
    BackendRegistry, BackendRule, Device, Embedder, EmbeddingKey, EmbeddingPool, ModelMatch,
};
pub use error::{CacheError, Result};
pub use metadata::{KbMetadata, StaticKbMetadata};
pub use pool::{LoadState, ResourceEntry, ResourceGuard, ResourcePool};
pub use vectorstore::{
    DocStore, MemoStoreHandle, MemoStorePool, ScoredDocument, StoreHandle, StoreKey,
    StoredDocument, VectorStore, VectorStorePool,
};

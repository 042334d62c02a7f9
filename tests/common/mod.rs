use std::path::Path;
use std::sync::Arc;

use kbcache::test_support::StubEmbedder;
use kbcache::{
    BackendRegistry, BackendRule, CacheConfig, Embedder, EmbeddingPool, ModelMatch,
    StaticKbMetadata, VectorStorePool,
};

pub const STUB_DIMENSION: usize = 16;

/// Install a subscriber once so `RUST_LOG=debug` surfaces pool activity
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Embedding pool whose only backend is the deterministic stub, so tests
/// never download model weights
pub fn stub_embedding_pool() -> Arc<EmbeddingPool> {
    let mut registry = BackendRegistry::empty();
    registry.register(BackendRule::new(
        "stub",
        ModelMatch::Any,
        Arc::new(|key| {
            Ok(Arc::new(StubEmbedder::new(&key.model_id, STUB_DIMENSION)) as Arc<dyn Embedder>)
        }),
    ));
    Arc::new(EmbeddingPool::with_registry(None, registry))
}

pub fn store_pool(data_dir: &Path) -> VectorStorePool {
    store_pool_with(data_dir, StaticKbMetadata::new(), Some(10))
}

pub fn store_pool_with(
    data_dir: &Path,
    metadata: StaticKbMetadata,
    capacity: Option<usize>,
) -> VectorStorePool {
    let config = CacheConfig::default()
        .with_data_dir(data_dir)
        .with_default_embed_model("stub-model")
        .with_cached_stores(capacity);
    VectorStorePool::new(config, stub_embedding_pool(), Arc::new(metadata))
}

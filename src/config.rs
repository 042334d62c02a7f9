//! Cache configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::embeddings::Device;
use crate::error::Result;

/// Configuration for the cache pools.
///
/// Capacities are entry counts; `None` or `Some(0)` disables eviction for
/// that pool. A misconfigured bound is never an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Root directory for persisted knowledge-base data
    pub data_dir: PathBuf,
    /// Resident knowledge-base vector stores
    pub cached_stores: Option<usize>,
    /// Resident in-memory scratch stores
    pub cached_memo_stores: Option<usize>,
    /// Resident embedding models
    pub cached_embedders: Option<usize>,
    /// Embedding model used when a knowledge base has none configured
    pub default_embed_model: String,
    /// Device embedding models are loaded on
    pub device: Device,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/knowledge_base"),
            cached_stores: Some(1),
            cached_memo_stores: Some(10),
            cached_embedders: Some(1),
            default_embed_model: "multilingual-e5-small".to_string(),
            device: Device::Cpu,
        }
    }
}

impl CacheConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// On-disk directory for one vector store:
    /// `<data_dir>/<kb_id>/vector_store/<variant>`
    pub fn store_path(&self, kb_id: &str, variant: &str) -> PathBuf {
        self.data_dir.join(kb_id).join("vector_store").join(variant)
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn with_default_embed_model(mut self, model_id: impl Into<String>) -> Self {
        self.default_embed_model = model_id.into();
        self
    }

    pub fn with_cached_stores(mut self, bound: Option<usize>) -> Self {
        self.cached_stores = bound;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_path_layout() {
        let config = CacheConfig::default().with_data_dir("/tmp/kb");
        assert_eq!(
            config.store_path("samples", "default"),
            PathBuf::from("/tmp/kb/samples/vector_store/default")
        );
    }

    #[test]
    fn yaml_round_trip() {
        let yaml = "data_dir: /var/lib/kb\ncached_stores: 4\ndevice: cuda\n";
        let config: CacheConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/kb"));
        assert_eq!(config.cached_stores, Some(4));
        assert_eq!(config.device, Device::Cuda);
        // Unset fields keep their defaults.
        assert_eq!(config.default_embed_model, "multilingual-e5-small");
    }
}

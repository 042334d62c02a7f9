//! Embedding backends and the embedding model pool
//!
//! Embedding models are expensive to construct and fully shareable once
//! loaded, so they live in an [`EmbeddingPool`] keyed by model id and
//! device. Backend selection goes through a [`BackendRegistry`] of match
//! rules instead of ad-hoc string checks at call sites.

pub mod backend;
pub mod pool;
pub mod registry;

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use serde::{Deserialize, Serialize};

pub use backend::FastembedEmbedder;
pub use pool::EmbeddingPool;
pub use registry::{BackendRegistry, BackendRule, ModelMatch};

/// A loaded embedding model.
///
/// Implementations are internally immutable: every method takes `&self`,
/// so a handle can be shared freely across tasks.
pub trait Embedder: Send + Sync {
    /// The model id this embedder was constructed for
    fn model_id(&self) -> &str;

    /// Embedding dimension
    fn dimension(&self) -> usize;

    /// Generate embeddings for multiple texts
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Generate an embedding for a single text
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("no embedding generated"))
    }

    /// Generate a query embedding (backends may add a query prefix)
    fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        self.embed(query)
    }

    /// Generate document embeddings (backends may add a passage prefix)
    fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.embed_batch(texts)
    }
}

/// Compute device an embedding model is loaded on.
///
/// Part of the cache identity: the same model on different devices is two
/// distinct pool entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    #[default]
    Cpu,
    Cuda,
}

impl Device {
    pub fn as_str(&self) -> &'static str {
        match self {
            Device::Cpu => "cpu",
            Device::Cuda => "cuda",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Device {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value {
            "cpu" => Ok(Device::Cpu),
            "cuda" => Ok(Device::Cuda),
            other => Err(format!("unknown device '{other}'")),
        }
    }
}

/// Cache key for a loaded embedding model
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmbeddingKey {
    pub model_id: String,
    pub device: Device,
}

impl EmbeddingKey {
    pub fn new(model_id: impl Into<String>, device: Device) -> Self {
        Self {
            model_id: model_id.into(),
            device,
        }
    }
}

impl fmt::Display for EmbeddingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.model_id, self.device)
    }
}

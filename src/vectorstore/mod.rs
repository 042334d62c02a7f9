//! In-memory vector stores and their cache pools
//!
//! A [`VectorStore`] pairs a cosine-similarity index with an owned
//! document store and the embedding model handle it was built with.
//! Stores persist to a per-knowledge-base directory and are shared
//! through a [`VectorStorePool`], which guarantees one load per store and
//! exclusive access during use.

pub mod docstore;
pub mod pool;
pub mod store;

use serde::{Deserialize, Serialize};

pub use docstore::DocStore;
pub use pool::{MemoStoreHandle, MemoStorePool, StoreHandle, StoreKey, VectorStorePool};
pub use store::VectorStore;

/// A document held by a vector store, id attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    /// Store-assigned document id
    pub id: String,
    /// Document text
    pub content: String,
    /// Additional metadata as JSON
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// A search match with its similarity score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub document: StoredDocument,
    /// Cosine similarity in `[-1.0, 1.0]`, higher is closer
    pub score: f32,
}

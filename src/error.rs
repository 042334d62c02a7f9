//! Error types for the cache pool subsystem

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors surfaced by the cache pools and the resources they manage
#[derive(Debug, Error)]
pub enum CacheError {
    /// The requested resource is not cached and nothing is persisted for it
    #[error("resource '{key}' not found")]
    NotFound { key: String },

    /// The build callback for a resource failed; every concurrent waiter
    /// for the same key receives this error
    #[error("failed to construct resource '{key}': {reason}")]
    Construction { key: String, reason: String },

    /// A resource was observed without a payload after its readiness
    /// signal opened
    #[error("resource '{key}' is not ready")]
    NotReady { key: String },

    /// No backend rule matched the requested embedding model
    #[error("no embedding backend registered for model '{model_id}'")]
    UnknownModel { model_id: String },

    /// An embedding has a different dimension than the store's index
    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Persisted store data is structurally invalid
    #[error("corrupt vector store data at {path:?}: {reason}")]
    Corrupted { path: PathBuf, reason: String },

    /// Clearing a store left documents behind
    #[error("clearing vector store '{key}' left {remaining} documents")]
    ClearIncomplete { key: String, remaining: usize },

    #[error("I/O error")]
    Io(#[from] std::io::Error),

    #[error("serialization error")]
    Persist(#[from] serde_json::Error),

    #[error("configuration error")]
    Config(#[from] serde_yaml::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

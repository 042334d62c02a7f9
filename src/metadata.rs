//! Knowledge-base metadata lookup
//!
//! The mapping from a knowledge base to its configured embedding model
//! lives outside this crate (a database in the full application). The
//! vector store pool consumes it through this trait.

use std::collections::HashMap;

/// Resolves knowledge-base configuration the cache pools depend on
pub trait KbMetadata: Send + Sync {
    /// The embedding model configured for a knowledge base, if any.
    ///
    /// `None` means the pool falls back to its configured default model.
    fn embed_model_of(&self, kb_id: &str) -> Option<String>;
}

/// In-memory metadata table, for tests and single-process setups
#[derive(Debug, Default)]
pub struct StaticKbMetadata {
    models: HashMap<String, String>,
}

impl StaticKbMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, kb_id: impl Into<String>, model_id: impl Into<String>) -> Self {
        self.models.insert(kb_id.into(), model_id.into());
        self
    }

    pub fn set_model(&mut self, kb_id: impl Into<String>, model_id: impl Into<String>) {
        self.models.insert(kb_id.into(), model_id.into());
    }
}

impl KbMetadata for StaticKbMetadata {
    fn embed_model_of(&self, kb_id: &str) -> Option<String> {
        self.models.get(kb_id).cloned()
    }
}

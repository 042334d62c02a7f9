//! Owned document store
//!
//! Lookups return documents with their id already attached, so callers
//! never reach into the store's internal map or patch behavior onto a
//! third-party type.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::StoredDocument;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DocRecord {
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<serde_json::Value>,
}

/// Id-addressed document side store of a vector index
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DocStore {
    docs: HashMap<String, DocRecord>,
}

impl DocStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        id: impl Into<String>,
        content: impl Into<String>,
        metadata: Option<serde_json::Value>,
    ) {
        self.docs.insert(
            id.into(),
            DocRecord {
                content: content.into(),
                metadata,
            },
        );
    }

    /// Look up a document, attaching its id
    pub fn get(&self, id: &str) -> Option<StoredDocument> {
        self.docs.get(id).map(|record| StoredDocument {
            id: id.to_string(),
            content: record.content.clone(),
            metadata: record.metadata.clone(),
        })
    }

    pub fn remove(&mut self, id: &str) -> Option<StoredDocument> {
        self.docs.remove(id).map(|record| StoredDocument {
            id: id.to_string(),
            content: record.content,
            metadata: record.metadata,
        })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.docs.contains_key(id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.docs.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

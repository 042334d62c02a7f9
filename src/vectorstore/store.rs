//! In-memory vector store with on-disk persistence

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::docstore::DocStore;
use super::{ScoredDocument, StoredDocument};
use crate::embeddings::Embedder;
use crate::error::{CacheError, Result};

/// Serialized index file; its existence marks a persisted store
const INDEX_FILE: &str = "index.json";
/// Document side file, written next to the index
const DOCSTORE_FILE: &str = "docstore.json";

/// Persisted form of the vector index
#[derive(Debug, Serialize, Deserialize)]
struct PersistedIndex {
    model_id: String,
    dimension: usize,
    saved_at: DateTime<Utc>,
    ids: Vec<String>,
    vectors: Vec<Vec<f32>>,
}

/// An in-memory vector store: a cosine index over L2-normalized vectors
/// plus the document side store.
///
/// The store itself is not synchronized; shared access goes through the
/// pool entry's exclusive lock.
pub struct VectorStore {
    embedder: Arc<dyn Embedder>,
    ids: Vec<String>,
    vectors: Vec<Vec<f32>>,
    docstore: DocStore,
}

impl VectorStore {
    /// Create an empty store bound to an embedding model
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            ids: Vec::new(),
            vectors: Vec::new(),
            docstore: DocStore::new(),
        }
    }

    pub fn model_id(&self) -> &str {
        self.embedder.model_id()
    }

    pub fn dimension(&self) -> usize {
        self.embedder.dimension()
    }

    /// Number of stored documents
    pub fn len(&self) -> usize {
        self.docstore.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docstore.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.ids.clone()
    }

    pub fn get(&self, id: &str) -> Option<StoredDocument> {
        self.docstore.get(id)
    }

    /// Embed and insert texts, returning the assigned document ids
    pub fn add_texts(
        &mut self,
        texts: &[&str],
        metadatas: Option<&[serde_json::Value]>,
    ) -> Result<Vec<String>> {
        if let Some(metadatas) = metadatas {
            if metadatas.len() != texts.len() {
                return Err(CacheError::Other(anyhow::anyhow!(
                    "got {} metadata entries for {} texts",
                    metadatas.len(),
                    texts.len()
                )));
            }
        }

        let embeddings = self.embedder.embed_documents(texts)?;
        let expected = self.dimension();
        for embedding in &embeddings {
            if embedding.len() != expected {
                return Err(CacheError::DimensionMismatch {
                    expected,
                    got: embedding.len(),
                });
            }
        }

        let mut assigned = Vec::with_capacity(texts.len());
        for (position, (text, embedding)) in texts.iter().zip(embeddings).enumerate() {
            let id = Uuid::new_v4().to_string();
            let metadata = metadatas.and_then(|all| all.get(position).cloned());
            self.ids.push(id.clone());
            self.vectors.push(normalize(embedding));
            self.docstore.insert(id.clone(), *text, metadata);
            assigned.push(id);
        }
        debug!("added {} documents to vector store", assigned.len());
        Ok(assigned)
    }

    /// Remove documents by id, returning how many were removed
    pub fn delete(&mut self, ids: &[String]) -> usize {
        let removing: HashSet<&String> = ids.iter().collect();
        let mut removed = 0;

        let mut kept_ids = Vec::with_capacity(self.ids.len());
        let mut kept_vectors = Vec::with_capacity(self.vectors.len());
        for (id, vector) in self.ids.drain(..).zip(self.vectors.drain(..)) {
            if removing.contains(&id) {
                self.docstore.remove(&id);
                removed += 1;
            } else {
                kept_ids.push(id);
                kept_vectors.push(vector);
            }
        }
        self.ids = kept_ids;
        self.vectors = kept_vectors;
        removed
    }

    /// Remove every document, returning how many were removed
    pub fn delete_all(&mut self) -> usize {
        let ids = self.ids();
        self.delete(&ids)
    }

    /// Cosine-similarity search over the stored documents
    pub fn search(
        &self,
        query: &str,
        top_k: usize,
        min_score: Option<f32>,
    ) -> Result<Vec<ScoredDocument>> {
        let query_vector = self.embedder.embed_query(query)?;
        if query_vector.len() != self.dimension() {
            return Err(CacheError::DimensionMismatch {
                expected: self.dimension(),
                got: query_vector.len(),
            });
        }
        let query_vector = normalize(query_vector);

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(position, vector)| (position, dot(&query_vector, vector)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let results = scored
            .into_iter()
            .take(top_k)
            .filter(|(_, score)| min_score.map_or(true, |bound| *score >= bound))
            .filter_map(|(position, score)| {
                self.docstore
                    .get(&self.ids[position])
                    .map(|document| ScoredDocument { document, score })
            })
            .collect();
        Ok(results)
    }

    /// Serialize the index and document store into `dir`
    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;

        let index = PersistedIndex {
            model_id: self.model_id().to_string(),
            dimension: self.dimension(),
            saved_at: Utc::now(),
            ids: self.ids.clone(),
            vectors: self.vectors.clone(),
        };
        fs::write(dir.join(INDEX_FILE), serde_json::to_vec(&index)?)?;
        fs::write(dir.join(DOCSTORE_FILE), serde_json::to_vec(&self.docstore)?)?;

        info!("saved vector store ({} documents) to {:?}", self.len(), dir);
        Ok(())
    }

    /// Load a persisted store from `dir`, embedding with `embedder`
    pub fn load(dir: &Path, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let index: PersistedIndex = serde_json::from_slice(&fs::read(dir.join(INDEX_FILE))?)?;

        if index.dimension != embedder.dimension() {
            return Err(CacheError::DimensionMismatch {
                expected: embedder.dimension(),
                got: index.dimension,
            });
        }
        if index.ids.len() != index.vectors.len() {
            return Err(CacheError::Corrupted {
                path: dir.to_path_buf(),
                reason: format!(
                    "index lists {} ids but {} vectors",
                    index.ids.len(),
                    index.vectors.len()
                ),
            });
        }

        let docstore: DocStore = serde_json::from_slice(&fs::read(dir.join(DOCSTORE_FILE))?)?;
        if docstore.len() != index.ids.len() {
            return Err(CacheError::Corrupted {
                path: dir.to_path_buf(),
                reason: format!(
                    "docstore holds {} documents but index lists {}",
                    docstore.len(),
                    index.ids.len()
                ),
            });
        }

        info!(
            "loaded vector store ({} documents, model '{}', saved at {}) from {:?}",
            docstore.len(),
            index.model_id,
            index.saved_at,
            dir
        );
        Ok(Self {
            embedder,
            ids: index.ids,
            vectors: index.vectors,
            docstore,
        })
    }

    /// Whether a persisted store exists in `dir`
    pub fn exists_on_disk(dir: &Path) -> bool {
        dir.join(INDEX_FILE).is_file()
    }

    pub fn index_file(dir: &Path) -> PathBuf {
        dir.join(INDEX_FILE)
    }
}

fn normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm = vector.iter().map(|component| component * component).sum::<f32>().sqrt();
    if norm > 0.0 {
        for component in &mut vector {
            *component /= norm;
        }
    }
    vector
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubEmbedder;
    use tempfile::tempdir;

    fn store() -> VectorStore {
        VectorStore::new(Arc::new(StubEmbedder::new("stub", 16)))
    }

    #[test]
    fn add_and_search() {
        let mut store = store();
        let ids = store
            .add_texts(&["rust borrow checker", "tokio async runtime"], None)
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(store.len(), 2);

        let hits = store.search("rust borrow checker", 1, None).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document.content, "rust borrow checker");
        assert!(hits[0].score > 0.99);
    }

    #[test]
    fn search_attaches_ids_and_metadata() {
        let mut store = store();
        let metadata = serde_json::json!({"source": "notes.md"});
        let ids = store
            .add_texts(&["a single document"], Some(std::slice::from_ref(&metadata)))
            .unwrap();

        let hits = store.search("a single document", 5, None).unwrap();
        assert_eq!(hits[0].document.id, ids[0]);
        assert_eq!(hits[0].document.metadata, Some(metadata));
    }

    #[test]
    fn delete_removes_index_and_docstore_entries() {
        let mut store = store();
        let ids = store.add_texts(&["one", "two", "three"], None).unwrap();

        assert_eq!(store.delete(&ids[..2]), 2);
        assert_eq!(store.len(), 1);
        assert!(store.get(&ids[2]).is_some());

        assert_eq!(store.delete_all(), 1);
        assert!(store.is_empty());
        assert!(store.search("one", 3, None).unwrap().is_empty());
    }

    #[test]
    fn min_score_filters_results() {
        let mut store = store();
        store.add_texts(&["alpha", "beta"], None).unwrap();

        let hits = store.search("alpha", 10, Some(0.99)).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document.content, "alpha");
    }

    #[test]
    fn save_load_round_trip() {
        let dir = tempdir().unwrap();
        let mut store = store();
        let ids = store.add_texts(&["persisted document"], None).unwrap();
        store.save(dir.path()).unwrap();
        assert!(VectorStore::exists_on_disk(dir.path()));

        let loaded =
            VectorStore::load(dir.path(), Arc::new(StubEmbedder::new("stub", 16))).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(
            loaded.get(&ids[0]).unwrap().content,
            "persisted document"
        );
        let hits = loaded.search("persisted document", 1, None).unwrap();
        assert!(hits[0].score > 0.99);
    }

    #[test]
    fn load_rejects_dimension_mismatch() {
        let dir = tempdir().unwrap();
        store().save(dir.path()).unwrap();

        let err =
            VectorStore::load(dir.path(), Arc::new(StubEmbedder::new("stub", 8))).unwrap_err();
        assert!(matches!(err, CacheError::DimensionMismatch { .. }));
    }

    #[test]
    fn metadata_count_mismatch_is_rejected() {
        let mut store = store();
        let err = store
            .add_texts(&["a", "b"], Some(&[serde_json::json!({})]))
            .unwrap_err();
        assert!(err.to_string().contains("metadata"));
    }
}

//! Deterministic stand-ins for tests
//!
//! Real embedding backends download model weights, so tests register
//! these stubs with the pools instead.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use anyhow::Result;

use crate::embeddings::Embedder;

/// Embedder producing stable pseudo-random vectors from the text alone.
///
/// Identical texts embed identically, distinct texts almost never do,
/// which is enough for exercising the pools and the vector store without
/// a model download.
pub struct StubEmbedder {
    model_id: String,
    dimension: usize,
}

impl StubEmbedder {
    pub fn new(model_id: &str, dimension: usize) -> Self {
        Self {
            model_id: model_id.to_string(),
            dimension,
        }
    }

    fn vector_of(&self, text: &str) -> Vec<f32> {
        (0..self.dimension)
            .map(|position| {
                let mut hasher = DefaultHasher::new();
                text.hash(&mut hasher);
                position.hash(&mut hasher);
                ((hasher.finish() % 2000) as f32 / 1000.0) - 1.0
            })
            .collect()
    }
}

impl Embedder for StubEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.vector_of(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_embeddings_are_deterministic() {
        let embedder = StubEmbedder::new("stub", 8);
        assert_eq!(
            embedder.embed("same text").unwrap(),
            embedder.embed("same text").unwrap()
        );
        assert_ne!(
            embedder.embed("one text").unwrap(),
            embedder.embed("another text").unwrap()
        );
    }
}

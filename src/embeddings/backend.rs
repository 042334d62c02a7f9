//! Local embedding backend over fastembed

use anyhow::{Context, Result};
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tracing::info;

use super::Embedder;

/// Embedding model wrapper backed by a local fastembed model.
///
/// Loading downloads model weights on first use, which is why instances
/// are constructed through the embedding pool rather than per call site.
pub struct FastembedEmbedder {
    model: TextEmbedding,
    model_id: String,
    dimension: usize,
    e5_prefixing: bool,
}

impl FastembedEmbedder {
    /// Load a fastembed model for the given model id
    pub fn new(model_id: &str, model_name: EmbeddingModel) -> Result<Self> {
        info!("Initializing embedding model '{}' ({:?})", model_id, model_name);

        let dimension = Self::dimension_of(&model_name);
        let e5_prefixing = matches!(
            model_name,
            EmbeddingModel::MultilingualE5Small
                | EmbeddingModel::MultilingualE5Base
                | EmbeddingModel::MultilingualE5Large
        );

        let mut options = InitOptions::default();
        options.model_name = model_name;
        options.show_download_progress = true;

        let model = TextEmbedding::try_new(options)
            .with_context(|| format!("Failed to initialize embedding model '{model_id}'"))?;

        Ok(Self {
            model,
            model_id: model_id.to_string(),
            dimension,
            e5_prefixing,
        })
    }

    fn dimension_of(model_name: &EmbeddingModel) -> usize {
        match model_name {
            EmbeddingModel::MultilingualE5Small => 384,
            EmbeddingModel::MultilingualE5Base => 768,
            EmbeddingModel::MultilingualE5Large => 1024,
            EmbeddingModel::AllMiniLML6V2 => 384,
            EmbeddingModel::BGESmallENV15 => 384,
            EmbeddingModel::BGEBaseENV15 => 768,
            _ => 384, // default
        }
    }
}

impl Embedder for FastembedEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.model
            .embed(texts.to_vec(), None)
            .context("Failed to generate embeddings")
    }

    fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        if self.e5_prefixing {
            // E5 models expect a "query: " prefix for queries
            self.embed(&format!("query: {query}"))
        } else {
            self.embed(query)
        }
    }

    fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if self.e5_prefixing {
            // E5 models expect a "passage: " prefix for documents
            let prefixed: Vec<String> =
                texts.iter().map(|text| format!("passage: {text}")).collect();
            let refs: Vec<&str> = prefixed.iter().map(String::as_str).collect();
            self.embed_batch(&refs)
        } else {
            self.embed_batch(texts)
        }
    }
}

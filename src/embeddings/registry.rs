//! Backend selection rules for embedding models
//!
//! Model ids map to backend constructors through an ordered rule list:
//! each rule pairs a match predicate with a constructor, the first match
//! wins, and the default registry ends with an explicit catch-all.

use std::sync::Arc;

use fastembed::EmbeddingModel;
use tracing::debug;

use super::{Embedder, EmbeddingKey, FastembedEmbedder};
use crate::error::{CacheError, Result};

/// Constructor for an embedding backend.
///
/// Must be a pure function of the key: no side effects beyond returning
/// the handle or a construction error.
pub type BackendCtor = Arc<dyn Fn(&EmbeddingKey) -> anyhow::Result<Arc<dyn Embedder>> + Send + Sync>;

/// Predicate matching a rule against a model id
#[derive(Debug, Clone)]
pub enum ModelMatch {
    Exact(String),
    Prefix(String),
    Contains(String),
    Any,
}

impl ModelMatch {
    pub fn matches(&self, model_id: &str) -> bool {
        match self {
            ModelMatch::Exact(id) => model_id == id,
            ModelMatch::Prefix(prefix) => model_id.starts_with(prefix.as_str()),
            ModelMatch::Contains(needle) => model_id.contains(needle.as_str()),
            ModelMatch::Any => true,
        }
    }
}

/// A single backend rule: predicate plus constructor
#[derive(Clone)]
pub struct BackendRule {
    pub name: &'static str,
    pub matcher: ModelMatch,
    pub ctor: BackendCtor,
}

impl BackendRule {
    pub fn new(name: &'static str, matcher: ModelMatch, ctor: BackendCtor) -> Self {
        Self { name, matcher, ctor }
    }
}

/// Ordered registry of embedding backend rules
pub struct BackendRegistry {
    rules: Vec<BackendRule>,
}

impl BackendRegistry {
    /// An empty registry; every lookup fails until rules are registered
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Registry of the built-in fastembed backends, with a catch-all
    /// multilingual fallback in last position
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(fastembed_rule(
            "bge-small-en",
            ModelMatch::Contains("bge-small-en".to_string()),
            EmbeddingModel::BGESmallENV15,
        ));
        registry.register(fastembed_rule(
            "bge-base-en",
            ModelMatch::Contains("bge-base-en".to_string()),
            EmbeddingModel::BGEBaseENV15,
        ));
        registry.register(fastembed_rule(
            "multilingual-e5-large",
            ModelMatch::Contains("e5-large".to_string()),
            EmbeddingModel::MultilingualE5Large,
        ));
        registry.register(fastembed_rule(
            "multilingual-e5-base",
            ModelMatch::Contains("e5-base".to_string()),
            EmbeddingModel::MultilingualE5Base,
        ));
        registry.register(fastembed_rule(
            "all-minilm-l6-v2",
            ModelMatch::Contains("minilm".to_string()),
            EmbeddingModel::AllMiniLML6V2,
        ));
        registry.register(fastembed_rule(
            "multilingual-e5-small",
            ModelMatch::Any,
            EmbeddingModel::MultilingualE5Small,
        ));
        registry
    }

    /// Append a rule. Rules are evaluated in registration order, so more
    /// specific predicates belong before broader ones.
    pub fn register(&mut self, rule: BackendRule) {
        self.rules.push(rule);
    }

    /// Insert a rule ahead of the existing ones
    pub fn register_front(&mut self, rule: BackendRule) {
        self.rules.insert(0, rule);
    }

    /// Resolve the constructor for a key, first match wins
    pub fn resolve(&self, key: &EmbeddingKey) -> Result<BackendCtor> {
        for rule in &self.rules {
            if rule.matcher.matches(&key.model_id) {
                debug!("model '{}' matched backend rule '{}'", key.model_id, rule.name);
                return Ok(rule.ctor.clone());
            }
        }
        Err(CacheError::UnknownModel {
            model_id: key.model_id.clone(),
        })
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn fastembed_rule(
    name: &'static str,
    matcher: ModelMatch,
    model_name: EmbeddingModel,
) -> BackendRule {
    BackendRule::new(
        name,
        matcher,
        Arc::new(move |key: &EmbeddingKey| {
            let embedder = FastembedEmbedder::new(&key.model_id, model_name.clone())?;
            Ok(Arc::new(embedder) as Arc<dyn Embedder>)
        }),
    )
}

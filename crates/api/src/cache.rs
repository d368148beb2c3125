use async_trait::async_trait;
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use index::{Embedder, EmbeddingError};

/// Bounded concurrent cache of query embeddings, keyed by a hash of the
/// query text. Ingestion always embeds fresh content; only the search path
/// consults this.
pub struct EmbeddingCache {
    entries: DashMap<String, Vec<f32>>,
    max_entries: usize,
}

impl EmbeddingCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries,
        }
    }

    pub fn get(&self, text: &str) -> Option<Vec<f32>> {
        self.entries.get(&hash_text(text)).map(|r| r.value().clone())
    }

    pub fn set(&self, text: &str, embedding: Vec<f32>) {
        if self.entries.len() >= self.max_entries {
            // Coarse eviction: drop a quarter of the entries when full.
            let to_remove: Vec<String> = self
                .entries
                .iter()
                .take(self.max_entries / 4)
                .map(|r| r.key().clone())
                .collect();
            for key in to_remove {
                self.entries.remove(&key);
            }
        }
        self.entries.insert(hash_text(text), embedding);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn hash_text(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// [`Embedder`] decorator that serves single-text requests from the cache.
/// Batch requests pass straight through.
pub struct CachedEmbedder {
    inner: Arc<dyn Embedder>,
    cache: Arc<EmbeddingCache>,
}

impl CachedEmbedder {
    pub fn new(inner: Arc<dyn Embedder>, cache: Arc<EmbeddingCache>) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl Embedder for CachedEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if let [text] = texts {
            if let Some(hit) = self.cache.get(text) {
                return Ok(vec![hit]);
            }
            let vectors = self.inner.embed(texts).await?;
            if let Some(vector) = vectors.first() {
                self.cache.set(text, vector.clone());
            }
            return Ok(vectors);
        }

        self.inner.embed(texts).await
    }
}

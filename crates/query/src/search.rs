use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

use index::{Embedder, EmbeddingError, VectorIndex, VectorIndexError};

pub const DEFAULT_TOP_K: usize = 5;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    VectorIndex(#[from] VectorIndexError),
}

/// One ranked hit, carrying enough stored metadata that a caller can render
/// results without a second content lookup.
#[derive(Debug, Clone, Serialize)]
pub struct SearchMatch {
    pub score: f32,
    pub document_id: String,
    pub title: String,
    pub chunk_index: usize,
    pub chunk_text: String,
    pub metadata: Map<String, Value>,
}

pub struct SearchService {
    embedder: Arc<dyn Embedder>,
    vector_index: Arc<dyn VectorIndex>,
}

impl SearchService {
    pub fn new(embedder: Arc<dyn Embedder>, vector_index: Arc<dyn VectorIndex>) -> Self {
        Self {
            embedder,
            vector_index,
        }
    }

    /// Embed the query and return ranked matches. Fewer than `top_k` hits is
    /// normal for a small index; no retries here.
    pub async fn search(
        &self,
        query: &str,
        top_k: Option<usize>,
    ) -> Result<Vec<SearchMatch>, SearchError> {
        let top_k = top_k.unwrap_or(DEFAULT_TOP_K);

        let texts = vec![query.to_string()];
        let mut vectors = self.embedder.embed(&texts).await?;
        let Some(vector) = vectors.pop() else {
            return Err(EmbeddingError::SizeMismatch {
                expected: 1,
                got: 0,
            }
            .into());
        };

        let matches = self.vector_index.query(&vector, top_k).await?;

        let mut results: Vec<SearchMatch> = matches
            .into_iter()
            .map(|m| SearchMatch {
                score: m.score,
                document_id: string_field(&m.metadata, "document_id"),
                title: string_field(&m.metadata, "title"),
                chunk_index: m
                    .metadata
                    .get("chunk_index")
                    .and_then(Value::as_u64)
                    .unwrap_or(0) as usize,
                chunk_text: string_field(&m.metadata, "chunk_text"),
                metadata: m.metadata,
            })
            .collect();

        // The index already ranks, but the contract is descending score.
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        Ok(results)
    }
}

fn string_field(metadata: &Map<String, Value>, key: &str) -> String {
    metadata
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use index::{VectorMatch, VectorRecord};

    struct FixedEmbedder;

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(texts.iter().map(|_| vec![0.5, 0.5]).collect())
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Err(EmbeddingError::SizeMismatch {
                expected: 1,
                got: 0,
            })
        }
    }

    /// Returns canned matches regardless of the query vector.
    struct CannedIndex {
        matches: Vec<VectorMatch>,
    }

    #[async_trait]
    impl VectorIndex for CannedIndex {
        async fn upsert(&self, _records: &[VectorRecord]) -> Result<(), VectorIndexError> {
            Ok(())
        }

        async fn query(
            &self,
            _vector: &[f32],
            top_k: usize,
        ) -> Result<Vec<VectorMatch>, VectorIndexError> {
            Ok(self.matches.iter().take(top_k).cloned().collect())
        }
    }

    fn hit(id: &str, score: f32, doc: &str, text: &str) -> VectorMatch {
        let mut metadata = Map::new();
        metadata.insert("document_id".to_string(), Value::String(doc.to_string()));
        metadata.insert("title".to_string(), Value::String("Title".to_string()));
        metadata.insert("chunk_text".to_string(), Value::String(text.to_string()));
        metadata.insert("chunk_index".to_string(), Value::from(0u64));
        VectorMatch {
            id: id.to_string(),
            score,
            metadata,
        }
    }

    #[tokio::test]
    async fn small_index_returns_fewer_than_top_k() {
        let service = SearchService::new(
            Arc::new(FixedEmbedder),
            Arc::new(CannedIndex {
                matches: vec![
                    hit("d1-0", 0.9, "d1", "first"),
                    hit("d2-0", 0.7, "d2", "second"),
                ],
            }),
        );

        let results = service.search("anything", Some(5)).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].document_id, "d1");
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn results_are_sorted_by_descending_score() {
        let service = SearchService::new(
            Arc::new(FixedEmbedder),
            Arc::new(CannedIndex {
                matches: vec![
                    hit("a", 0.2, "d1", "low"),
                    hit("b", 0.95, "d2", "high"),
                    hit("c", 0.5, "d3", "mid"),
                ],
            }),
        );

        let results = service.search("anything", None).await.unwrap();
        let scores: Vec<f32> = results.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![0.95, 0.5, 0.2]);
    }

    #[tokio::test]
    async fn embedding_failure_propagates() {
        let service = SearchService::new(
            Arc::new(FailingEmbedder),
            Arc::new(CannedIndex { matches: vec![] }),
        );

        let result = service.search("anything", None).await;
        assert!(matches!(result, Err(SearchError::Embedding(_))));
    }
}

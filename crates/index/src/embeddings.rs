use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EmbeddingError;

/// Embedding-inference collaborator. Output order matches input order:
/// vector `i` embeds text `i`.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

#[derive(Clone)]
pub struct OllamaEmbeddingClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaEmbeddingClient {
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            base_url,
            model,
            client: reqwest::Client::new(),
        }
    }

    /// Probe the embedding dimension by embedding a throwaway input.
    pub async fn dimension(&self) -> Result<usize, EmbeddingError> {
        let probe = vec!["dimension probe".to_string()];
        let vectors = self.embed(&probe).await?;
        Ok(vectors.first().map(|v| v.len()).unwrap_or(0))
    }
}

#[async_trait]
impl Embedder for OllamaEmbeddingClient {
    /// Embed all texts in one batched call to bound outbound request count.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/api/embed", self.base_url);

        let request = EmbedRequest {
            model: &self.model,
            input: texts,
        };

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            return Err(EmbeddingError::Status(response.status()));
        }

        let embed_response: EmbedResponse = response.json().await?;

        if embed_response.embeddings.len() != texts.len() {
            return Err(EmbeddingError::SizeMismatch {
                expected: texts.len(),
                got: embed_response.embeddings.len(),
            });
        }

        Ok(embed_response.embeddings)
    }
}

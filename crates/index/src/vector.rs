use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::error::VectorIndexError;

/// One embedded chunk as stored in the vector index. The `id` is
/// `"{doc_id}-{chunk_index}"`; upserting the same id replaces the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub embedding: Vec<f32>,
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorMatch {
    pub id: String,
    pub score: f32,
    pub metadata: Map<String, Value>,
}

/// Vector-index collaborator. `upsert` is idempotent by record id and
/// all-or-nothing per call; `query` never mutates state and may return fewer
/// than `top_k` matches.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn upsert(&self, records: &[VectorRecord]) -> Result<(), VectorIndexError>;
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<VectorMatch>, VectorIndexError>;
}

/// Qdrant client over its REST API.
pub struct QdrantIndex {
    base_url: String,
    collection: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct CreateCollection {
    vectors: VectorParams,
}

#[derive(Serialize)]
struct VectorParams {
    size: usize,
    distance: String,
}

#[derive(Serialize)]
struct UpsertPoints {
    points: Vec<Point>,
}

#[derive(Serialize)]
struct Point {
    id: u64,
    vector: Vec<f32>,
    payload: Map<String, Value>,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    limit: usize,
    with_payload: bool,
}

#[derive(Deserialize)]
struct SearchResponse {
    result: Vec<ScoredPoint>,
}

#[derive(Deserialize)]
struct ScoredPoint {
    score: f32,
    #[serde(default)]
    payload: Map<String, Value>,
}

/// Payload key carrying the string record id; Qdrant point ids are numeric.
const RECORD_ID_KEY: &str = "record_id";

impl QdrantIndex {
    pub fn new(base_url: String, collection: String) -> Self {
        Self {
            base_url,
            collection,
            client: reqwest::Client::new(),
        }
    }

    /// Create the collection if it does not exist yet, with cosine distance
    /// and the embedder's dimension.
    pub async fn ensure_collection(&self, dimension: usize) -> Result<(), VectorIndexError> {
        let url = format!("{}/collections/{}", self.base_url, self.collection);

        let response = self.client.get(&url).send().await?;
        if response.status().is_success() {
            tracing::debug!(collection = %self.collection, "collection already exists");
            return Ok(());
        }

        tracing::info!(
            collection = %self.collection,
            dimension,
            "creating vector collection"
        );

        let create_req = CreateCollection {
            vectors: VectorParams {
                size: dimension,
                distance: "Cosine".to_string(),
            },
        };

        let response = self.client.put(&url).json(&create_req).send().await?;
        Self::check_status(response).await?;
        Ok(())
    }

    /// Stable numeric point id for a string record id. SHA-256 based so
    /// repeated ingestions across processes land on the same point.
    fn point_id(record_id: &str) -> u64 {
        let digest = Sha256::digest(record_id.as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        u64::from_be_bytes(prefix)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, VectorIndexError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(VectorIndexError::Status { status, body })
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn upsert(&self, records: &[VectorRecord]) -> Result<(), VectorIndexError> {
        if records.is_empty() {
            return Ok(());
        }

        let points = records
            .iter()
            .map(|record| {
                let mut payload = record.metadata.clone();
                payload.insert(
                    RECORD_ID_KEY.to_string(),
                    Value::String(record.id.clone()),
                );
                Point {
                    id: Self::point_id(&record.id),
                    vector: record.embedding.clone(),
                    payload,
                }
            })
            .collect();

        // wait=true makes the write visible before we report success, so a
        // retried request observes its own previous upsert.
        let url = format!(
            "{}/collections/{}/points?wait=true",
            self.base_url, self.collection
        );

        let response = self
            .client
            .put(&url)
            .json(&UpsertPoints { points })
            .send()
            .await?;

        Self::check_status(response).await?;
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<VectorMatch>, VectorIndexError> {
        if top_k == 0 {
            return Err(VectorIndexError::InvalidTopK);
        }

        let url = format!(
            "{}/collections/{}/points/search",
            self.base_url, self.collection
        );

        let request = SearchRequest {
            vector,
            limit: top_k,
            with_payload: true,
        };

        let response = self.client.post(&url).json(&request).send().await?;
        let response = Self::check_status(response).await?;

        let search_response: SearchResponse = response
            .json()
            .await
            .map_err(|e| VectorIndexError::Malformed(e.to_string()))?;

        let matches = search_response
            .result
            .into_iter()
            .map(|point| {
                let mut metadata = point.payload;
                let id = match metadata.remove(RECORD_ID_KEY) {
                    Some(Value::String(id)) => id,
                    _ => String::new(),
                };
                VectorMatch {
                    id,
                    score: point.score,
                    metadata,
                }
            })
            .collect();

        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_ids_are_stable_and_distinct() {
        let a = QdrantIndex::point_id("doc-1-0");
        let b = QdrantIndex::point_id("doc-1-0");
        let c = QdrantIndex::point_id("doc-1-1");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}

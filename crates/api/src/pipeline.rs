use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use extract::Extractor;
use index::{
    document_content_key, DocumentStore, Embedder, EmbeddingError, GraphStore, ObjectStore,
    ObjectStoreError, StoreError, VectorIndex, VectorIndexError, VectorRecord,
};
use ingest::{content_preview, Chunker, Document, DocumentStatus, PREVIEW_MAX_CHARS};

use crate::metrics::Metrics;

/// Fatal ingestion failures — the vector path and the document-metadata
/// writes. Graph-path failures never surface here; they degrade to a
/// zero-node outcome.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("document store failure: {0}")]
    Store(#[from] StoreError),

    #[error("object storage failure: {0}")]
    ObjectStore(#[from] ObjectStoreError),

    #[error("embedding failure: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("vector index failure: {0}")]
    VectorIndex(#[from] VectorIndexError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestRequest {
    /// Stable id for re-ingestion; generated when absent.
    pub document_id: Option<String>,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub success: bool,
    pub document_id: String,
    pub chunk_count: usize,
    /// Entities extracted and persisted; 0 whenever the graph path degraded.
    pub graph_node_count: usize,
}

/// Stateless coordinator for one ingestion request. Sequences
/// chunking → embedding → vector upsert (fatal on failure) and then
/// extraction → graph persist (best-effort).
pub struct IngestionPipeline {
    chunker: Chunker,
    documents: DocumentStore,
    graph: GraphStore,
    objects: Arc<dyn ObjectStore>,
    embedder: Arc<dyn Embedder>,
    vectors: Arc<dyn VectorIndex>,
    extractor: Extractor,
    metrics: Arc<Metrics>,
}

impl IngestionPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        chunker: Chunker,
        documents: DocumentStore,
        graph: GraphStore,
        objects: Arc<dyn ObjectStore>,
        embedder: Arc<dyn Embedder>,
        vectors: Arc<dyn VectorIndex>,
        extractor: Extractor,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            chunker,
            documents,
            graph,
            objects,
            embedder,
            vectors,
            extractor,
            metrics,
        }
    }

    pub async fn ingest(
        &self,
        user_id: &str,
        request: IngestRequest,
    ) -> Result<IngestOutcome, PipelineError> {
        let doc_id = request
            .document_id
            .clone()
            .unwrap_or_else(ingest::generate_doc_id);

        let now = Utc::now();
        let document = Document {
            id: doc_id.clone(),
            title: request.title.clone(),
            content_preview: content_preview(&request.content, PREVIEW_MAX_CHARS),
            metadata: request.metadata.clone(),
            status: DocumentStatus::Processing,
            chunk_count: 0,
            created_at: now,
            uploaded_at: now,
        };

        // The document row must exist before anything else runs; the graph
        // path relies on it, and there is nothing to mark on failure yet.
        self.documents.register(&document).await?;

        let chunk_count = match self.run_vector_path(user_id, &doc_id, &request).await {
            Ok(count) => count,
            Err(e) => {
                let reason = e.to_string();
                tracing::error!(doc_id = %doc_id, error = %reason, "ingestion failed");
                if let Err(mark_err) = self.documents.mark_error(&doc_id, &reason).await {
                    tracing::error!(doc_id = %doc_id, error = %mark_err, "failed to record error status");
                }
                self.metrics.record_ingest(false, 0);
                return Err(e);
            }
        };

        let graph_node_count = self.run_graph_path(&doc_id, &request).await;

        self.metrics.record_ingest(true, chunk_count);

        Ok(IngestOutcome {
            success: true,
            document_id: doc_id,
            chunk_count,
            graph_node_count,
        })
    }

    /// Store content, embed every chunk in one batch, and upsert the
    /// vectors. Any failure here aborts the request.
    async fn run_vector_path(
        &self,
        user_id: &str,
        doc_id: &str,
        request: &IngestRequest,
    ) -> Result<usize, PipelineError> {
        let key = document_content_key(user_id, doc_id);
        let mut object_meta = HashMap::new();
        object_meta.insert("title".to_string(), request.title.clone());
        self.objects
            .put(&key, request.content.as_bytes(), &object_meta)
            .await?;

        let chunks = self.chunker.split(doc_id, &request.content);
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed(&texts).await?;

        let records: Vec<VectorRecord> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| {
                let mut metadata = request.metadata.clone();
                metadata.insert(
                    "document_id".to_string(),
                    Value::String(doc_id.to_string()),
                );
                metadata.insert("title".to_string(), Value::String(request.title.clone()));
                metadata.insert(
                    "chunk_text".to_string(),
                    Value::String(chunk.text.clone()),
                );
                metadata.insert("chunk_index".to_string(), Value::from(chunk.index as u64));
                VectorRecord {
                    id: chunk.vector_id(),
                    embedding,
                    metadata,
                }
            })
            .collect();

        self.vectors.upsert(&records).await?;
        self.documents.mark_indexed(doc_id, chunks.len()).await?;

        tracing::info!(doc_id = %doc_id, chunks = chunks.len(), "vector path complete");
        Ok(chunks.len())
    }

    /// Best-effort enrichment. Extraction never fails by contract; a persist
    /// failure is logged and counted, and the document stays `indexed`.
    async fn run_graph_path(&self, doc_id: &str, request: &IngestRequest) -> usize {
        let graph = self.extractor.extract(&request.content).await;
        let node_count = graph.nodes.len();

        match self
            .graph
            .persist_extraction(doc_id, &request.title, &graph)
            .await
        {
            Ok(()) => {
                tracing::info!(doc_id = %doc_id, nodes = node_count, "graph path complete");
                node_count
            }
            Err(e) => {
                tracing::warn!(doc_id = %doc_id, error = %e, "graph persist failed, document stays indexed");
                self.metrics.record_graph_degraded();
                0
            }
        }
    }
}

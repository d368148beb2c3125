use thiserror::Error;

/// Failure talking to the embedding-inference collaborator. Fatal to the
/// enclosing ingestion or search; the vector path has no partial-success
/// mode.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("embedding service returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("embedding service returned {got} vectors for {expected} inputs")]
    SizeMismatch { expected: usize, got: usize },
}

/// Failure talking to the vector-index collaborator. Fatal to the enclosing
/// ingestion or search.
#[derive(Debug, Error)]
pub enum VectorIndexError {
    #[error("vector index request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("vector index returned status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("vector index response malformed: {0}")]
    Malformed(String),

    #[error("top_k must be a positive integer")]
    InvalidTopK,
}

/// Relational store failure. Fatal when it hits the document-metadata write;
/// the orchestrator treats it as non-fatal when it hits the graph batch.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("relational store error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("stored metadata unreadable: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("stored timestamp unreadable: {0}")]
    Timestamp(#[from] chrono::ParseError),
}

/// Object storage failure. The object store owns full document content, so
/// a failed put aborts ingestion before the vector path starts.
#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("object storage request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("object storage returned status {status} for key '{key}'")]
    Status {
        status: reqwest::StatusCode,
        key: String,
    },

    #[error("object storage credentials missing: {0}")]
    Credentials(String),
}

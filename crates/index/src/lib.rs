pub mod db;
pub mod documents;
pub mod embeddings;
pub mod error;
pub mod graph;
pub mod object_store;
pub mod vector;

pub use db::{connect, init_schema};
pub use documents::DocumentStore;
pub use embeddings::{Embedder, OllamaEmbeddingClient};
pub use error::{EmbeddingError, ObjectStoreError, StoreError, VectorIndexError};
pub use graph::{document_node_id, edge_id, GraphEdgeRow, GraphNodeRow, GraphStore};
pub use object_store::{
    document_content_key, ObjectStore, ObjectSummary, S3Config, S3ObjectStore,
};
pub use vector::{QdrantIndex, VectorIndex, VectorMatch, VectorRecord};

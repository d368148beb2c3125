pub mod chunk;
pub mod chunker;
pub mod document;

pub use chunk::Chunk;
pub use chunker::{Chunker, ChunkerConfig};
pub use document::{content_preview, Document, DocumentStatus, PREVIEW_MAX_CHARS};

use uuid::Uuid;

/// Generate a fresh document ID for callers that did not supply one.
pub fn generate_doc_id() -> String {
    Uuid::new_v4().to_string()
}

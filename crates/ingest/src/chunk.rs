use serde::{Deserialize, Serialize};

/// A contiguous span of a document's full content, the unit of embedding.
///
/// Chunks are derived on the fly and never persisted on their own; the pair
/// `(doc_id, index)` identifies one uniquely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub doc_id: String,
    pub index: usize,
    pub text: String,
}

impl Chunk {
    pub fn new(doc_id: String, index: usize, text: String) -> Self {
        Self {
            doc_id,
            index,
            text,
        }
    }

    /// Stable vector-record ID. Chunks of one document never collide, and
    /// re-ingesting the same document reproduces the same IDs.
    pub fn vector_id(&self) -> String {
        format!("{}-{}", self.doc_id, self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_id_combines_doc_and_index() {
        let chunk = Chunk::new("doc-1".to_string(), 4, "text".to_string());
        assert_eq!(chunk.vector_id(), "doc-1-4");
    }
}

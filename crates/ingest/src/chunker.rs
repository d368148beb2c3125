use crate::chunk::Chunk;

pub struct ChunkerConfig {
    /// Maximum characters per chunk. Splitting is purely by character count;
    /// no word or sentence awareness is applied.
    pub max_chunk_chars: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: 512,
        }
    }
}

pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    /// Split document content into ordered, non-overlapping spans that cover
    /// the content exactly. The final span may be shorter than the maximum;
    /// empty content yields no chunks.
    pub fn split(&self, doc_id: &str, content: &str) -> Vec<Chunk> {
        let max_chars = self.config.max_chunk_chars;
        let mut chunks = Vec::new();
        let mut current = String::with_capacity(max_chars);
        let mut current_len = 0;

        for ch in content.chars() {
            current.push(ch);
            current_len += 1;
            if current_len == max_chars {
                chunks.push(Chunk::new(
                    doc_id.to_string(),
                    chunks.len(),
                    std::mem::take(&mut current),
                ));
                current_len = 0;
            }
        }

        if !current.is_empty() {
            chunks.push(Chunk::new(doc_id.to_string(), chunks.len(), current));
        }

        chunks
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(ChunkerConfig::default())
    }
}

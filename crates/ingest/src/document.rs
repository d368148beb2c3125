use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Upper bound on the stored content preview.
pub const PREVIEW_MAX_CHARS: usize = 500;

/// Document metadata as held by the relational store. Full content lives in
/// object storage and is never stored here; `content_preview` is always a
/// prefix of it, truncated to [`PREVIEW_MAX_CHARS`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub content_preview: String,
    pub metadata: Map<String, Value>,
    pub status: DocumentStatus,
    pub chunk_count: usize,
    pub created_at: DateTime<Utc>,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Processing,
    Indexed,
    Error,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Processing => "processing",
            DocumentStatus::Indexed => "indexed",
            DocumentStatus::Error => "error",
        }
    }

    pub fn from_db(s: &str) -> Self {
        match s {
            "indexed" => DocumentStatus::Indexed,
            "error" => DocumentStatus::Error,
            _ => DocumentStatus::Processing,
        }
    }
}

/// First `max_chars` characters of the content, for fast listing. The
/// preview is display-only; embedding and extraction always read the full
/// content from object storage.
pub fn content_preview(content: &str, max_chars: usize) -> String {
    content.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_is_a_bounded_prefix() {
        let content = "a".repeat(10_000);
        let preview = content_preview(&content, PREVIEW_MAX_CHARS);
        assert_eq!(preview.chars().count(), 500);
        assert!(content.starts_with(&preview));
    }

    #[test]
    fn short_content_is_returned_whole() {
        assert_eq!(content_preview("short note", PREVIEW_MAX_CHARS), "short note");
    }

    #[test]
    fn preview_respects_char_boundaries() {
        let content = "é".repeat(600);
        let preview = content_preview(&content, PREVIEW_MAX_CHARS);
        assert_eq!(preview.chars().count(), 500);
    }

    #[test]
    fn status_round_trips_through_db_strings() {
        for status in [
            DocumentStatus::Processing,
            DocumentStatus::Indexed,
            DocumentStatus::Error,
        ] {
            assert_eq!(DocumentStatus::from_db(status.as_str()), status);
        }
    }
}

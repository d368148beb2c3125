pub mod llm;
pub mod parse;
pub mod prompt;
pub mod schema;

pub use llm::{ChatMessage, GenerativeModel, OllamaChatClient};
pub use parse::{parse_graph, strip_code_fences};
pub use schema::{ExtractedEdge, ExtractedGraph, ExtractedNode};

use std::sync::Arc;

/// Extraction reads at most this many characters of content; beyond that
/// point model consistency degrades and cost is unbounded.
pub const EXCERPT_MAX_CHARS: usize = 2000;

const EXTRACTION_MAX_TOKENS: u32 = 1024;

/// Best-effort entity/relation extractor. Extraction is an enrichment, never
/// a blocking dependency: any failure (network, status, parse, shape)
/// degrades to the empty graph and is only logged.
pub struct Extractor {
    model: Arc<dyn GenerativeModel>,
}

impl Extractor {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }

    /// Extract a node/edge graph from document content. Never fails.
    pub async fn extract(&self, content: &str) -> ExtractedGraph {
        let excerpt: String = content.chars().take(EXCERPT_MAX_CHARS).collect();
        if excerpt.trim().is_empty() {
            return ExtractedGraph::default();
        }

        let messages = [ChatMessage::user(prompt::build_extraction_prompt(&excerpt))];

        // Request and parse failures behave identically but are logged
        // apart, so a flaky collaborator can be told from a rambling model.
        let response = match self
            .model
            .complete(&messages, Some(EXTRACTION_MAX_TOKENS))
            .await
        {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "extraction request failed, returning empty graph");
                return ExtractedGraph::default();
            }
        };

        match parse_graph(&response) {
            Ok(graph) => {
                tracing::debug!(
                    nodes = graph.nodes.len(),
                    edges = graph.edges.len(),
                    "extraction complete"
                );
                graph
            }
            Err(e) => {
                tracing::warn!(error = %e, "extraction response unparseable, returning empty graph");
                ExtractedGraph::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;

    struct CannedModel {
        response: Result<String, String>,
    }

    impl CannedModel {
        fn ok(text: &str) -> Arc<Self> {
            Arc::new(Self {
                response: Ok(text.to_string()),
            })
        }

        fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                response: Err(message.to_string()),
            })
        }
    }

    #[async_trait]
    impl GenerativeModel for CannedModel {
        async fn complete(
            &self,
            _messages: &[ChatMessage],
            _max_tokens: Option<u32>,
        ) -> Result<String> {
            match &self.response {
                Ok(text) => Ok(text.clone()),
                Err(message) => anyhow::bail!("{}", message),
            }
        }
    }

    /// Records the prompt it was sent, so tests can assert on excerpt size.
    struct RecordingModel {
        seen: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl GenerativeModel for RecordingModel {
        async fn complete(
            &self,
            messages: &[ChatMessage],
            _max_tokens: Option<u32>,
        ) -> Result<String> {
            self.seen
                .lock()
                .unwrap()
                .push(messages[0].content.clone());
            Ok(r#"{"nodes": [], "edges": []}"#.to_string())
        }
    }

    #[tokio::test]
    async fn network_failure_degrades_to_empty_graph() {
        let extractor = Extractor::new(CannedModel::failing("connection refused"));
        let graph = extractor.extract("some document text").await;
        assert!(graph.is_empty());
    }

    #[tokio::test]
    async fn malformed_response_degrades_to_empty_graph() {
        let extractor = Extractor::new(CannedModel::ok("```json\n{\"nodes\": [{\"id\":"));
        let graph = extractor.extract("some document text").await;
        assert!(graph.is_empty());
    }

    #[tokio::test]
    async fn fenced_response_is_parsed() {
        let extractor = Extractor::new(CannedModel::ok(
            "```json\n{\"nodes\": [{\"id\": \"Alpha\", \"type\": \"Concept\", \"summary\": \"s\"}], \"edges\": []}\n```",
        ));
        let graph = extractor.extract("some document text").await;
        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.nodes[0].id, "Alpha");
    }

    #[tokio::test]
    async fn excerpt_is_capped_even_for_large_content() {
        let model = Arc::new(RecordingModel {
            seen: std::sync::Mutex::new(Vec::new()),
        });
        let extractor = Extractor::new(model.clone());

        let content = "a".repeat(50_000);
        extractor.extract(&content).await;

        let prompts = model.seen.lock().unwrap();
        let prompt = &prompts[0];
        let start = prompt.find("TEXT:\n").unwrap() + "TEXT:\n".len();
        let end = prompt.rfind("\n\nJSON OUTPUT:").unwrap();
        assert_eq!(prompt[start..end].chars().count(), EXCERPT_MAX_CHARS);
    }

    #[tokio::test]
    async fn blank_content_skips_the_model_entirely() {
        let extractor = Extractor::new(CannedModel::failing("must not be called"));
        let graph = extractor.extract("   \n  ").await;
        assert!(graph.is_empty());
    }
}

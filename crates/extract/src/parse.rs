use anyhow::{Context, Result};

use crate::schema::ExtractedGraph;

/// Strip a markdown code fence wrapping, if any. Generative models often
/// wrap JSON in ```json ... ``` despite instructions; a missing closing
/// fence is tolerated (the remainder is handed to the JSON parser as-is).
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();

    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the info string ("json", "JSON", ...) up to the first newline.
    let rest = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };

    match rest.trim_end().strip_suffix("```") {
        Some(inner) => inner.trim(),
        None => rest.trim(),
    }
}

/// Two-stage parse of model output: strip wrapping markers, then attempt a
/// structured parse. Shape problems inside an otherwise valid response are
/// handled by [`ExtractedGraph::sanitized`], not here.
pub fn parse_graph(text: &str) -> Result<ExtractedGraph> {
    let body = strip_code_fences(text);
    let graph: ExtractedGraph =
        serde_json::from_str(body).context("Response is not a valid node/edge graph")?;
    Ok(graph.sanitized())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fenced_json() {
        let text = "```json\n{\"nodes\": [], \"edges\": []}\n```";
        assert_eq!(strip_code_fences(text), "{\"nodes\": [], \"edges\": []}");
    }

    #[test]
    fn strips_fence_without_language_tag() {
        let text = "```\n{}\n```";
        assert_eq!(strip_code_fences(text), "{}");
    }

    #[test]
    fn leaves_unfenced_text_alone() {
        assert_eq!(strip_code_fences("  {\"nodes\": []} "), "{\"nodes\": []}");
    }

    #[test]
    fn tolerates_missing_closing_fence() {
        let text = "```json\n{\"nodes\": [], \"edges\": []}";
        assert_eq!(strip_code_fences(text), "{\"nodes\": [], \"edges\": []}");
    }

    #[test]
    fn parses_a_well_formed_graph() {
        let text = r#"```json
{"nodes": [{"id": "Rust", "type": "Technology", "summary": "A language"}],
 "edges": [{"source": "Rust", "target": "Cargo", "relation": "ships with"}]}
```"#;
        let graph = parse_graph(text).unwrap();
        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.edges.len(), 1);
    }

    #[test]
    fn truncated_json_is_an_error_not_a_panic() {
        assert!(parse_graph("{\"nodes\": [{\"id\": \"Ru").is_err());
    }

    #[test]
    fn prose_response_is_an_error() {
        assert!(parse_graph("I could not find any entities in this text.").is_err());
    }
}

use serde::{Deserialize, Serialize};

/// An entity produced by the generative model. The `id` is the canonical
/// entity name and acts as the global dedup key in the graph store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedNode {
    pub id: String,
    #[serde(rename = "type", default)]
    pub node_type: String,
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedEdge {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub relation: String,
}

/// Node/edge graph extracted from one document excerpt. `Default` is the
/// empty graph, which is also the degraded result for any extraction
/// failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedGraph {
    #[serde(default)]
    pub nodes: Vec<ExtractedNode>,
    #[serde(default)]
    pub edges: Vec<ExtractedEdge>,
}

impl ExtractedGraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Best-effort shape check: drop nodes without an id and edges whose
    /// endpoints are blank. Model output is untrusted.
    pub fn sanitized(mut self) -> Self {
        self.nodes.retain(|n| !n.id.trim().is_empty());
        self.edges
            .retain(|e| !e.source.trim().is_empty() && !e.target.trim().is_empty());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_drops_blank_ids_and_endpoints() {
        let graph = ExtractedGraph {
            nodes: vec![
                ExtractedNode {
                    id: "Rust".to_string(),
                    node_type: "Technology".to_string(),
                    summary: String::new(),
                },
                ExtractedNode {
                    id: "  ".to_string(),
                    node_type: "Concept".to_string(),
                    summary: String::new(),
                },
            ],
            edges: vec![
                ExtractedEdge {
                    source: "Rust".to_string(),
                    target: String::new(),
                    relation: "uses".to_string(),
                },
                ExtractedEdge {
                    source: "Rust".to_string(),
                    target: "Cargo".to_string(),
                    relation: "ships with".to_string(),
                },
            ],
        };

        let clean = graph.sanitized();
        assert_eq!(clean.nodes.len(), 1);
        assert_eq!(clean.edges.len(), 1);
        assert_eq!(clean.edges[0].target, "Cargo");
    }

    #[test]
    fn missing_optional_fields_deserialize_to_defaults() {
        let graph: ExtractedGraph =
            serde_json::from_str(r#"{"nodes": [{"id": "X"}], "edges": []}"#).unwrap();
        assert_eq!(graph.nodes[0].node_type, "");
        assert_eq!(graph.nodes[0].summary, "");
    }
}

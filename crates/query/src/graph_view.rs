use serde::Serialize;

use index::{GraphStore, StoreError};

/// Display-oriented caps, not correctness constraints: the visualization
/// consumer renders at most this much.
pub const GRAPH_NODE_CAP: usize = 100;
pub const GRAPH_EDGE_CAP: usize = 150;

const DOCUMENT_NODE_VAL: u32 = 8;
const ENTITY_NODE_VAL: u32 = 3;

#[derive(Debug, Clone, Serialize)]
pub struct GraphViewNode {
    pub id: String,
    pub label: String,
    /// Node type, surfaced as the visual grouping key.
    pub group: String,
    /// Visual weight; document anchors render larger.
    pub val: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphViewEdge {
    pub source: String,
    pub target: String,
    pub relation: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphView {
    pub nodes: Vec<GraphViewNode>,
    pub edges: Vec<GraphViewEdge>,
}

/// Read-only reshape of the stored graph for a visualization consumer.
pub async fn graph_view(store: &GraphStore) -> Result<GraphView, StoreError> {
    let nodes = store
        .nodes(GRAPH_NODE_CAP)
        .await?
        .into_iter()
        .map(|node| {
            let val = if node.node_type == index::graph::DOC_NODE_TYPE {
                DOCUMENT_NODE_VAL
            } else {
                ENTITY_NODE_VAL
            };
            GraphViewNode {
                id: node.id,
                label: node.label,
                group: node.node_type,
                val,
            }
        })
        .collect();

    let edges = store
        .edges(GRAPH_EDGE_CAP)
        .await?
        .into_iter()
        .map(|edge| GraphViewEdge {
            source: edge.source,
            target: edge.target,
            relation: edge.relation,
        })
        .collect();

    Ok(GraphView { nodes, edges })
}

#[cfg(test)]
mod tests {
    use super::*;
    use extract::{ExtractedEdge, ExtractedGraph, ExtractedNode};

    async fn store() -> GraphStore {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        index::init_schema(&pool).await.unwrap();
        GraphStore::new(pool)
    }

    fn big_graph(node_count: usize, edge_count: usize) -> ExtractedGraph {
        let nodes = (0..node_count)
            .map(|i| ExtractedNode {
                id: format!("Entity {}", i),
                node_type: "Concept".to_string(),
                summary: String::new(),
            })
            .collect();

        let edges = (0..edge_count)
            .map(|i| ExtractedEdge {
                source: format!("Entity {}", i % node_count),
                target: format!("Entity {}", (i + 1) % node_count),
                relation: format!("relates {}", i),
            })
            .collect();

        ExtractedGraph { nodes, edges }
    }

    #[tokio::test]
    async fn view_is_capped_regardless_of_store_size() {
        let store = store().await;
        store
            .persist_extraction("doc-1", "Big Doc", &big_graph(150, 200))
            .await
            .unwrap();

        let view = graph_view(&store).await.unwrap();
        assert!(view.nodes.len() <= GRAPH_NODE_CAP);
        assert!(view.edges.len() <= GRAPH_EDGE_CAP);
        assert_eq!(view.nodes.len(), GRAPH_NODE_CAP);
        assert_eq!(view.edges.len(), GRAPH_EDGE_CAP);
    }

    #[tokio::test]
    async fn document_nodes_carry_the_larger_weight() {
        let store = store().await;
        store
            .persist_extraction("doc-1", "Weighted", &big_graph(2, 1))
            .await
            .unwrap();

        let view = graph_view(&store).await.unwrap();

        let doc = view.nodes.iter().find(|n| n.id == "DOC:doc-1").unwrap();
        assert_eq!(doc.group, "Document");
        assert_eq!(doc.val, 8);
        assert_eq!(doc.label, "Weighted");

        let entity = view.nodes.iter().find(|n| n.id == "Entity 0").unwrap();
        assert_eq!(entity.val, 3);
        assert_eq!(entity.group, "Concept");
    }
}

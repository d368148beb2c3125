use serde::Serialize;
use sqlx::{Row, SqlitePool};

use extract::ExtractedGraph;

use crate::error::StoreError;

pub const DOC_NODE_PREFIX: &str = "DOC:";
pub const DOC_NODE_TYPE: &str = "Document";
const MENTIONS_RELATION: &str = "mentions";

/// How many extracted entities each document is linked to via `mentions`
/// edges.
const MENTIONS_PER_DOCUMENT: usize = 3;

#[derive(Debug, Clone, Serialize)]
pub struct GraphNodeRow {
    pub id: String,
    pub label: String,
    pub node_type: String,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphEdgeRow {
    pub id: String,
    pub source: String,
    pub target: String,
    pub relation: String,
}

/// Synthetic node id anchoring a document in the graph.
pub fn document_node_id(doc_id: &str) -> String {
    format!("{}{}", DOC_NODE_PREFIX, doc_id)
}

/// Deterministic edge id: `source-relation-target` with whitespace runs
/// collapsed, so repeated extraction of the same relation is a no-op.
pub fn edge_id(source: &str, relation: &str, target: &str) -> String {
    collapse_whitespace(&format!("{}-{}-{}", source, relation, target))
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join("_")
}

/// Knowledge-graph store. All writes are insert-if-absent, which makes
/// concurrent ingestions that extract the same entity converge without
/// locks.
#[derive(Clone)]
pub struct GraphStore {
    pool: SqlitePool,
}

impl GraphStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Write one extraction as a single atomic batch: every node and edge,
    /// the synthetic document node, and a `mentions` edge to each of the
    /// first few extracted entities. The document node is written even when
    /// the extraction is empty, so every ingested document is
    /// graph-discoverable.
    pub async fn persist_extraction(
        &self,
        doc_id: &str,
        title: &str,
        graph: &ExtractedGraph,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        for node in &graph.nodes {
            sqlx::query(
                "INSERT OR IGNORE INTO graph_nodes (id, label, type, summary) VALUES (?, ?, ?, ?)",
            )
            .bind(&node.id)
            .bind(&node.id)
            .bind(&node.node_type)
            .bind(&node.summary)
            .execute(&mut *tx)
            .await?;
        }

        for edge in &graph.edges {
            sqlx::query(
                "INSERT OR IGNORE INTO graph_edges (id, source, target, relation) VALUES (?, ?, ?, ?)",
            )
            .bind(edge_id(&edge.source, &edge.relation, &edge.target))
            .bind(&edge.source)
            .bind(&edge.target)
            .bind(&edge.relation)
            .execute(&mut *tx)
            .await?;
        }

        let doc_node = document_node_id(doc_id);
        sqlx::query(
            "INSERT OR IGNORE INTO graph_nodes (id, label, type, summary) VALUES (?, ?, ?, ?)",
        )
        .bind(&doc_node)
        .bind(title)
        .bind(DOC_NODE_TYPE)
        .bind("")
        .execute(&mut *tx)
        .await?;

        for node in graph.nodes.iter().take(MENTIONS_PER_DOCUMENT) {
            sqlx::query(
                "INSERT OR IGNORE INTO graph_edges (id, source, target, relation) VALUES (?, ?, ?, ?)",
            )
            .bind(edge_id(&doc_node, MENTIONS_RELATION, &node.id))
            .bind(&doc_node)
            .bind(&node.id)
            .bind(MENTIONS_RELATION)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn nodes(&self, limit: usize) -> Result<Vec<GraphNodeRow>, StoreError> {
        let rows = sqlx::query("SELECT id, label, type, summary FROM graph_nodes LIMIT ?")
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| {
                Ok(GraphNodeRow {
                    id: row.try_get("id")?,
                    label: row.try_get("label")?,
                    node_type: row.try_get("type")?,
                    summary: row.try_get("summary")?,
                })
            })
            .collect()
    }

    pub async fn edges(&self, limit: usize) -> Result<Vec<GraphEdgeRow>, StoreError> {
        let rows = sqlx::query("SELECT id, source, target, relation FROM graph_edges LIMIT ?")
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| {
                Ok(GraphEdgeRow {
                    id: row.try_get("id")?,
                    source: row.try_get("source")?,
                    target: row.try_get("target")?,
                    relation: row.try_get("relation")?,
                })
            })
            .collect()
    }

    pub async fn node_count(&self) -> Result<usize, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM graph_nodes")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }

    pub async fn edge_count(&self) -> Result<usize, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM graph_edges")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use extract::{ExtractedEdge, ExtractedNode};

    async fn store() -> GraphStore {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::init_schema(&pool).await.unwrap();
        GraphStore::new(pool)
    }

    fn node(id: &str) -> ExtractedNode {
        ExtractedNode {
            id: id.to_string(),
            node_type: "Concept".to_string(),
            summary: format!("About {}", id),
        }
    }

    fn sample_graph() -> ExtractedGraph {
        ExtractedGraph {
            nodes: vec![node("Alpha"), node("Beta"), node("Gamma"), node("Delta")],
            edges: vec![ExtractedEdge {
                source: "Alpha".to_string(),
                target: "Beta".to_string(),
                relation: "depends on".to_string(),
            }],
        }
    }

    #[test]
    fn edge_ids_collapse_whitespace() {
        assert_eq!(
            edge_id("Acme Corp", "builds  widgets", "Widget"),
            "Acme_Corp-builds_widgets-Widget"
        );
        assert_eq!(
            edge_id("Acme Corp", "builds widgets", "Widget"),
            edge_id("Acme  Corp", "builds\twidgets", "Widget"),
        );
    }

    #[tokio::test]
    async fn persist_writes_nodes_edges_and_document_anchor() {
        let store = store().await;
        store
            .persist_extraction("doc-1", "My Doc", &sample_graph())
            .await
            .unwrap();

        // 4 extracted nodes + 1 document node
        assert_eq!(store.node_count().await.unwrap(), 5);
        // 1 extracted edge + 3 mentions edges (capped at 3 of 4 nodes)
        assert_eq!(store.edge_count().await.unwrap(), 4);

        let nodes = store.nodes(100).await.unwrap();
        let doc_node = nodes
            .iter()
            .find(|n| n.id == "DOC:doc-1")
            .expect("document node missing");
        assert_eq!(doc_node.label, "My Doc");
        assert_eq!(doc_node.node_type, "Document");
    }

    #[tokio::test]
    async fn persist_is_idempotent() {
        let store = store().await;
        let graph = sample_graph();

        store.persist_extraction("doc-1", "My Doc", &graph).await.unwrap();
        let nodes_after_first = store.node_count().await.unwrap();
        let edges_after_first = store.edge_count().await.unwrap();

        store.persist_extraction("doc-1", "My Doc", &graph).await.unwrap();
        assert_eq!(store.node_count().await.unwrap(), nodes_after_first);
        assert_eq!(store.edge_count().await.unwrap(), edges_after_first);
    }

    #[tokio::test]
    async fn empty_extraction_still_anchors_the_document() {
        let store = store().await;
        store
            .persist_extraction("doc-2", "Empty Doc", &ExtractedGraph::default())
            .await
            .unwrap();

        assert_eq!(store.node_count().await.unwrap(), 1);
        assert_eq!(store.edge_count().await.unwrap(), 0);

        let nodes = store.nodes(10).await.unwrap();
        assert_eq!(nodes[0].id, "DOC:doc-2");
    }

    #[tokio::test]
    async fn shared_entities_converge_across_documents() {
        let store = store().await;
        let graph = ExtractedGraph {
            nodes: vec![node("Shared")],
            edges: vec![],
        };

        store.persist_extraction("doc-1", "First", &graph).await.unwrap();
        store.persist_extraction("doc-2", "Second", &graph).await.unwrap();

        // One shared entity node plus two document nodes.
        assert_eq!(store.node_count().await.unwrap(), 3);

        let nodes = store.nodes(10).await.unwrap();
        let shared: Vec<_> = nodes.iter().filter(|n| n.id == "Shared").collect();
        assert_eq!(shared.len(), 1);
    }
}

pub mod graph_view;
pub mod search;

pub use graph_view::{graph_view, GraphView, GraphViewEdge, GraphViewNode, GRAPH_EDGE_CAP, GRAPH_NODE_CAP};
pub use search::{SearchError, SearchMatch, SearchService, DEFAULT_TOP_K};

//! In-memory knowledge graph backed by `petgraph`

use std::collections::HashMap;
use std::fmt;

use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableUnGraph};
use petgraph::visit::EdgeRef;
use serde::Serialize;
use serde_json::Value;

use super::model::{Attributes, EdgeRecord, NodeRecord};
use super::node_link::NodeLinkData;
use super::GraphError;

/// Payload stored on each petgraph node
#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) id: String,
    pub(crate) attributes: Attributes,
}

/// Simple undirected graph keyed by string identifiers.
///
/// At most one edge joins any pair of nodes; adding an edge for an existing
/// pair merges the new attributes into it. Adding an edge creates missing
/// endpoints.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeGraph {
    graph: StableUnGraph<Node, Attributes>,
    index: HashMap<String, NodeIndex>,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, or merge `attributes` into an existing one
    pub fn add_node(&mut self, id: &str, attributes: Attributes) -> NodeIndex {
        match self.index.get(id) {
            Some(&ix) => {
                if let Some(node) = self.graph.node_weight_mut(ix) {
                    node.attributes.extend(attributes);
                }
                ix
            }
            None => {
                let ix = self.graph.add_node(Node {
                    id: id.to_string(),
                    attributes,
                });
                self.index.insert(id.to_string(), ix);
                ix
            }
        }
    }

    /// Add a node, recording its lifetime (e.g. "1724-1804") when given
    pub fn add_node_with_lifetime(
        &mut self,
        id: &str,
        mut attributes: Attributes,
        lifetime: Option<&str>,
    ) -> NodeIndex {
        if let Some(lifetime) = lifetime.filter(|l| !l.trim().is_empty()) {
            attributes.insert("lifetime".to_string(), Value::String(lifetime.to_string()));
        }
        self.add_node(id, attributes)
    }

    /// Add an edge between `a` and `b`, creating either node if missing
    pub fn add_edge(&mut self, a: &str, b: &str, attributes: Attributes) -> EdgeIndex {
        let ia = self.add_node(a, Attributes::new());
        let ib = self.add_node(b, Attributes::new());

        match self.graph.find_edge(ia, ib) {
            Some(ix) => {
                if let Some(existing) = self.graph.edge_weight_mut(ix) {
                    existing.extend(attributes);
                }
                ix
            }
            None => self.graph.add_edge(ia, ib, attributes),
        }
    }

    /// Remove a node and its incident edges. Returns false if it did not exist.
    pub fn remove_node(&mut self, id: &str) -> bool {
        match self.index.remove(id) {
            Some(ix) => self.graph.remove_node(ix).is_some(),
            None => false,
        }
    }

    /// Remove the edge joining `a` and `b`. Returns false if there was none.
    pub fn remove_edge(&mut self, a: &str, b: &str) -> bool {
        let (Some(&ia), Some(&ib)) = (self.index.get(a), self.index.get(b)) else {
            return false;
        };
        match self.graph.find_edge(ia, ib) {
            Some(ix) => self.graph.remove_edge(ix).is_some(),
            None => false,
        }
    }

    /// Set one attribute on an existing node
    pub fn set_node_attribute(
        &mut self,
        id: &str,
        key: &str,
        value: Value,
    ) -> Result<(), GraphError> {
        let ix = self.node_index(id)?;
        let node = self
            .graph
            .node_weight_mut(ix)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;
        node.attributes.insert(key.to_string(), value);
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// All node identifiers
    pub fn node_ids(&self) -> Vec<String> {
        self.graph
            .node_indices()
            .filter_map(|ix| self.graph.node_weight(ix))
            .map(|node| node.id.clone())
            .collect()
    }

    pub fn node_attributes(&self, id: &str) -> Option<&Attributes> {
        let ix = *self.index.get(id)?;
        self.graph.node_weight(ix).map(|node| &node.attributes)
    }

    /// Identifiers of the nodes adjacent to `id`, oldest edge first
    pub fn neighbors(&self, id: &str) -> Result<Vec<String>, GraphError> {
        Ok(self
            .incident(id)?
            .into_iter()
            .map(|edge| edge.target)
            .collect())
    }

    /// All edges, each reported with the endpoints in the order they were added
    pub fn edges(&self) -> Vec<EdgeRecord> {
        self.graph
            .edge_indices()
            .filter_map(|ix| {
                let (a, b) = self.graph.edge_endpoints(ix)?;
                let attributes = self.graph.edge_weight(ix)?.clone();
                Some(EdgeRecord::new(self.id_of(a)?, self.id_of(b)?, attributes))
            })
            .collect()
    }

    /// Attributes, neighbours and incident edges of one node
    pub fn query(&self, id: &str) -> Option<NodeQuery> {
        let attributes = self.node_attributes(id)?.clone();
        let edges = self.incident(id).ok()?;
        let neighbors = edges.iter().map(|edge| edge.target.clone()).collect();

        Some(NodeQuery {
            node: id.to_string(),
            attributes,
            neighbors,
            edges,
        })
    }

    /// Export as a node-link document
    pub fn to_node_link(&self) -> NodeLinkData {
        let nodes = self
            .graph
            .node_indices()
            .filter_map(|ix| self.graph.node_weight(ix))
            .map(|node| NodeRecord {
                id: node.id.clone(),
                attributes: node.attributes.clone(),
            })
            .collect();

        NodeLinkData {
            nodes,
            links: self.edges(),
            ..NodeLinkData::default()
        }
    }

    /// Build a graph from a node-link document. Link endpoints missing from
    /// the node list are created without attributes.
    pub fn from_node_link(data: NodeLinkData) -> Self {
        let mut graph = Self::new();
        for node in data.nodes {
            graph.add_node(&node.id, node.attributes);
        }
        for link in data.links {
            graph.add_edge(&link.source, &link.target, link.attributes);
        }
        graph
    }

    pub(crate) fn petgraph(&self) -> &StableUnGraph<Node, Attributes> {
        &self.graph
    }

    pub(crate) fn node_index(&self, id: &str) -> Result<NodeIndex, GraphError> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))
    }

    pub(crate) fn id_of(&self, ix: NodeIndex) -> Option<String> {
        self.graph.node_weight(ix).map(|node| node.id.clone())
    }

    /// Edges touching `id`, oriented away from it, oldest first
    fn incident(&self, id: &str) -> Result<Vec<EdgeRecord>, GraphError> {
        let ix = self.node_index(id)?;

        let mut edges: Vec<_> = self
            .graph
            .edges(ix)
            .map(|edge| {
                let other = if edge.source() == ix {
                    edge.target()
                } else {
                    edge.source()
                };
                (edge.id(), other, edge.weight().clone())
            })
            .collect();
        edges.sort_by_key(|(edge_ix, _, _)| *edge_ix);

        Ok(edges
            .into_iter()
            .filter_map(|(_, other, attributes)| {
                Some(EdgeRecord::new(id, self.id_of(other)?, attributes))
            })
            .collect())
    }
}

/// Result of querying a single node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeQuery {
    pub node: String,
    pub attributes: Attributes,
    pub neighbors: Vec<String>,
    pub edges: Vec<EdgeRecord>,
}

impl fmt::Display for NodeQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Node: {}", self.node)?;
        writeln!(f, "Attributes: {}", Value::Object(self.attributes.clone()))?;
        writeln!(
            f,
            "Neighbors: {}",
            Value::from(self.neighbors.clone())
        )?;
        writeln!(f, "Edges:")?;
        for edge in &self.edges {
            writeln!(
                f,
                "  - {} -> {}: {}",
                edge.source,
                edge.target,
                Value::Object(edge.attributes.clone())
            )?;
        }
        Ok(())
    }
}

/// Text reply for a node query, including the not-found case
pub fn describe_node(graph: &KnowledgeGraph, id: &str) -> String {
    match graph.query(id) {
        Some(query) => query.to_string(),
        None => GraphError::NodeNotFound(id.to_string()).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::model::relation_attributes;
    use serde_json::json;

    fn attrs(value: Value) -> Attributes {
        value.as_object().cloned().unwrap_or_default()
    }

    fn sample() -> KnowledgeGraph {
        let mut graph = KnowledgeGraph::new();
        graph.add_node("Kant", attrs(json!({"school": "Idealism"})));
        graph.add_node("Hume", attrs(json!({"school": "Empiricism"})));
        graph.add_edge("Kant", "Hume", relation_attributes("influenced by"));
        graph.add_edge("Hegel", "Kant", relation_attributes("influenced by"));
        graph
    }

    #[test]
    fn test_add_edge_creates_missing_nodes() {
        let graph = sample();
        assert!(graph.contains("Hegel"));
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert!(graph.node_attributes("Hegel").unwrap().is_empty());
    }

    #[test]
    fn test_add_node_merges_attributes() {
        let mut graph = sample();
        graph.add_node("Kant", attrs(json!({"label": "Immanuel Kant"})));

        let attributes = graph.node_attributes("Kant").unwrap();
        assert_eq!(attributes["school"], "Idealism");
        assert_eq!(attributes["label"], "Immanuel Kant");
        assert_eq!(graph.node_count(), 3);
    }

    #[test]
    fn test_lifetime_is_stored() {
        let mut graph = KnowledgeGraph::new();
        graph.add_node_with_lifetime("Kant", Attributes::new(), Some("1724-1804"));
        graph.add_node_with_lifetime("Hume", Attributes::new(), Some("  "));

        assert_eq!(graph.node_attributes("Kant").unwrap()["lifetime"], "1724-1804");
        assert!(graph.node_attributes("Hume").unwrap().get("lifetime").is_none());
    }

    #[test]
    fn test_re_adding_edge_updates_it() {
        let mut graph = sample();
        graph.add_edge("Hume", "Kant", relation_attributes("debated"));

        assert_eq!(graph.edge_count(), 2);
        let edges = graph.edges();
        assert_eq!(edges[0].relation(), Some("debated"));
    }

    #[test]
    fn test_neighbors_in_insertion_order() {
        let graph = sample();
        assert_eq!(graph.neighbors("Kant").unwrap(), vec!["Hume", "Hegel"]);
        assert_eq!(graph.neighbors("Hegel").unwrap(), vec!["Kant"]);
        assert!(matches!(
            graph.neighbors("Plato"),
            Err(GraphError::NodeNotFound(_))
        ));
    }

    #[test]
    fn test_remove_node_drops_edges() {
        let mut graph = sample();
        assert!(graph.remove_node("Kant"));
        assert!(!graph.remove_node("Kant"));
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 0);

        graph.add_node("Kant", Attributes::new());
        assert!(graph.neighbors("Kant").unwrap().is_empty());
    }

    #[test]
    fn test_remove_edge() {
        let mut graph = sample();
        assert!(graph.remove_edge("Hume", "Kant"));
        assert!(!graph.remove_edge("Hume", "Kant"));
        assert!(!graph.remove_edge("Hume", "Plato"));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_set_node_attribute() {
        let mut graph = sample();
        graph
            .set_node_attribute("Kant", "enriched", json!("Critique of Pure Reason"))
            .unwrap();
        assert_eq!(
            graph.node_attributes("Kant").unwrap()["enriched"],
            "Critique of Pure Reason"
        );
        assert!(graph.set_node_attribute("Plato", "x", json!(1)).is_err());
    }

    #[test]
    fn test_query_text() {
        let graph = sample();
        let text = graph.query("Kant").unwrap().to_string();

        assert_eq!(
            text,
            "Node: Kant\n\
             Attributes: {\"school\":\"Idealism\"}\n\
             Neighbors: [\"Hume\",\"Hegel\"]\n\
             Edges:\n  \
             - Kant -> Hume: {\"relation\":\"influenced by\"}\n  \
             - Kant -> Hegel: {\"relation\":\"influenced by\"}\n"
        );
    }

    #[test]
    fn test_describe_missing_node() {
        let graph = sample();
        assert_eq!(
            describe_node(&graph, "Plato"),
            "Node 'Plato' not found in the graph."
        );
    }

    #[test]
    fn test_node_link_round_trip_preserves_structure() {
        let graph = sample();
        let data = graph.to_node_link();
        let restored = KnowledgeGraph::from_node_link(data.clone());

        assert_eq!(restored.node_count(), 3);
        assert_eq!(restored.edge_count(), 2);
        assert_eq!(restored.to_node_link(), data);
    }

    #[test]
    fn test_from_node_link_creates_dangling_endpoints() {
        let data = NodeLinkData::from_json(
            r#"{"nodes": [{"id": "A"}], "links": [{"source": "A", "target": "B", "relation": "r"}]}"#,
        )
        .unwrap();
        let graph = KnowledgeGraph::from_node_link(data);
        assert!(graph.contains("B"));
    }
}

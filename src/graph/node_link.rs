//! Node-link JSON documents
//!
//! The interchange format used for the graph file, the database blob and the
//! `/load_graph` upload:
//!
//! ```json
//! {"directed": false, "multigraph": false, "graph": {},
//!  "nodes": [{"id": "Kant", "school": "Idealism"}],
//!  "links": [{"source": "Kant", "target": "Hume", "relation": "influenced by"}]}
//! ```
//!
//! Documents that name the edge list `edges` instead of `links` are accepted.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::model::{Attributes, EdgeRecord, NodeRecord};
use super::GraphError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeLinkData {
    #[serde(default)]
    pub directed: bool,

    #[serde(default)]
    pub multigraph: bool,

    #[serde(default)]
    pub graph: Attributes,

    pub nodes: Vec<NodeRecord>,

    pub links: Vec<EdgeRecord>,
}

impl Default for NodeLinkData {
    fn default() -> Self {
        Self {
            directed: false,
            multigraph: false,
            graph: Attributes::new(),
            nodes: Vec::new(),
            links: Vec::new(),
        }
    }
}

impl NodeLinkData {
    /// Parse a document, accepting `edges` as an alias of `links`
    pub fn from_json(text: &str) -> Result<Self, GraphError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| GraphError::InvalidJson(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_value(mut value: Value) -> Result<Self, GraphError> {
        let object = value
            .as_object_mut()
            .ok_or_else(|| GraphError::InvalidJson("expected a JSON object".to_string()))?;

        if let Some(edges) = object.remove("edges") {
            object.entry("links").or_insert(edges);
        }

        if !object.contains_key("nodes") || !object.contains_key("links") {
            return Err(GraphError::MissingKey(
                "JSON data must contain both 'nodes' and 'links' (or 'edges') keys".to_string(),
            ));
        }

        serde_json::from_value(value).map_err(|e| GraphError::InvalidJson(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> String {
        // Serializing string-keyed maps and strings cannot fail
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

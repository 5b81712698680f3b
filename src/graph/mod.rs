//! Knowledge graph
//!
//! An undirected graph of philosophers (nodes with free-form attributes)
//! and their relations (edges carrying a `relation` label). Graph algorithms
//! are delegated to `petgraph`.

pub mod analytics;
pub mod mermaid;
pub mod model;
pub mod node_link;
pub mod seed;
pub mod store;

pub use model::{Attributes, EdgeRecord, NodeRecord};
pub use node_link::NodeLinkData;
pub use store::{KnowledgeGraph, NodeQuery};

use thiserror::Error;

/// Errors raised by graph operations and graph document parsing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Node '{0}' not found in the graph.")]
    NodeNotFound(String),

    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Missing key in JSON: {0}")]
    MissingKey(String),
}

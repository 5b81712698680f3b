//! Shared, persisted knowledge graph
//!
//! The web layer holds one [`GraphService`]. Reads take a shared lock;
//! every mutation takes the write lock, applies the change to a copy and
//! saves it before releasing the lock, so saves happen in mutation order.
//! The live graph only changes once the save succeeded.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::db::{GraphPersistence, StoreError};
use crate::graph::{
    analytics, mermaid, model::relation_attributes, seed, store::describe_node, Attributes,
    GraphError, KnowledgeGraph, NodeLinkData,
};

/// Errors raised by graph service operations
#[derive(Error, Debug)]
pub enum GraphServiceError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Attributes and neighbours of one node, as used for enrichment
#[derive(Debug, Clone)]
pub struct NodeContext {
    pub attributes: Attributes,
    pub connections: Vec<String>,
}

pub struct GraphService {
    graph: RwLock<KnowledgeGraph>,
    store: Arc<dyn GraphPersistence>,
}

impl GraphService {
    pub fn new(graph: KnowledgeGraph, store: Arc<dyn GraphPersistence>) -> Self {
        Self {
            graph: RwLock::new(graph),
            store,
        }
    }

    /// Load the stored graph, or start empty when nothing was saved yet
    pub async fn open(store: Arc<dyn GraphPersistence>) -> Result<Self, StoreError> {
        let graph = match store.load().await? {
            Some(data) => KnowledgeGraph::from_node_link(data),
            None => KnowledgeGraph::new(),
        };

        tracing::info!(
            store = %store.describe(),
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Knowledge graph opened"
        );

        Ok(Self::new(graph, store))
    }

    /// Run `f` against a read-locked graph
    pub async fn read<R>(&self, f: impl FnOnce(&KnowledgeGraph) -> R) -> R {
        let graph = self.graph.read().await;
        f(&graph)
    }

    /// Apply `f` to a copy under the write lock; the copy replaces the live
    /// graph once it has been persisted
    async fn mutate<R>(
        &self,
        f: impl FnOnce(&mut KnowledgeGraph) -> Result<R, GraphError>,
    ) -> Result<R, GraphServiceError> {
        let mut graph = self.graph.write().await;
        let mut draft = graph.clone();
        let result = f(&mut draft)?;
        self.store.save(&draft.to_node_link()).await?;
        *graph = draft;
        Ok(result)
    }

    pub async fn add_node(
        &self,
        id: &str,
        attributes: Attributes,
        lifetime: Option<&str>,
    ) -> Result<(), GraphServiceError> {
        self.mutate(|graph| {
            graph.add_node_with_lifetime(id, attributes, lifetime);
            Ok(())
        })
        .await?;

        tracing::info!(node = %id, "Node added");
        Ok(())
    }

    /// Connect two nodes; the relation defaults to "related"
    pub async fn add_edge(
        &self,
        a: &str,
        b: &str,
        relation: Option<&str>,
    ) -> Result<(), GraphServiceError> {
        let relation = relation.filter(|r| !r.is_empty()).unwrap_or("related");
        self.mutate(|graph| {
            graph.add_edge(a, b, relation_attributes(relation));
            Ok(())
        })
        .await?;

        tracing::info!(source = %a, target = %b, relation = %relation, "Edge added");
        Ok(())
    }

    pub async fn remove_node(&self, id: &str) -> Result<(), GraphServiceError> {
        self.mutate(|graph| {
            if graph.remove_node(id) {
                Ok(())
            } else {
                Err(GraphError::NodeNotFound(id.to_string()))
            }
        })
        .await
    }

    pub async fn remove_edge(&self, a: &str, b: &str) -> Result<bool, GraphServiceError> {
        self.mutate(|graph| Ok(graph.remove_edge(a, b))).await
    }

    pub async fn set_node_attribute(
        &self,
        id: &str,
        key: &str,
        value: Value,
    ) -> Result<(), GraphServiceError> {
        self.mutate(|graph| graph.set_node_attribute(id, key, value))
            .await
    }

    /// Replace the whole graph with a node-link document; returns the new
    /// node and edge counts
    pub async fn replace(&self, data: NodeLinkData) -> Result<(usize, usize), GraphServiceError> {
        let counts = self
            .mutate(|graph| {
                *graph = KnowledgeGraph::from_node_link(data);
                Ok((graph.node_count(), graph.edge_count()))
            })
            .await?;

        tracing::info!(nodes = counts.0, edges = counts.1, "Graph replaced");
        Ok(counts)
    }

    /// Apply the contemporary philosophers update
    pub async fn apply_seed(&self) -> Result<(usize, usize), GraphServiceError> {
        self.mutate(|graph| {
            seed::contemporary_philosophers(graph);
            Ok((graph.node_count(), graph.edge_count()))
        })
        .await
    }

    pub async fn node_ids(&self) -> Vec<String> {
        self.read(KnowledgeGraph::node_ids).await
    }

    /// Text description of one node
    pub async fn describe(&self, id: &str) -> String {
        self.read(|graph| describe_node(graph, id)).await
    }

    pub async fn context(&self, id: &str) -> Result<NodeContext, GraphError> {
        self.read(|graph| {
            let attributes = graph
                .node_attributes(id)
                .cloned()
                .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;
            let connections = graph.neighbors(id)?;
            Ok(NodeContext {
                attributes,
                connections,
            })
        })
        .await
    }

    pub async fn node_link(&self) -> NodeLinkData {
        self.read(KnowledgeGraph::to_node_link).await
    }

    pub async fn mermaid(&self) -> String {
        self.read(mermaid::export_mermaid).await
    }

    pub async fn page_rank(&self) -> BTreeMap<String, f64> {
        self.read(analytics::page_rank).await
    }

    pub async fn communities(&self) -> BTreeMap<String, usize> {
        self.read(analytics::detect_communities).await
    }

    pub async fn shortest_path(
        &self,
        source: &str,
        target: &str,
    ) -> Result<Option<Vec<String>>, GraphError> {
        self.read(|graph| analytics::shortest_path(graph, source, target))
            .await
    }

    pub async fn counts(&self) -> (usize, usize) {
        self.read(|graph| (graph.node_count(), graph.edge_count()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::JsonFileStore;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// In-memory store that counts saves
    #[derive(Default)]
    struct RecordingStore {
        saved: Mutex<Vec<NodeLinkData>>,
    }

    #[async_trait]
    impl GraphPersistence for RecordingStore {
        async fn load(&self) -> Result<Option<NodeLinkData>, StoreError> {
            Ok(self.saved.lock().unwrap().last().cloned())
        }

        async fn save(&self, data: &NodeLinkData) -> Result<(), StoreError> {
            self.saved.lock().unwrap().push(data.clone());
            Ok(())
        }

        fn describe(&self) -> String {
            "memory".to_string()
        }
    }

    fn service() -> (GraphService, Arc<RecordingStore>) {
        let store = Arc::new(RecordingStore::default());
        (GraphService::new(KnowledgeGraph::new(), store.clone()), store)
    }

    #[tokio::test]
    async fn test_every_mutation_persists() {
        let (service, store) = service();

        service.add_node("Kant", Attributes::new(), Some("1724-1804")).await.unwrap();
        service.add_edge("Kant", "Hume", Some("influenced by")).await.unwrap();
        service
            .set_node_attribute("Kant", "school", Value::from("German Idealism"))
            .await
            .unwrap();
        assert!(service.remove_edge("Kant", "Hume").await.unwrap());

        let saved = store.saved.lock().unwrap();
        assert_eq!(saved.len(), 4);
        assert_eq!(saved[1].links.len(), 1);
        assert!(saved[3].links.is_empty());
    }

    #[tokio::test]
    async fn test_failed_mutation_does_not_persist() {
        let (service, store) = service();

        let err = service.remove_node("Nobody").await.unwrap_err();
        assert!(matches!(err, GraphServiceError::Graph(GraphError::NodeNotFound(_))));
        assert!(store.saved.lock().unwrap().is_empty());
    }

    /// Store whose saves always fail
    struct FullDiskStore;

    #[async_trait]
    impl GraphPersistence for FullDiskStore {
        async fn load(&self) -> Result<Option<NodeLinkData>, StoreError> {
            Ok(None)
        }

        async fn save(&self, _data: &NodeLinkData) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )))
        }

        fn describe(&self) -> String {
            "full disk".to_string()
        }
    }

    #[tokio::test]
    async fn test_failed_save_leaves_graph_unchanged() {
        let mut graph = KnowledgeGraph::new();
        graph.add_edge("Hume", "Smith", relation_attributes("friends"));
        let service = GraphService::new(graph, Arc::new(FullDiskStore));

        let err = service.add_node("Kant", Attributes::new(), None).await.unwrap_err();
        assert!(matches!(err, GraphServiceError::Store(_)));
        assert_eq!(service.node_ids().await, vec!["Hume", "Smith"]);

        assert!(service.remove_node("Hume").await.is_err());
        assert!(service.remove_edge("Hume", "Smith").await.is_err());
        assert_eq!(service.counts().await, (2, 1));

        let data = NodeLinkData::from_json(r#"{"nodes": [{"id": "Kant"}], "links": []}"#).unwrap();
        assert!(service.replace(data).await.is_err());
        assert_eq!(service.node_ids().await, vec!["Hume", "Smith"]);
    }

    #[tokio::test]
    async fn test_default_relation() {
        let (service, _) = service();
        service.add_edge("Plato", "Aristotle", None).await.unwrap();

        let data = service.node_link().await;
        assert_eq!(data.links[0].relation(), Some("related"));
    }

    #[tokio::test]
    async fn test_context_for_enrichment() {
        let (service, _) = service();
        service.add_edge("Descartes", "Spinoza", Some("influenced")).await.unwrap();
        service.add_edge("Descartes", "Leibniz", Some("influenced")).await.unwrap();

        let context = service.context("Descartes").await.unwrap();
        assert_eq!(context.connections, vec!["Spinoza", "Leibniz"]);
        assert!(service.context("Hobbes").await.is_err());
    }

    #[tokio::test]
    async fn test_replace_and_reopen_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileStore::new(dir.path().join("graph.json")));
        let service = GraphService::open(store.clone()).await.unwrap();
        assert_eq!(service.counts().await, (0, 0));

        let data = NodeLinkData::from_json(
            r#"{"nodes": [{"id": "Kant"}, {"id": "Hegel"}],
                "links": [{"source": "Kant", "target": "Hegel", "relation": "influenced"}]}"#,
        )
        .unwrap();
        assert_eq!(service.replace(data).await.unwrap(), (2, 1));

        let reopened = GraphService::open(store).await.unwrap();
        assert_eq!(reopened.counts().await, (2, 1));
        assert!(reopened.describe("Kant").await.contains("Neighbors: [\"Hegel\"]"));
    }

    #[tokio::test]
    async fn test_analytics_through_service() {
        let (service, _) = service();
        service.add_edge("A", "B", None).await.unwrap();
        service.add_edge("B", "C", None).await.unwrap();
        service.add_node("D", Attributes::new(), None).await.unwrap();

        assert_eq!(
            service.shortest_path("A", "C").await.unwrap(),
            Some(vec!["A".to_string(), "B".to_string(), "C".to_string()])
        );
        assert_eq!(service.shortest_path("A", "D").await.unwrap(), None);

        let communities = service.communities().await;
        assert_eq!(communities["A"], communities["C"]);
        assert_ne!(communities["A"], communities["D"]);

        assert_eq!(service.page_rank().await.len(), 4);
        assert!(service.mermaid().await.starts_with("graph TD\n"));
    }
}

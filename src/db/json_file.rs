//! Graph stored as a pretty-printed JSON file

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{GraphPersistence, StoreError};
use crate::graph::NodeLinkData;

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl GraphPersistence for JsonFileStore {
    async fn load(&self) -> Result<Option<NodeLinkData>, StoreError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(
                    path = %self.path.display(),
                    "Graph file not found, starting with an empty graph"
                );
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let data = NodeLinkData::from_json(&text)?;
        tracing::info!(
            path = %self.path.display(),
            nodes = data.nodes.len(),
            links = data.links.len(),
            "Graph loaded from file"
        );
        Ok(Some(data))
    }

    async fn save(&self, data: &NodeLinkData) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write then rename so a crash never leaves a truncated file
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, data.to_json_pretty()).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        tracing::debug!(path = %self.path.display(), "Graph saved to file");
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{model::relation_attributes, KnowledgeGraph};

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("absent.json"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested").join("graph.json"));

        let mut graph = KnowledgeGraph::new();
        graph.add_edge("Marx", "Hegel", relation_attributes("influenced by"));
        store.save(&graph.to_node_link()).await.unwrap();

        let loaded = KnowledgeGraph::from_node_link(store.load().await.unwrap().unwrap());
        assert_eq!(loaded.node_count(), 2);
        assert_eq!(loaded.edges()[0].relation(), Some("influenced by"));
    }

    #[tokio::test]
    async fn test_file_with_edges_key_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        tokio::fs::write(
            &path,
            r#"{"nodes": [{"id": "A"}, {"id": "B"}], "edges": [{"source": "A", "target": "B"}]}"#,
        )
        .await
        .unwrap();

        let data = JsonFileStore::new(path).load().await.unwrap().unwrap();
        assert_eq!(data.links.len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        tokio::fs::write(&path, "{").await.unwrap();

        let err = JsonFileStore::new(path).load().await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidDocument(_)));
    }
}

//! Graph persistence
//!
//! The graph is saved as a node-link JSON document, either to a file, to a
//! single row of a SQLite table, or to both. The SQLite database also keeps
//! a log of model responses.

pub mod json_file;
pub mod models;
pub mod sqlite;

pub use json_file::JsonFileStore;
pub use models::{ResponseRecord, ARCHITECTURE_NAME};
pub use sqlite::SqliteStore;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::Settings;
use crate::graph::{GraphError, NodeLinkData};

/// Errors raised by graph stores
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Stored graph is invalid: {0}")]
    InvalidDocument(#[from] GraphError),
}

/// Somewhere a graph document can be loaded from and saved to
#[async_trait]
pub trait GraphPersistence: Send + Sync {
    /// Load the stored document; `None` when nothing has been saved yet
    async fn load(&self) -> Result<Option<NodeLinkData>, StoreError>;

    async fn save(&self, data: &NodeLinkData) -> Result<(), StoreError>;

    /// Short description for logs
    fn describe(&self) -> String;
}

/// Writes to both a JSON file and the database; reads the database first
pub struct MirroredStore {
    file: JsonFileStore,
    database: SqliteStore,
}

impl MirroredStore {
    pub fn new(file: JsonFileStore, database: SqliteStore) -> Self {
        Self { file, database }
    }
}

#[async_trait]
impl GraphPersistence for MirroredStore {
    async fn load(&self) -> Result<Option<NodeLinkData>, StoreError> {
        match self.database.load().await? {
            Some(data) => Ok(Some(data)),
            None => self.file.load().await,
        }
    }

    async fn save(&self, data: &NodeLinkData) -> Result<(), StoreError> {
        self.file.save(data).await?;
        self.database.save(data).await
    }

    fn describe(&self) -> String {
        format!("{} + {}", self.file.describe(), self.database.describe())
    }
}

/// Stores selected by the settings
pub struct Persistence {
    /// Where the graph document lives
    pub graph: Arc<dyn GraphPersistence>,
    /// Model response log; only available when the database is enabled
    pub responses: Option<SqliteStore>,
}

/// Open the graph file and, when `persist_to_database` is set, the SQLite
/// database mirrored alongside it
pub async fn open(settings: &Settings) -> Result<Persistence, StoreError> {
    let file = JsonFileStore::new(&settings.graph_file);

    if !settings.persist_to_database {
        return Ok(Persistence {
            graph: Arc::new(file),
            responses: None,
        });
    }

    let database = SqliteStore::connect(&settings.database_url).await?;
    Ok(Persistence {
        graph: Arc::new(MirroredStore::new(file, database.clone())),
        responses: Some(database),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{model::relation_attributes, KnowledgeGraph};

    #[tokio::test]
    async fn test_mirrored_store_writes_both() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonFileStore::new(dir.path().join("graph.json"));
        let database = SqliteStore::in_memory().await.unwrap();
        let store = MirroredStore::new(file.clone(), database.clone());

        let mut graph = KnowledgeGraph::new();
        graph.add_edge("Kant", "Hume", relation_attributes("influenced by"));
        store.save(&graph.to_node_link()).await.unwrap();

        assert!(file.load().await.unwrap().is_some());
        assert!(database.load().await.unwrap().is_some());
        assert_eq!(store.load().await.unwrap().unwrap().links.len(), 1);
    }

    #[tokio::test]
    async fn test_mirrored_store_falls_back_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonFileStore::new(dir.path().join("graph.json"));
        let mut graph = KnowledgeGraph::new();
        graph.add_node("Kant", Default::default());
        file.save(&graph.to_node_link()).await.unwrap();

        let store = MirroredStore::new(file, SqliteStore::in_memory().await.unwrap());
        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.nodes[0].id, "Kant");
    }

    #[tokio::test]
    async fn test_open_file_only() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            graph_file: dir.path().join("kg.json"),
            ..Settings::default()
        };

        let persistence = open(&settings).await.unwrap();
        assert!(persistence.responses.is_none());
        assert!(persistence.graph.describe().starts_with("file:"));
    }

    #[tokio::test]
    async fn test_open_with_database() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            graph_file: dir.path().join("kg.json"),
            database_url: format!("sqlite://{}", dir.path().join("kg.db").display()),
            persist_to_database: true,
            ..Settings::default()
        };

        let persistence = open(&settings).await.unwrap();
        assert!(persistence.responses.is_some());
        assert!(persistence.graph.describe().contains("sqlite://"));
    }
}

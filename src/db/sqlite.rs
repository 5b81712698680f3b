//! SQLite storage
//!
//! The graph lives as a single JSON blob in row `id = 1` of `graph_data`.
//! Model responses are appended to `versioned_responses`.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use super::models::ResponseRecord;
use super::{GraphPersistence, StoreError};
use crate::graph::NodeLinkData;

const CREATE_GRAPH_DATA: &str = "
    CREATE TABLE IF NOT EXISTS graph_data (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        data TEXT NOT NULL
    )";

const CREATE_VERSIONED_RESPONSES: &str = "
    CREATE TABLE IF NOT EXISTS versioned_responses (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        architecture_name TEXT NOT NULL,
        provider TEXT NOT NULL,
        model TEXT NOT NULL,
        user_text TEXT NOT NULL,
        front_content TEXT NOT NULL,
        back_content TEXT NOT NULL,
        system_prompt TEXT NOT NULL,
        created_at TEXT NOT NULL
    )";

/// SQLite-backed graph store and response log
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    url: String,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `url` and ensure the schema
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self {
            pool,
            url: url.to_string(),
        };
        store.migrate().await?;

        tracing::info!(url = %url, "SQLite store ready");
        Ok(store)
    }

    /// Private in-memory database; a single connection so every query sees it
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self {
            pool,
            url: "sqlite::memory:".to_string(),
        };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_GRAPH_DATA).execute(&self.pool).await?;
        sqlx::query(CREATE_VERSIONED_RESPONSES)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Append a model response; returns its row id
    pub async fn save_response(&self, record: &ResponseRecord) -> Result<i64, StoreError> {
        let result = sqlx::query(
            "INSERT INTO versioned_responses
             (architecture_name, provider, model, user_text, front_content, back_content, system_prompt, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.architecture_name)
        .bind(&record.provider)
        .bind(&record.model)
        .bind(&record.user_text)
        .bind(&record.front_content)
        .bind(&record.back_content)
        .bind(&record.system_prompt)
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        tracing::debug!(
            provider = %record.provider,
            model = %record.model,
            "Recorded model response"
        );

        Ok(result.last_insert_rowid())
    }

    /// Most recent responses, newest first
    pub async fn recent_responses(&self, limit: i64) -> Result<Vec<ResponseRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT architecture_name, provider, model, user_text, front_content, back_content,
                    system_prompt, created_at
             FROM versioned_responses ORDER BY id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<ResponseRecord, StoreError> {
                let created_at: String = row.try_get("created_at")?;
                Ok(ResponseRecord {
                    architecture_name: row.try_get("architecture_name")?,
                    provider: row.try_get("provider")?,
                    model: row.try_get("model")?,
                    user_text: row.try_get("user_text")?,
                    front_content: row.try_get("front_content")?,
                    back_content: row.try_get("back_content")?,
                    system_prompt: row.try_get("system_prompt")?,
                    created_at: DateTime::parse_from_rfc3339(&created_at)
                        .map(|t| t.with_timezone(&Utc))
                        .unwrap_or_else(|_| Utc::now()),
                })
            })
            .collect()
    }
}

#[async_trait]
impl GraphPersistence for SqliteStore {
    async fn load(&self) -> Result<Option<NodeLinkData>, StoreError> {
        let row = sqlx::query("SELECT data FROM graph_data WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let data: String = row.try_get("data")?;
                Ok(Some(NodeLinkData::from_json(&data)?))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, data: &NodeLinkData) -> Result<(), StoreError> {
        let json = serde_json::to_string(data).map_err(|e| {
            StoreError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;

        sqlx::query("INSERT OR REPLACE INTO graph_data (id, data) VALUES (1, ?)")
            .bind(json)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

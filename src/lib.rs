//! Neurograph library
//!
//! A knowledge graph of philosophers served over HTTP, with node enrichment
//! and knowledge-base search backed by remote model providers. Every remote
//! call runs through the bounded-retry executor in [`retry`].

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod graph;
pub mod logging;
pub mod middleware;
pub mod retry;
pub mod server;
pub mod services;

pub use config::Settings;
pub use error::ApiError;
pub use graph::KnowledgeGraph;
pub use server::App;

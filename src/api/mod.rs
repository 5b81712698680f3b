//! API endpoint handlers module

pub mod enrich;
pub mod extract;
pub mod graph;
pub mod health;
pub mod knowledge_base;
pub mod models;

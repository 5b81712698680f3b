//! Knowledge graph endpoints
//!
//! CRUD on nodes and edges, graph documents, and analytics. Every mutation
//! is persisted before the response is sent.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::extract::{ApiJson, ApiQuery};
use crate::error::ApiError;
use crate::graph::{analytics::describe_path, Attributes, NodeLinkData};
use crate::server::state::AppState;

// ============================================================================
// Request / response types
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct AddNodeRequest {
    #[validate(length(min = 1, message = "node must not be empty"))]
    pub node: String,

    #[serde(default)]
    pub attributes: Attributes,

    pub lifetime: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddEdgeRequest {
    #[validate(length(min = 1, message = "node1 must not be empty"))]
    pub node1: String,

    #[validate(length(min = 1, message = "node2 must not be empty"))]
    pub node2: String,

    pub relation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EdgeParams {
    pub node1: String,
    pub node2: String,
}

#[derive(Debug, Deserialize)]
pub struct NodeParams {
    pub node: String,
}

#[derive(Debug, Deserialize)]
pub struct PathParams {
    pub source: String,
    pub target: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoadGraphRequest {
    #[validate(length(min = 1, message = "file_content must not be empty"))]
    pub file_content: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub result: String,
}

#[derive(Debug, Serialize)]
pub struct MermaidResponse {
    pub mermaid_graph: String,
}

#[derive(Debug, Serialize)]
pub struct ShortestPathResponse {
    pub path: Option<Vec<String>>,
    pub result: String,
}

#[derive(Debug, Serialize)]
pub struct LoadGraphResponse {
    pub message: String,
    pub nodes: usize,
    pub edges: usize,
}

fn message(text: String) -> Json<MessageResponse> {
    Json(MessageResponse { message: text })
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /add_node
pub async fn add_node(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<AddNodeRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    request.validate()?;

    state
        .graph
        .add_node(&request.node, request.attributes, request.lifetime.as_deref())
        .await?;

    Ok(message(format!("Node '{}' added successfully", request.node)))
}

/// POST /add_edge
pub async fn add_edge(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<AddEdgeRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    request.validate()?;

    state
        .graph
        .add_edge(&request.node1, &request.node2, request.relation.as_deref())
        .await?;

    Ok(message(format!(
        "Edge from '{}' to '{}' added successfully",
        request.node1, request.node2
    )))
}

/// DELETE /nodes/:node
pub async fn delete_node(
    State(state): State<AppState>,
    Path(node): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.graph.remove_node(&node).await?;
    Ok(message(format!("Node '{}' removed successfully", node)))
}

/// DELETE /edges?node1=..&node2=..
pub async fn delete_edge(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<EdgeParams>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !state.graph.remove_edge(&params.node1, &params.node2).await? {
        return Err(ApiError::NotFound(format!(
            "No edge between '{}' and '{}'",
            params.node1, params.node2
        )));
    }
    Ok(message(format!(
        "Edge from '{}' to '{}' removed successfully",
        params.node1, params.node2
    )))
}

/// GET /query_node?node=..
///
/// An unknown node is not an error: the result text says so.
pub async fn query_node(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<NodeParams>,
) -> Json<QueryResponse> {
    Json(QueryResponse {
        result: state.graph.describe(&params.node).await,
    })
}

/// GET /get_nodes
pub async fn get_nodes(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.graph.node_ids().await)
}

/// GET /graph_data and GET /export_json
pub async fn graph_data(State(state): State<AppState>) -> Json<NodeLinkData> {
    Json(state.graph.node_link().await)
}

/// GET /visualize
pub async fn visualize(State(state): State<AppState>) -> Json<MermaidResponse> {
    Json(MermaidResponse {
        mermaid_graph: state.graph.mermaid().await,
    })
}

/// GET /page_rank
pub async fn page_rank(State(state): State<AppState>) -> Json<BTreeMap<String, f64>> {
    Json(state.graph.page_rank().await)
}

/// GET /detect_communities
pub async fn detect_communities(State(state): State<AppState>) -> Json<BTreeMap<String, usize>> {
    Json(state.graph.communities().await)
}

/// GET /shortest_path?source=..&target=..
pub async fn shortest_path(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<PathParams>,
) -> Result<Json<ShortestPathResponse>, ApiError> {
    let path = state
        .graph
        .shortest_path(&params.source, &params.target)
        .await?;
    let result = describe_path(&params.source, &params.target, path.as_deref());

    Ok(Json(ShortestPathResponse { path, result }))
}

/// POST /load_graph
///
/// Replaces the whole graph with the uploaded node-link document.
pub async fn load_graph(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoadGraphRequest>,
) -> Result<Json<LoadGraphResponse>, ApiError> {
    request.validate()?;

    let data = NodeLinkData::from_json(&request.file_content)?;
    tracing::info!(
        nodes = data.nodes.len(),
        links = data.links.len(),
        "Loading uploaded graph"
    );

    let (nodes, edges) = state.graph.replace(data).await?;

    Ok(Json(LoadGraphResponse {
        message: "Graph loaded successfully".to_string(),
        nodes,
        edges,
    }))
}

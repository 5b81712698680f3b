//! Application routing

use axum::{
    http::HeaderName,
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::api::{enrich, graph, health, knowledge_base, models};
use crate::middleware::logging::{log_request, REQUEST_ID_HEADER, TRACE_ID_HEADER};
use crate::server::state::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let health_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness))
        .route("/liveness", get(health::liveness));

    let graph_routes = Router::new()
        .route("/add_node", post(graph::add_node))
        .route("/add_edge", post(graph::add_edge))
        .route("/nodes/:node", delete(graph::delete_node))
        .route("/edges", delete(graph::delete_edge))
        .route("/query_node", get(graph::query_node))
        .route("/get_nodes", get(graph::get_nodes))
        .route("/graph_data", get(graph::graph_data))
        .route("/export_json", get(graph::graph_data))
        .route("/visualize", get(graph::visualize))
        .route("/page_rank", get(graph::page_rank))
        .route("/detect_communities", get(graph::detect_communities))
        .route("/shortest_path", get(graph::shortest_path))
        .route("/load_graph", post(graph::load_graph));

    let provider_routes = Router::new()
        .route("/enrich_node", post(enrich::enrich_node))
        .route("/knowledge_base", get(knowledge_base::search))
        .route("/models/invoke", post(models::invoke))
        .route("/models/:provider", get(models::list_models));

    Router::new()
        .merge(graph_routes)
        .merge(provider_routes)
        .merge(health_routes)
        // Last added runs first: logging wraps CORS
        .layer(create_cors_layer())
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

/// Permissive CORS so the browser front-end can be served from anywhere
fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([
            HeaderName::from_static(TRACE_ID_HEADER),
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
}

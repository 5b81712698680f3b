//! Health check endpoints
//!
//! Probes for monitoring and container orchestration (Kubernetes, ECS, etc.)

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::server::state::AppState;

/// Response for the main health check endpoint
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub environment: String,
    pub uptime_seconds: u64,
    /// Current graph size
    pub nodes: usize,
    pub edges: usize,
}

/// Response for readiness probe
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub checks: ReadinessChecks,
}

/// Individual readiness checks
#[derive(Debug, Serialize)]
pub struct ReadinessChecks {
    pub config_loaded: bool,
    pub graph_loaded: bool,
    /// Whether the local Ollama daemon answered
    pub ollama: bool,
    pub gemini_configured: bool,
}

/// Response for liveness probe
#[derive(Serialize)]
pub struct LivenessResponse {
    pub alive: bool,
}

/// Main health check endpoint
///
/// Returns overall service health with version, uptime and graph size.
/// Use this for general health monitoring.
///
/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let (nodes, edges) = state.graph.counts().await;

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.settings.app_version.clone(),
        environment: state.settings.environment.to_string(),
        uptime_seconds: state.uptime_seconds(),
        nodes,
        edges,
    })
}

/// Readiness probe endpoint
///
/// Returns whether the service is ready to accept traffic. Used by load
/// balancers and container orchestrators to decide whether the instance
/// should receive requests.
///
/// Providers are optional: the service is ready once the graph is open,
/// which it always is after startup. Provider reachability is reported
/// but not required.
///
/// GET /ready
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<ReadinessResponse>) {
    let ollama = match &state.providers.ollama {
        Some(ollama) => ollama.is_running().await,
        None => false,
    };

    let checks = ReadinessChecks {
        config_loaded: true,
        graph_loaded: true,
        ollama,
        gemini_configured: state.providers.gemini.is_some(),
    };
    let ready = checks.config_loaded && checks.graph_loaded;

    if !checks.ollama {
        tracing::debug!(checks = ?checks, "Ollama not reachable (non-critical)");
    }

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(ReadinessResponse { ready, checks }))
}

/// Liveness probe endpoint
///
/// Returns whether the service is alive and should not be restarted.
/// Used by container orchestrators to detect deadlocks or other fatal issues.
///
/// GET /liveness
pub async fn liveness() -> Json<LivenessResponse> {
    Json(LivenessResponse { alive: true })
}

//! Node enrichment endpoint

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::api::extract::ApiJson;
use crate::error::ApiError;
use crate::server::state::{AppState, Provider};
use crate::services::enrichment::{Enricher, ENRICHED_ATTRIBUTE};

#[derive(Debug, Deserialize, Validate)]
pub struct EnrichRequest {
    #[validate(length(min = 1, message = "node_name must not be empty"))]
    pub node_name: String,

    /// Defaults to Bedrock
    pub provider: Option<Provider>,

    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EnrichResponse {
    pub original_info: String,
    pub enriched_info: String,
}

/// POST /enrich_node
///
/// Asks a provider about the node, stores the answer in its `enriched`
/// attribute and returns both the previous description and the new text.
/// The graph is not locked while the provider is working.
pub async fn enrich_node(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<EnrichRequest>,
) -> Result<Json<EnrichResponse>, ApiError> {
    request.validate()?;

    let node = request.node_name.as_str();
    let context = state.graph.context(node).await?;
    let original_info = state.graph.describe(node).await;

    let provider = request.provider.unwrap_or(Provider::Bedrock);
    let enricher = Enricher::new(state.providers.generator(provider)?);

    let enriched_info = enricher
        .enrich(
            node,
            &context.attributes,
            &context.connections,
            request.model.as_deref(),
        )
        .await?;

    state
        .graph
        .set_node_attribute(node, ENRICHED_ATTRIBUTE, Value::String(enriched_info.clone()))
        .await?;

    Ok(Json(EnrichResponse {
        original_info,
        enriched_info,
    }))
}

//! Knowledge-base search endpoint

use axum::{extract::State, Json};
use serde::Deserialize;
use validator::Validate;

use crate::api::extract::ApiQuery;
use crate::error::ApiError;
use crate::server::state::AppState;
use crate::services::knowledge_base::{KnowledgeBaseRecord, DEFAULT_MAX_RESULTS};

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

#[derive(Debug, Deserialize, Validate)]
pub struct SearchParams {
    #[validate(length(min = 1, message = "query must not be empty"))]
    pub query: String,

    #[serde(default = "default_max_results")]
    #[validate(range(min = 1, max = 100))]
    pub max_results: usize,
}

/// GET /knowledge_base?query=..&max_results=..
pub async fn search(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> Result<Json<Vec<KnowledgeBaseRecord>>, ApiError> {
    params.validate()?;

    let records = state
        .providers
        .knowledge_base()?
        .search(&params.query, params.max_results)
        .await?;

    Ok(Json(records))
}

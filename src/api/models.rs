//! Model listing and invocation endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::extract::ApiJson;
use crate::error::ApiError;
use crate::server::state::{not_configured, AppState, Provider};

#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub provider: Provider,
    pub models: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct InvokeRequest {
    pub provider: Provider,

    /// Provider default when absent
    pub model: Option<String>,

    #[validate(length(min = 1, message = "prompt must not be empty"))]
    pub prompt: String,

    #[serde(default)]
    pub system_prompt: String,
}

#[derive(Debug, Serialize)]
pub struct InvokeResponse {
    pub provider: Provider,
    pub text: String,
}

/// GET /models/:provider
///
/// Gemini has no listing call here; it reports the configured model.
pub async fn list_models(
    State(state): State<AppState>,
    Path(provider): Path<String>,
) -> Result<Json<ModelsResponse>, ApiError> {
    let provider: Provider = provider.parse()?;
    let providers = &state.providers;

    let models = match provider {
        Provider::Bedrock => {
            let bedrock = providers.bedrock.as_ref().ok_or_else(|| not_configured(provider))?;
            bedrock.list_models().await?
        }
        Provider::Ollama => {
            let ollama = providers.ollama.as_ref().ok_or_else(|| not_configured(provider))?;
            ollama.list_models().await?
        }
        Provider::Gemini => {
            let gemini = providers.gemini.as_ref().ok_or_else(|| not_configured(provider))?;
            vec![gemini.model().to_string()]
        }
    };

    Ok(Json(ModelsResponse { provider, models }))
}

/// POST /models/invoke
pub async fn invoke(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<InvokeRequest>,
) -> Result<Json<InvokeResponse>, ApiError> {
    request.validate()?;

    let generator = state.providers.generator(request.provider)?;
    let text = generator
        .generate(
            request.model.as_deref(),
            &request.prompt,
            &request.system_prompt,
        )
        .await?;

    Ok(Json(InvokeResponse {
        provider: request.provider,
        text,
    }))
}

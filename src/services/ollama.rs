//! Ollama service for a locally running Ollama daemon
//!
//! Talks to the daemon's REST API (`/tags`, `/generate`). Listing models
//! tolerates a daemon that is still starting: connection errors, timeouts,
//! 429 and 5xx responses are retried.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::enrichment::TextGenerator;
use super::log_attempts;
use crate::db::{ResponseRecord, SqliteStore};
use crate::retry::{
    classify_reqwest_error, classify_status, ErrorClass, Executor, RemoteResult, RetryPolicy,
};

/// Model used when the caller does not name one
pub const DEFAULT_MODEL: &str = "llama2:latest";

/// Text returned when the daemon answers without a `response` field
pub const NO_HELP: &str = "No help available.";

const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur when calling the Ollama API
#[derive(Error, Debug)]
pub enum OllamaError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP error occurred: {status} - {body}")]
    Status { status: StatusCode, body: String },
}

impl OllamaError {
    fn status(&self) -> Option<StatusCode> {
        match self {
            OllamaError::Http(e) => e.status(),
            OllamaError::Status { status, .. } => Some(*status),
        }
    }
}

/// Classifier for model listing: transport failures, 429 and 5xx are retryable
pub fn classify_listing_error(err: &OllamaError) -> ErrorClass {
    if let OllamaError::Http(e) = err {
        if e.is_connect() || e.is_timeout() {
            return ErrorClass::Retryable;
        }
    }
    match err.status() {
        Some(status) if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() => {
            ErrorClass::Retryable
        }
        _ => ErrorClass::Fatal,
    }
}

/// Classifier for generation: only timeouts, refused connections and 429
pub fn classify_generation_error(err: &OllamaError) -> ErrorClass {
    match err {
        OllamaError::Http(e) => classify_reqwest_error(e),
        OllamaError::Status { status, .. } => classify_status(*status),
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

// ============================================================================
// Ollama Service
// ============================================================================

/// Client for the Ollama REST API
#[derive(Clone)]
pub struct OllamaService {
    client: reqwest::Client,
    base_url: String,
    executor: Executor,
    listing: Executor,
    default_model: String,
    responses: Option<SqliteStore>,
}

impl OllamaService {
    /// Create a client for `base_url` (e.g. `http://localhost:11434/api`)
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        executor: Executor,
    ) -> Result<Self, OllamaError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            listing: executor.clone(),
            executor,
            default_model: DEFAULT_MODEL.to_string(),
            responses: None,
        })
    }

    /// Retry budget for model listing, which may differ from generation's
    pub fn with_listing_policy(mut self, policy: RetryPolicy) -> Self {
        self.listing = self.executor.with_policy(policy);
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Record every generated answer in the response log
    pub fn with_response_log(mut self, store: SqliteStore) -> Self {
        self.responses = Some(store);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether the daemon answers `/tags` with 200 within a few seconds
    pub async fn is_running(&self) -> bool {
        match self
            .client
            .get(format!("{}/tags", self.base_url))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status() == StatusCode::OK,
            Err(e) => {
                tracing::debug!(error = %e, "Ollama server not reachable");
                false
            }
        }
    }

    /// Names of the locally installed models
    pub async fn list_models(&self) -> RemoteResult<Vec<String>> {
        let url = format!("{}/tags", self.base_url);
        let policy = self.listing.policy();

        let tags = self
            .listing
            .execute_observed(
                || {
                    let request = self.client.get(&url);
                    async move {
                        let response = checked(request.send().await?).await?;
                        Ok::<_, OllamaError>(response.json::<TagsResponse>().await?)
                    }
                },
                classify_listing_error,
                log_attempts("ollama", "tags", policy),
            )
            .await?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Ask `model` to answer `prompt`; the answer is recorded when a response
    /// log is configured
    pub async fn generate(
        &self,
        model: &str,
        prompt: &str,
        system_prompt: &str,
    ) -> RemoteResult<String> {
        let url = format!("{}/generate", self.base_url);
        let body = GenerateRequest {
            model,
            prompt,
            system: system_prompt,
            stream: false,
        };
        let policy = self.executor.policy();

        tracing::debug!(model = %model, "Calling Ollama generate");

        let reply = self
            .executor
            .execute_observed(
                || {
                    let request = self.client.post(&url).json(&body);
                    async move {
                        let response = checked(request.send().await?).await?;
                        Ok::<_, OllamaError>(response.json::<GenerateResponse>().await?)
                    }
                },
                classify_generation_error,
                log_attempts("ollama", "generate", policy),
            )
            .await?;

        let text = reply.response.unwrap_or_else(|| NO_HELP.to_string());

        if let Some(store) = &self.responses {
            let record = ResponseRecord::new("Ollama", model, prompt, system_prompt, text.as_str());
            if let Err(e) = store.save_response(&record).await {
                tracing::warn!(error = %e, "Failed to record Ollama response");
            }
        }

        Ok(text)
    }
}

/// Turn a non-success status into an error carrying the response body
async fn checked(response: reqwest::Response) -> Result<reqwest::Response, OllamaError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(OllamaError::Status { status, body })
}

#[async_trait]
impl TextGenerator for OllamaService {
    async fn generate(
        &self,
        model: Option<&str>,
        prompt: &str,
        system_prompt: &str,
    ) -> RemoteResult<String> {
        let model = model.unwrap_or(&self.default_model);
        OllamaService::generate(self, model, prompt, system_prompt).await
    }

    fn provider(&self) -> &str {
        "Ollama"
    }
}

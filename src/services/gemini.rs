//! Gemini service for Google Gemini API interactions
//!
//! Uses the REST `generateContent` endpoint with API-key authentication.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::enrichment::TextGenerator;
use super::log_attempts;
use crate::db::{ResponseRecord, SqliteStore};
use crate::retry::{
    classify_reqwest_error, classify_status, ErrorClass, Executor, RemoteError, RemoteResult,
};

/// Default Gemini API base URL
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Prompt sent by [`GeminiService::check_setup`]
pub const SETUP_PROMPT: &str = "Hello, how are you?";

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur when calling the Gemini API
#[derive(Error, Debug)]
pub enum GeminiServiceError {
    #[error("Gemini API key is not configured")]
    MissingApiKey,

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Gemini API error ({status}): {message}")]
    ApiError { status: StatusCode, message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

/// Rate limiting and transport hiccups are retryable
pub fn classify_gemini_error(err: &GeminiServiceError) -> ErrorClass {
    match err {
        GeminiServiceError::HttpError(e) => classify_reqwest_error(e),
        GeminiServiceError::ApiError { status, .. } => classify_status(*status),
        _ => ErrorClass::Fatal,
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl GenerateContentResponse {
    /// Text of the first candidate, parts concatenated
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        Some(text)
    }
}

// ============================================================================
// Gemini Service
// ============================================================================

/// Configuration for Gemini service
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,

    /// Model name, e.g. `gemini-pro`
    pub model: String,

    /// Base URL (default: generativelanguage.googleapis.com)
    pub base_url: Option<String>,

    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
            timeout_seconds: 30,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }
}

/// Service for interacting with Google Gemini API
#[derive(Clone)]
pub struct GeminiService {
    client: Client,
    config: GeminiConfig,
    executor: Executor,
    responses: Option<SqliteStore>,
}

impl GeminiService {
    pub fn new(config: GeminiConfig, executor: Executor) -> Result<Self, GeminiServiceError> {
        if config.api_key.trim().is_empty() {
            return Err(GeminiServiceError::MissingApiKey);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            config,
            executor,
            responses: None,
        })
    }

    /// Record setup-check exchanges in the response log
    pub fn with_response_log(mut self, store: SqliteStore) -> Self {
        self.responses = Some(store);
        self
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    /// Generate text with `model` (or the configured model)
    pub async fn generate_with(
        &self,
        model: &str,
        prompt: &str,
        system_prompt: &str,
    ) -> RemoteResult<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url(), model);
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: prompt }],
            }],
            system_instruction: (!system_prompt.is_empty()).then(|| Content {
                role: None,
                parts: vec![Part {
                    text: system_prompt,
                }],
            }),
        };

        tracing::debug!(model = %model, url = %url, "Calling Gemini generateContent API");

        let policy = self.executor.policy();
        let response = self
            .executor
            .execute_observed(
                || {
                    let call = self
                        .client
                        .post(&url)
                        .header("x-goog-api-key", &self.config.api_key)
                        .json(&request);
                    async move { send(call).await }
                },
                classify_gemini_error,
                log_attempts("gemini", "generateContent", policy),
            )
            .await?;

        response
            .text()
            .ok_or_else(|| RemoteError::fatal("Gemini returned no candidates"))
    }

    /// Generate text with the configured model
    pub async fn generate(&self, prompt: &str, system_prompt: &str) -> RemoteResult<String> {
        self.generate_with(&self.config.model, prompt, system_prompt)
            .await
    }

    /// Send a greeting to verify the key and model; records the exchange
    pub async fn check_setup(&self) -> RemoteResult<String> {
        let text = self.generate(SETUP_PROMPT, "").await?;

        if let Some(store) = &self.responses {
            let record = ResponseRecord::new("Gemini", self.model(), SETUP_PROMPT, "", text.as_str());
            if let Err(e) = store.save_response(&record).await {
                tracing::warn!(error = %e, "Failed to record Gemini response");
            }
        }

        tracing::info!(model = %self.model(), "Gemini setup successful");
        Ok(text)
    }
}

async fn send(call: reqwest::RequestBuilder) -> Result<GenerateContentResponse, GeminiServiceError> {
    let response = call.send().await?;
    let status = response.status();

    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&error_text)
            .map(|e| e.error.message)
            .unwrap_or(error_text);
        return Err(GeminiServiceError::ApiError { status, message });
    }

    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| {
        tracing::error!(error = %e, body = %body, "Failed to parse Gemini response");
        GeminiServiceError::ParseError(e.to_string())
    })
}

#[async_trait]
impl TextGenerator for GeminiService {
    async fn generate(
        &self,
        model: Option<&str>,
        prompt: &str,
        system_prompt: &str,
    ) -> RemoteResult<String> {
        let model = model.unwrap_or(&self.config.model);
        self.generate_with(model, prompt, system_prompt).await
    }

    fn provider(&self) -> &str {
        "Gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::{ErrorKind, RetryPolicy};
    use mockito::Matcher;

    fn service(url: &str, max_retries: u32) -> GeminiService {
        let config = GeminiConfig::new("test-key", "gemini-pro").with_base_url(url);
        let policy = RetryPolicy::new(max_retries, Duration::from_millis(1));
        GeminiService::new(config, Executor::new(policy)).unwrap()
    }

    const REPLY: &str =
        r#"{"candidates": [{"content": {"role": "model", "parts": [{"text": "I am "}, {"text": "well."}]}}]}"#;

    #[test]
    fn test_missing_api_key() {
        let config = GeminiConfig::new("  ", "gemini-pro");
        assert!(matches!(
            GeminiService::new(config, Executor::default()),
            Err(GeminiServiceError::MissingApiKey)
        ));
    }

    #[tokio::test]
    async fn test_generate() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/models/gemini-pro:generateContent")
            .match_header("x-goog-api-key", "test-key")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "contents": [{"role": "user", "parts": [{"text": "Hello"}]}],
                "systemInstruction": {"parts": [{"text": "Be kind"}]},
            })))
            .with_status(200)
            .with_body(REPLY)
            .create_async()
            .await;

        let text = service(&server.url(), 0)
            .generate("Hello", "Be kind")
            .await
            .unwrap();
        assert_eq!(text, "I am well.");
    }

    #[tokio::test]
    async fn test_rate_limit_retried_then_success() {
        let mut server = mockito::Server::new_async().await;
        let limited = server
            .mock("POST", "/models/gemini-pro:generateContent")
            .with_status(429)
            .with_body(r#"{"error": {"code": 429, "message": "Resource exhausted", "status": "RESOURCE_EXHAUSTED"}}"#)
            .expect(2)
            .create_async()
            .await;

        let err = service(&server.url(), 1)
            .generate("Hello", "")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Exhausted);
        assert_eq!(err.attempts_made, 2);
        assert!(err.message.contains("Resource exhausted"));
        limited.assert_async().await;
    }

    #[tokio::test]
    async fn test_permission_denied_is_fatal() {
        let mut server = mockito::Server::new_async().await;
        let denied = server
            .mock("POST", "/models/gemini-pro:generateContent")
            .with_status(403)
            .with_body(r#"{"error": {"code": 403, "message": "API key not valid"}}"#)
            .expect(1)
            .create_async()
            .await;

        let err = service(&server.url(), 3)
            .generate("Hello", "")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Fatal);
        assert!(err.message.contains("API key not valid"));
        denied.assert_async().await;
    }

    #[tokio::test]
    async fn test_check_setup_records_response() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/models/gemini-pro:generateContent")
            .with_status(200)
            .with_body(REPLY)
            .create_async()
            .await;

        let store = SqliteStore::in_memory().await.unwrap();
        let gemini = service(&server.url(), 0).with_response_log(store.clone());
        gemini.check_setup().await.unwrap();

        let recent = store.recent_responses(1).await.unwrap();
        assert_eq!(recent[0].provider, "Gemini");
        assert_eq!(recent[0].user_text, SETUP_PROMPT);
        assert_eq!(recent[0].back_content, "I am well.");
    }

    #[tokio::test]
    async fn test_trait_uses_requested_model() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/models/gemini-1.5-flash:generateContent")
            .with_status(200)
            .with_body(REPLY)
            .create_async()
            .await;

        let gemini = service(&server.url(), 0);
        let text = TextGenerator::generate(&gemini, Some("gemini-1.5-flash"), "Hi", "")
            .await
            .unwrap();
        assert_eq!(text, "I am well.");
        assert_eq!(gemini.provider(), "Gemini");
    }
}

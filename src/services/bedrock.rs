//! Bedrock service for AWS Bedrock API interactions
//!
//! Invokes text models through the InvokeModel API and lists foundation
//! models through the Bedrock control plane. Each model family expects its
//! own request body and answers with its own response shape.

use async_trait::async_trait;
use aws_sdk_bedrock::types::FoundationModelSummary;
use aws_sdk_bedrock::Client as BedrockClient;
use aws_sdk_bedrockruntime::primitives::Blob;
use aws_sdk_bedrockruntime::Client as BedrockRuntimeClient;
use aws_smithy_runtime_api::client::result::SdkError;
use aws_smithy_types::error::display::DisplayErrorContext;
use aws_smithy_types::error::metadata::ProvideErrorMetadata;
use serde_json::{json, Value};
use thiserror::Error;

use super::enrichment::TextGenerator;
use super::log_attempts;
use crate::retry::{classify_error_code, ErrorClass, Executor, RemoteError, RemoteResult};

/// Token budget for every generated answer
const MAX_TOKENS: u32 = 300;
const TEMPERATURE: f64 = 0.7;
const TOP_P: f64 = 0.9;

// ============================================================================
// Errors
// ============================================================================

/// Errors raised by a single Bedrock call
#[derive(Error, Debug)]
pub enum BedrockError {
    #[error("Unsupported model ID: {0}")]
    UnsupportedModel(String),

    #[error("{operation} failed: {message}")]
    Service {
        operation: &'static str,
        code: Option<String>,
        message: String,
    },

    #[error("Invalid response body: {0}")]
    InvalidResponse(String),
}

impl BedrockError {
    /// Convert an SDK error, keeping the service error code for classification
    pub fn from_sdk<E, R>(operation: &'static str, err: SdkError<E, R>) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error + 'static,
        R: std::fmt::Debug,
    {
        let code = err.code().map(str::to_string);
        let message = match err.message() {
            Some(message) => message.to_string(),
            None => DisplayErrorContext(&err).to_string(),
        };

        BedrockError::Service {
            operation,
            code,
            message,
        }
    }

    /// AWS error code, if the service returned one
    pub fn code(&self) -> Option<&str> {
        match self {
            BedrockError::Service { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

/// Throttling codes are retryable; everything else is fatal
pub fn classify_bedrock_error(err: &BedrockError) -> ErrorClass {
    classify_error_code(err.code())
}

// ============================================================================
// Model families
// ============================================================================

/// Request/response dialect of a Bedrock text model, chosen by model ID prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    Anthropic,
    Ai21,
    Amazon,
}

impl ModelFamily {
    pub fn from_model_id(model_id: &str) -> Result<Self, BedrockError> {
        if model_id.starts_with("anthropic.") {
            Ok(ModelFamily::Anthropic)
        } else if model_id.starts_with("ai21.") {
            Ok(ModelFamily::Ai21)
        } else if model_id.starts_with("amazon.") {
            Ok(ModelFamily::Amazon)
        } else {
            Err(BedrockError::UnsupportedModel(model_id.to_string()))
        }
    }

    /// InvokeModel body for this family
    pub fn request_body(self, prompt: &str, system_prompt: &str) -> Value {
        match self {
            ModelFamily::Anthropic => json!({
                "prompt": format!("{system_prompt}\n\nHuman: {prompt}\n\nAssistant:"),
                "max_tokens_to_sample": MAX_TOKENS,
                "temperature": TEMPERATURE,
                "top_p": TOP_P,
            }),
            ModelFamily::Ai21 => json!({
                "prompt": format!("{system_prompt}\n\n{prompt}"),
                "maxTokens": MAX_TOKENS,
                "temperature": TEMPERATURE,
                "topP": TOP_P,
            }),
            ModelFamily::Amazon => json!({
                "inputText": format!("{system_prompt}\n\n{prompt}"),
                "textGenerationConfig": {
                    "maxTokenCount": MAX_TOKENS,
                    "temperature": TEMPERATURE,
                    "topP": TOP_P,
                },
            }),
        }
    }

    /// Pull the generated text out of an InvokeModel response body
    pub fn extract_text(self, body: &[u8]) -> Result<String, BedrockError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| BedrockError::InvalidResponse(e.to_string()))?;

        let text = match self {
            ModelFamily::Anthropic => value.get("completion"),
            ModelFamily::Ai21 => value.pointer("/completions/0/data/text"),
            ModelFamily::Amazon => value.pointer("/results/0/outputText"),
        };

        text.and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                BedrockError::InvalidResponse(format!("no generated text in {:?} response", self))
            })
    }
}

// ============================================================================
// Service
// ============================================================================

/// Service for interacting with AWS Bedrock.
///
/// Holds the runtime client for inference and the control-plane client for
/// model listing. Calls are retried on throttling according to the
/// executor's policy.
#[derive(Clone)]
pub struct BedrockService {
    runtime: BedrockRuntimeClient,
    control: BedrockClient,
    executor: Executor,
    default_model: String,
}

impl BedrockService {
    pub fn new(
        runtime: BedrockRuntimeClient,
        control: BedrockClient,
        executor: Executor,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            runtime,
            control,
            executor,
            default_model: default_model.into(),
        }
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Invoke a text model and return its generated text
    pub async fn invoke_model(
        &self,
        model_id: &str,
        prompt: &str,
        system_prompt: &str,
    ) -> RemoteResult<String> {
        let family =
            ModelFamily::from_model_id(model_id).map_err(|e| RemoteError::fatal(e.to_string()))?;
        let body = family.request_body(prompt, system_prompt).to_string();

        tracing::debug!(model_id = %model_id, family = ?family, "Invoking Bedrock model");

        let policy = self.executor.policy();
        self.executor
            .execute_observed(
                || {
                    let request = self
                        .runtime
                        .invoke_model()
                        .model_id(model_id)
                        .content_type("application/json")
                        .accept("application/json")
                        .body(Blob::new(body.as_bytes().to_vec()));
                    async move {
                        let output = request
                            .send()
                            .await
                            .map_err(|e| BedrockError::from_sdk("InvokeModel", e))?;
                        family.extract_text(output.body().as_ref())
                    }
                },
                classify_bedrock_error,
                log_attempts("bedrock", "InvokeModel", policy),
            )
            .await
    }

    /// List the identifiers of the available foundation models
    pub async fn list_models(&self) -> RemoteResult<Vec<String>> {
        let policy = self.executor.policy();
        let models = self
            .executor
            .execute_observed(
                || {
                    let request = self.control.list_foundation_models();
                    async move {
                        request
                            .send()
                            .await
                            .map_err(|e| BedrockError::from_sdk("ListFoundationModels", e))
                    }
                },
                classify_bedrock_error,
                log_attempts("bedrock", "ListFoundationModels", policy),
            )
            .await?;

        let summaries =
            Option::<&[FoundationModelSummary]>::from(models.model_summaries()).unwrap_or_default();

        Ok(summaries
            .iter()
            .filter_map(|summary| Option::<&str>::from(summary.model_id()))
            .map(str::to_string)
            .collect())
    }
}

#[async_trait]
impl TextGenerator for BedrockService {
    async fn generate(
        &self,
        model: Option<&str>,
        prompt: &str,
        system_prompt: &str,
    ) -> RemoteResult<String> {
        let model = model.unwrap_or(&self.default_model);
        self.invoke_model(model, prompt, system_prompt).await
    }

    fn provider(&self) -> &str {
        "Bedrock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_from_prefix() {
        assert_eq!(
            ModelFamily::from_model_id("anthropic.claude-v2").unwrap(),
            ModelFamily::Anthropic
        );
        assert_eq!(
            ModelFamily::from_model_id("ai21.j2-ultra-v1").unwrap(),
            ModelFamily::Ai21
        );
        assert_eq!(
            ModelFamily::from_model_id("amazon.titan-text-express-v1").unwrap(),
            ModelFamily::Amazon
        );
        assert!(matches!(
            ModelFamily::from_model_id("meta.llama3-8b"),
            Err(BedrockError::UnsupportedModel(id)) if id == "meta.llama3-8b"
        ));
    }

    #[test]
    fn test_anthropic_body() {
        let body = ModelFamily::Anthropic.request_body("What is the capital of France?", "Be brief");
        assert_eq!(
            body["prompt"],
            "Be brief\n\nHuman: What is the capital of France?\n\nAssistant:"
        );
        assert_eq!(body["max_tokens_to_sample"], 300);
        assert_eq!(body["top_p"], 0.9);
    }

    #[test]
    fn test_amazon_body() {
        let body = ModelFamily::Amazon.request_body("Who was Kant?", "");
        assert_eq!(body["inputText"], "\n\nWho was Kant?");
        assert_eq!(body["textGenerationConfig"]["maxTokenCount"], 300);
        assert_eq!(body["textGenerationConfig"]["temperature"], 0.7);
    }

    #[test]
    fn test_ai21_body() {
        let body = ModelFamily::Ai21.request_body("Hello", "System");
        assert_eq!(body["prompt"], "System\n\nHello");
        assert_eq!(body["maxTokens"], 300);
    }

    #[test]
    fn test_extract_text_per_family() {
        let anthropic = br#"{"completion": " Paris."}"#;
        assert_eq!(ModelFamily::Anthropic.extract_text(anthropic).unwrap(), " Paris.");

        let ai21 = br#"{"completions": [{"data": {"text": "Berlin"}}]}"#;
        assert_eq!(ModelFamily::Ai21.extract_text(ai21).unwrap(), "Berlin");

        let amazon = br#"{"results": [{"outputText": "Rome", "tokenCount": 1}]}"#;
        assert_eq!(ModelFamily::Amazon.extract_text(amazon).unwrap(), "Rome");
    }

    #[test]
    fn test_extract_text_rejects_wrong_shape() {
        let err = ModelFamily::Amazon
            .extract_text(br#"{"completion": "wrong family"}"#)
            .unwrap_err();
        assert!(matches!(err, BedrockError::InvalidResponse(_)));

        assert!(ModelFamily::Anthropic.extract_text(b"not json").is_err());
    }

    #[test]
    fn test_classification_uses_error_code() {
        let throttled = BedrockError::Service {
            operation: "InvokeModel",
            code: Some("ThrottlingException".into()),
            message: "Rate exceeded".into(),
        };
        assert_eq!(classify_bedrock_error(&throttled), ErrorClass::Retryable);

        let validation = BedrockError::Service {
            operation: "InvokeModel",
            code: Some("ValidationException".into()),
            message: "Malformed input request".into(),
        };
        assert_eq!(classify_bedrock_error(&validation), ErrorClass::Fatal);

        let unsupported = BedrockError::UnsupportedModel("x".into());
        assert_eq!(classify_bedrock_error(&unsupported), ErrorClass::Fatal);
        assert_eq!(
            classify_bedrock_error(&BedrockError::InvalidResponse("x".into())),
            ErrorClass::Fatal
        );
    }

    #[test]
    fn test_error_display() {
        let err = BedrockError::Service {
            operation: "InvokeModel",
            code: Some("AccessDeniedException".into()),
            message: "not authorized".into(),
        };
        assert_eq!(err.to_string(), "InvokeModel failed: not authorized");
        assert_eq!(err.code(), Some("AccessDeniedException"));
    }
}

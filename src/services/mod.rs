//! Services module
//!
//! Remote model providers, the knowledge base, node enrichment and the
//! shared graph service. Every remote call goes through [`crate::retry`].

pub mod bedrock;
pub mod enrichment;
pub mod gemini;
pub mod graph_service;
pub mod knowledge_base;
pub mod ollama;

pub use bedrock::{BedrockError, BedrockService, ModelFamily};
pub use enrichment::{Enricher, TextGenerator};
pub use gemini::{GeminiConfig, GeminiService, GeminiServiceError};
pub use graph_service::GraphService;
pub use knowledge_base::{KnowledgeBaseRecord, KnowledgeBaseService};
pub use ollama::{OllamaError, OllamaService};

use crate::retry::{AttemptOutcome, CallAttempt, RetryPolicy};

/// Observer that logs every attempt of a remote call
///
/// Retryable failures are logged at `warn` together with the backoff that
/// follows, fatal ones at `error`. A success is only logged when it needed
/// more than one attempt.
pub(crate) fn log_attempts<'a, T>(
    service: &'static str,
    operation: &'a str,
    policy: &'a RetryPolicy,
) -> impl FnMut(&CallAttempt<'_, T>) + 'a
where
    T: 'a,
{
    move |attempt| match &attempt.outcome {
        AttemptOutcome::Success(_) if attempt.index > 0 => {
            tracing::info!(
                service,
                operation,
                attempts = attempt.index + 1,
                "Remote call succeeded after retrying"
            );
        }
        AttemptOutcome::Success(_) => {}
        AttemptOutcome::RetryableFailure(reason) if attempt.index < policy.max_retries() => {
            tracing::warn!(
                service,
                operation,
                attempt = attempt.index + 1,
                backoff_ms = policy.backoff_after(attempt.index).as_millis() as u64,
                started_at = %attempt.timestamp,
                error = %reason,
                "Retryable failure, backing off"
            );
        }
        AttemptOutcome::RetryableFailure(reason) => {
            tracing::error!(
                service,
                operation,
                attempts = attempt.index + 1,
                error = %reason,
                "Retry budget exhausted"
            );
        }
        AttemptOutcome::FatalFailure(reason) => {
            tracing::error!(
                service,
                operation,
                attempt = attempt.index + 1,
                error = %reason,
                "Remote call failed"
            );
        }
    }
}

//! Bounded-retry executor for remote calls
//!
//! Runs an async operation, classifies each failure, and retries the
//! retryable ones with exponential backoff until the policy's budget is
//! spent. The executor itself does no logging: callers that want a trail of
//! attempts pass an observer to [`Executor::execute_observed`].

use std::fmt;
use std::future::Future;

use chrono::{DateTime, Utc};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use super::classify::ErrorClass;
use super::policy::RetryPolicy;

/// Outcome of a single invocation of the operation
#[derive(Debug)]
pub enum AttemptOutcome<'a, T> {
    Success(&'a T),
    RetryableFailure(String),
    FatalFailure(String),
}

/// Record of one invocation, handed to the observer and then dropped
#[derive(Debug)]
pub struct CallAttempt<'a, T> {
    /// 0-based attempt index
    pub index: u32,
    /// When the invocation started
    pub timestamp: DateTime<Utc>,
    pub outcome: AttemptOutcome<'a, T>,
}

/// Why a remote call ultimately failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Non-retryable remote error (bad request, authorization failure, ...)
    Fatal,
    /// Retry budget spent while errors remained retryable
    Exhausted,
    /// Cancellation was signalled during a backoff sleep
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Fatal => write!(f, "fatal"),
            ErrorKind::Exhausted => write!(f, "exhausted"),
            ErrorKind::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Terminal failure of a remote call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} after {attempts_made} attempt(s): {message}")]
pub struct RemoteError {
    pub kind: ErrorKind,
    /// Message of the last observed error
    pub message: String,
    pub attempts_made: u32,
}

impl RemoteError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, attempts_made: u32) -> Self {
        Self {
            kind,
            message: message.into(),
            attempts_made,
        }
    }

    /// A failure that happened before any remote invocation (e.g. a request that
    /// could not be built). Counts as a single fatal attempt.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Fatal, message, 1)
    }

    pub fn is_exhausted(&self) -> bool {
        self.kind == ErrorKind::Exhausted
    }
}

/// Terminal result of a remote call
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Executes remote operations under a [`RetryPolicy`]
#[derive(Debug, Clone, Default)]
pub struct Executor {
    policy: RetryPolicy,
    cancel: Option<CancellationToken>,
}

impl Executor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            cancel: None,
        }
    }

    /// Abort during backoff once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Same cancellation signal, different retry budget
    pub fn with_policy(&self, policy: RetryPolicy) -> Self {
        Self {
            policy,
            cancel: self.cancel.clone(),
        }
    }

    /// Run `operation` until it succeeds, fails fatally, or the budget is spent
    pub async fn execute<T, E, F, Fut, C>(&self, operation: F, classify: C) -> RemoteResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: Fn(&E) -> ErrorClass,
        E: fmt::Display,
    {
        self.execute_observed(operation, classify, |_| {}).await
    }

    /// Like [`Executor::execute`], reporting every attempt to `observe`
    pub async fn execute_observed<T, E, F, Fut, C, O>(
        &self,
        mut operation: F,
        classify: C,
        mut observe: O,
    ) -> RemoteResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: Fn(&E) -> ErrorClass,
        E: fmt::Display,
        O: FnMut(&CallAttempt<'_, T>),
    {
        let mut attempt: u32 = 0;

        loop {
            let timestamp = Utc::now();

            let err = match operation().await {
                Ok(value) => {
                    observe(&CallAttempt {
                        index: attempt,
                        timestamp,
                        outcome: AttemptOutcome::Success(&value),
                    });
                    return Ok(value);
                }
                Err(err) => err,
            };

            let message = err.to_string();
            let attempts_made = attempt + 1;

            if classify(&err) == ErrorClass::Fatal {
                observe(&CallAttempt {
                    index: attempt,
                    timestamp,
                    outcome: AttemptOutcome::FatalFailure(message.clone()),
                });
                return Err(RemoteError::new(ErrorKind::Fatal, message, attempts_made));
            }

            observe(&CallAttempt {
                index: attempt,
                timestamp,
                outcome: AttemptOutcome::RetryableFailure(message.clone()),
            });

            if attempt >= self.policy.max_retries() {
                return Err(RemoteError::new(
                    ErrorKind::Exhausted,
                    message,
                    attempts_made,
                ));
            }

            if !self.backoff(self.policy.backoff_after(attempt)).await {
                return Err(RemoteError::new(
                    ErrorKind::Cancelled,
                    message,
                    attempts_made,
                ));
            }

            attempt += 1;
        }
    }

    /// Sleep for `delay`; returns false if cancelled first.
    async fn backoff(&self, delay: std::time::Duration) -> bool {
        match &self.cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => false,
                    _ = sleep(delay) => true,
                }
            }
            None => {
                sleep(delay).await;
                true
            }
        }
    }
}

/// Run `operation` under `policy` without cancellation
pub async fn execute<T, E, F, Fut, C>(
    operation: F,
    classify: C,
    policy: &RetryPolicy,
) -> RemoteResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> ErrorClass,
    E: fmt::Display,
{
    Executor::new(policy.clone()).execute(operation, classify).await
}

//! API error types

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::db::StoreError;
use crate::graph::GraphError;
use crate::retry::{ErrorKind, RemoteError};
use crate::services::graph_service::GraphServiceError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Service temporarily unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Request cancelled: {0}")]
    Cancelled(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<RemoteError> for ApiError {
    fn from(err: RemoteError) -> Self {
        match err.kind {
            ErrorKind::Fatal => ApiError::Upstream(err.message),
            ErrorKind::Exhausted => ApiError::UpstreamUnavailable(format!(
                "{} (gave up after {} attempts)",
                err.message, err.attempts_made
            )),
            ErrorKind::Cancelled => ApiError::Cancelled(err.message),
        }
    }
}

impl From<GraphError> for ApiError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::NodeNotFound(_) => ApiError::NotFound(err.to_string()),
            GraphError::InvalidJson(_) | GraphError::MissingKey(_) => {
                ApiError::InvalidRequest(err.to_string())
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Storage(err.to_string())
    }
}

impl From<GraphServiceError> for ApiError {
    fn from(err: GraphServiceError) -> Self {
        match err {
            GraphServiceError::Graph(e) => e.into(),
            GraphServiceError::Store(e) => e.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::InvalidRequest(rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::InvalidRequest(err.to_string())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::UpstreamUnavailable(_) | ApiError::Cancelled(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Storage(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            ApiError::InvalidRequest(_) => "invalid_request_error",
            ApiError::NotFound(_) => "not_found_error",
            ApiError::UpstreamUnavailable(_) => "overloaded_error",
            ApiError::Upstream(_) => "upstream_error",
            ApiError::Cancelled(_) => "cancelled_error",
            ApiError::Storage(_) | ApiError::Internal(_) => "api_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_type = self.error_type();
        let message = match &self {
            ApiError::Internal(err) => err.to_string(),
            other => other.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(status = %status.as_u16(), error = %message, "Request failed");
        }

        let body = Json(ErrorResponse {
            type_: "error".to_string(),
            error: ErrorDetail {
                type_: error_type.to_string(),
                message,
            },
        });

        (status, body).into_response()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    #[serde(rename = "type")]
    type_: String,
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    #[serde(rename = "type")]
    type_: String,
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_mapping() {
        let exhausted: ApiError = RemoteError::new(ErrorKind::Exhausted, "ThrottlingException", 4).into();
        assert_eq!(exhausted.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(exhausted.to_string().contains("4 attempts"));

        let fatal: ApiError = RemoteError::fatal("ValidationException").into();
        assert_eq!(fatal.status(), StatusCode::BAD_GATEWAY);

        let cancelled: ApiError = RemoteError::new(ErrorKind::Cancelled, "x", 1).into();
        assert_eq!(cancelled.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_graph_error_mapping() {
        let missing: ApiError = GraphError::NodeNotFound("Kant".to_string()).into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(missing.to_string(), "Node 'Kant' not found in the graph.");

        let invalid: ApiError = GraphError::MissingKey("nodes".to_string()).into();
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
    }
}

//! Request extractors whose rejections use the API error envelope
//!
//! Axum's own `Json` and `Query` reject malformed input with a plain-text
//! body. These wrappers run the same extraction and turn the rejection into
//! an [`ApiError::InvalidRequest`].

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::ApiError;

/// JSON request body
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query string parameters
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

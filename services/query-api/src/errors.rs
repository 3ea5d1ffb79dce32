// Copyright 2026 Query Bridge Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy → HTTP mapping (spec §7).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use query_bridge_core::Error as CoreError;
use serde::Serialize;

/// Body returned for every non-2xx response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    error: String,
}

/// Wraps [`CoreError`] so it can be returned directly from an axum handler.
#[derive(Debug)]
pub struct ApiError(CoreError);

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            CoreError::Malformed(_) | CoreError::UnknownFunction(_) => StatusCode::BAD_REQUEST,
            CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            CoreError::Upstream(_) => StatusCode::BAD_REQUEST,
            CoreError::Serialization(_) => StatusCode::BAD_REQUEST,
        };
        (status, Json(ErrorBody { error: self.0.to_string() })).into_response()
    }
}

// Copyright 2026 Query Bridge Contributors
// SPDX-License-Identifier: Apache-2.0

//! `POST /query` and `POST /analyze` (spec §6).

use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, http::HeaderValue, response::IntoResponse, routing::post, Json, Router};
use query_bridge_engine::QueryEnvelope;

use crate::errors::ApiError;
use crate::models::AppState;

/// Routes for the two fan-out endpoints.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/query", post(query)).route("/analyze", post(analyze))
}

async fn query(
    State(state): State<Arc<AppState>>,
    Json(envelope): Json<QueryEnvelope>,
) -> Result<impl IntoResponse, ApiError> {
    let started = Instant::now();
    let series = state.coordinator.query(envelope).await?;
    let wall = started.elapsed().as_secs_f64();

    let mut response = Json(series).into_response();
    let headers = response.headers_mut();
    if let Ok(v) = HeaderValue::from_str(&wall.to_string()) {
        headers.insert("x-request-duration", v.clone());
        // No portable per-request CPU clock in stdlib/tokio; the adapter
        // does no blocking work of its own, so wall clock stands in.
        headers.insert("x-request-duration-cpu", v);
    }
    Ok(response)
}

async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(envelope): Json<QueryEnvelope>,
) -> Result<impl IntoResponse, ApiError> {
    let records = state.coordinator.analyze(envelope).await?;
    Ok(Json(records))
}

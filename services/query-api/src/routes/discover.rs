// Copyright 2026 Query Bridge Contributors
// SPDX-License-Identifier: Apache-2.0

//! `POST /search` and `POST /metadata` (spec §6).

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};

use crate::errors::ApiError;
use crate::models::{AppState, MetadataRequest, SearchRequest};

/// Routes for the two metadata-lookup endpoints.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/search", post(search)).route("/metadata", post(metadata))
}

async fn search(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<query_bridge_engine::SearchResult>, ApiError> {
    let result = state.coordinator.search(&req.target, req.metadata, req.limit).await?;
    Ok(Json(result))
}

async fn metadata(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MetadataRequest>,
) -> Result<Json<std::collections::BTreeMap<String, query_bridge_core::MetricMetadata>>, ApiError> {
    let result = state.coordinator.metadata(&req.target).await?;
    Ok(Json(result))
}

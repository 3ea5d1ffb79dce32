// Copyright 2026 Query Bridge Contributors
// SPDX-License-Identifier: Apache-2.0

//! Shared application state and the small request DTOs the view façade
//! needs beyond what `query_bridge_engine` already defines.

use std::sync::Arc;

use query_bridge_engine::Coordinator;
use serde::Deserialize;

/// Handle shared across every route, cloned cheaply via `Arc`.
pub struct AppState {
    /// The request coordinator (component G) every handler calls into.
    pub coordinator: Arc<Coordinator>,
}

/// `POST /search` request body (spec §6).
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    /// Pattern, infix, or slash-wrapped selector.
    pub target: String,
    /// Whether to return metric→metadata instead of a name list.
    #[serde(default)]
    pub metadata: bool,
    /// Maximum number of metrics to return.
    #[serde(default)]
    pub limit: Option<u32>,
}

/// `POST /metadata` request body (spec §6).
#[derive(Debug, Deserialize)]
pub struct MetadataRequest {
    /// Exact metric name.
    pub target: String,
}

/// `POST /legacy/cntr_status.php` form body (spec §6).
#[derive(Debug, Deserialize)]
pub struct CounterStatusForm {
    /// Metric selector pattern.
    pub selector: String,
}

/// `GET /legacy/counter_data.php` query parameters (spec §6).
#[derive(Debug, Deserialize)]
pub struct CounterDataQuery {
    /// Metric name.
    pub cntr: String,
    /// Window start, posix milliseconds.
    pub start: i64,
    /// Window end, posix milliseconds.
    pub stop: i64,
    /// Requested point count.
    pub width: i64,
}

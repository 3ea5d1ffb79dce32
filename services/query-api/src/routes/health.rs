// Copyright 2026 Query Bridge Contributors
// SPDX-License-Identifier: Apache-2.0

//! `GET /` health check (spec §6).

use std::sync::Arc;

use axum::{http::StatusCode, routing::get, Router};

use crate::models::AppState;

/// Route for the health check.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/", get(health))
}

async fn health() -> StatusCode {
    StatusCode::OK
}

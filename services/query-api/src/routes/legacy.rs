// Copyright 2026 Query Bridge Contributors
// SPDX-License-Identifier: Apache-2.0

//! `/legacy/cntr_status.php` and `/legacy/counter_data.php` (spec §6), kept
//! for dashboard clients still speaking the original counter-plugin wire
//! format.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Form, Json, Router,
};

use crate::errors::ApiError;
use crate::models::{AppState, CounterDataQuery, CounterStatusForm};

/// Routes for the two legacy counter endpoints.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/legacy/cntr_status.php", post(counter_status))
        .route("/legacy/counter_data.php", get(counter_data))
}

async fn counter_status(
    State(state): State<Arc<AppState>>,
    Form(form): Form<CounterStatusForm>,
) -> Result<String, ApiError> {
    let rows = state.coordinator.counter_status(&form.selector).await?;
    let body = rows
        .into_iter()
        .map(|(metric, description)| format!("{metric};{description}"))
        .collect::<Vec<_>>()
        .join("\n");
    Ok(body)
}

async fn counter_data(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CounterDataQuery>,
) -> Result<Json<query_bridge_engine::CounterData>, ApiError> {
    let data = state
        .coordinator
        .counter_data(&params.cntr, params.start, params.stop, params.width)
        .await?;
    Ok(Json(data))
}

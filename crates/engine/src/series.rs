// Copyright 2026 Query Bridge Contributors
// SPDX-License-Identifier: Apache-2.0

//! Series output shape (spec §3 "Series output").

use serde::Serialize;

/// One rendered series: an aliased target name, timing metadata, and its
/// datapoint array.
#[derive(Debug, Clone, Serialize)]
pub struct Series {
    /// Rendered alias.
    pub target: String,
    /// Timing breakdown for this target's history request.
    pub time_measurements: TimeMeasurements,
    /// `[value, ms]` or `[ms, value]` pairs depending on
    /// `Target::order_time_value`; a `null` component stands for a
    /// sanitised-away non-finite value.
    pub datapoints: Vec<[serde_json::Value; 2]>,
}

/// Per-series timing breakdown (spec §3).
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TimeMeasurements {
    /// Wall-clock duration the backend itself measured, in seconds.
    pub db: f64,
    /// Wall-clock duration observed by the adapter for the whole request,
    /// in seconds.
    pub http: f64,
}

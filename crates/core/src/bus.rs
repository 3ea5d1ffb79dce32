// Copyright 2026 Query Bridge Contributors
// SPDX-License-Identifier: Apache-2.0

//! The client abstraction the adapter consumes for the metric bus.
//!
//! This crate never implements the bus wire protocol (spec §1 non-goal);
//! it only defines the trait and the request/response shapes callers need.
//! Concrete implementations (a real AMQP client, and an in-memory fake for
//! tests) live in their own crates.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::aggregate::{HistoryResponse, TimeAggregate};
use crate::error::Result;
use crate::time::{Duration, Timestamp};

/// A selector passed to a metric-listing call: either a single pattern or
/// an explicit list of metric names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricSelector {
    /// A single regex-like selector pattern.
    Pattern(String),
    /// An explicit list of metric names.
    List(Vec<String>),
}

/// Free-form metadata the bus associates with a metric (description, unit,
/// and whatever else the backend chooses to report).
pub type MetricMetadata = BTreeMap<String, serde_json::Value>;

/// The full argument tuple of a metric-listing call; also the cache key
/// for the metadata cache (spec §4.E).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GetMetricsParams {
    /// Selector or explicit metric list, if any.
    pub selector: Option<MetricSelector>,
    /// Infix substring match, if any (mutually exclusive with `selector`
    /// in practice, but the bus does not enforce that at this layer).
    pub infix: Option<String>,
    /// Maximum number of metrics to return.
    pub limit: Option<u32>,
    /// Whether to include per-metric metadata in the response.
    pub metadata: bool,
    /// Restrict to metrics with recorded history.
    pub historic: Option<bool>,
}

impl GetMetricsParams {
    /// Convenience constructor for a plain selector lookup with metadata
    /// requested and no other filters.
    pub fn selector(pattern: impl Into<String>) -> Self {
        Self {
            selector: Some(MetricSelector::Pattern(pattern.into())),
            infix: None,
            limit: None,
            metadata: true,
            historic: None,
        }
    }

    /// Convenience constructor for a metadata lookup of one or more exact
    /// metric names (spec §4.G metadata path, §4.F metadata fetch).
    pub fn metadata_for(metrics: Vec<String>) -> Self {
        Self {
            selector: Some(MetricSelector::List(metrics)),
            infix: None,
            limit: None,
            metadata: true,
            historic: None,
        }
    }
}

/// Whether a history request may return raw samples when the requested
/// window is dense enough, or must always return aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryMode {
    /// Backend may choose aggregates or raw values (spec glossary:
    /// FLEX_TIMELINE).
    FlexTimeline,
    /// Backend must return aggregates.
    AggregatesOnly,
}

/// Parameters for a windowed history request (spec §4.F step 1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRequestParams {
    /// Metric name.
    pub metric: String,
    /// Inclusive window start.
    pub start: Timestamp,
    /// Inclusive window end.
    pub end: Timestamp,
    /// Requested aggregation interval.
    pub interval: Duration,
    /// Aggregates-vs-raw negotiation mode.
    pub mode: HistoryMode,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// Parameters for a single-window full-range aggregate request (the
/// `/analyze` path, spec §4.G).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRequestParams {
    /// Metric name.
    pub metric: String,
    /// Inclusive window start.
    pub start: Timestamp,
    /// Inclusive window end.
    pub end: Timestamp,
}

/// The client abstraction for the metric bus (spec §1, §5): one long-lived,
/// concurrency-safe instance per process.
#[async_trait]
pub trait BusClient: Send + Sync {
    /// List metrics matching a selector/infix, optionally with metadata.
    async fn get_metrics(&self, params: GetMetricsParams) -> Result<BTreeMap<String, MetricMetadata>>;

    /// Request a windowed, possibly-aggregated history for one metric.
    /// Returns `Ok(None)` when the backend reports an explicitly empty
    /// response for the window (spec §7 "backend-empty", not an error). A
    /// backend timeout is a distinct case and must be reported as
    /// `Err(Error::NotFound(_))` instead, so callers can map it to a 404
    /// (spec §5/§7) rather than an empty result set.
    async fn history_data_request(
        &self,
        params: HistoryRequestParams,
    ) -> Result<Option<HistoryResponse>>;

    /// Request a single aggregate over a metric's full window (the
    /// `/analyze` path). Returns `Ok(None)` when the backend has nothing
    /// to report.
    async fn history_aggregate_request(
        &self,
        params: AggregateRequestParams,
    ) -> Result<Option<TimeAggregate>>;
}

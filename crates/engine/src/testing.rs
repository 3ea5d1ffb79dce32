// Copyright 2026 Query Bridge Contributors
// SPDX-License-Identifier: Apache-2.0

//! In-memory [`BusClient`] test double (spec SPEC_FULL §4.I component M).
//!
//! Used by this crate's own unit tests and by `services/query-api`'s
//! integration tests; it never touches a network.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use query_bridge_core::{
    AggregateRequestParams, BusClient, Error, GetMetricsParams, HistoryRequestParams,
    HistoryResponse, MetricMetadata, MetricSelector, Result, TimeAggregate,
};

/// A deterministic, in-memory stand-in for the metric bus.
#[derive(Default)]
pub struct FakeBusClient {
    metrics: BTreeMap<String, MetricMetadata>,
    history: BTreeMap<String, HistoryResponse>,
    aggregates: BTreeMap<String, TimeAggregate>,
    timeouts: HashSet<String>,
    get_metrics_calls: Option<Arc<AtomicUsize>>,
}

impl FakeBusClient {
    /// An empty fake with no registered metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a metric (with metadata) as known to this fake.
    pub fn with_metric(mut self, name: impl Into<String>, metadata: MetricMetadata) -> Self {
        self.metrics.insert(name.into(), metadata);
        self
    }

    /// Register the canned history response for a metric.
    pub fn with_history(mut self, metric: impl Into<String>, response: HistoryResponse) -> Self {
        self.history.insert(metric.into(), response);
        self
    }

    /// Register the canned full-window aggregate for a metric.
    pub fn with_aggregate(mut self, metric: impl Into<String>, aggregate: TimeAggregate) -> Self {
        self.aggregates.insert(metric.into(), aggregate);
        self
    }

    /// Make history requests for `metric` behave like a backend timeout
    /// (returns `Err(Error::NotFound)`, mirroring `LapinBusClient`'s own
    /// RPC-timeout mapping).
    pub fn with_timeout(mut self, metric: impl Into<String>) -> Self {
        self.timeouts.insert(metric.into());
        self
    }

    /// Wire up a shared counter incremented on every `get_metrics` call,
    /// for asserting single-flight behavior.
    pub fn with_get_metrics_counter(mut self, counter: Arc<AtomicUsize>) -> Self {
        self.get_metrics_calls = Some(counter);
        self
    }

    fn matches_pattern(name: &str, pattern: &str) -> bool {
        regex::Regex::new(&format!("^{pattern}$"))
            .map(|re| re.is_match(name))
            .unwrap_or(false)
    }
}

#[async_trait]
impl BusClient for FakeBusClient {
    async fn get_metrics(&self, params: GetMetricsParams) -> Result<BTreeMap<String, MetricMetadata>> {
        if let Some(counter) = &self.get_metrics_calls {
            counter.fetch_add(1, Ordering::SeqCst);
        }

        let mut selected: BTreeMap<String, MetricMetadata> = match &params.selector {
            Some(MetricSelector::Pattern(pattern)) => self
                .metrics
                .iter()
                .filter(|(name, _)| Self::matches_pattern(name, pattern))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            Some(MetricSelector::List(names)) => names
                .iter()
                .filter_map(|name| self.metrics.get(name).map(|m| (name.clone(), m.clone())))
                .collect(),
            None => match &params.infix {
                Some(infix) => self
                    .metrics
                    .iter()
                    .filter(|(name, _)| name.contains(infix.as_str()))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
                None => self.metrics.clone(),
            },
        };

        if let Some(limit) = params.limit {
            selected = selected.into_iter().take(limit as usize).collect();
        }
        if !params.metadata {
            for value in selected.values_mut() {
                value.clear();
            }
        }
        Ok(selected)
    }

    async fn history_data_request(
        &self,
        params: HistoryRequestParams,
    ) -> Result<Option<HistoryResponse>> {
        if self.timeouts.contains(&params.metric) {
            return Err(Error::not_found(format!("history request for '{}' timed out", params.metric)));
        }
        Ok(self.history.get(&params.metric).cloned())
    }

    async fn history_aggregate_request(
        &self,
        params: AggregateRequestParams,
    ) -> Result<Option<TimeAggregate>> {
        Ok(self.aggregates.get(&params.metric).cloned())
    }
}

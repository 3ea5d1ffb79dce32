// Copyright 2026 Query Bridge Contributors
// SPDX-License-Identifier: Apache-2.0

//! Metadata cache (spec §4.E): a process-wide, time-bounded memoisation of
//! metric-list and metric-metadata lookups, keyed by the full argument
//! tuple of the call. Concurrent callers for the same key share one
//! in-flight request.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use moka::future::Cache;
use query_bridge_core::{BusClient, Error, GetMetricsParams, MetricMetadata, Result};

const TTL: StdDuration = StdDuration::from_secs(10 * 60);

/// Time-bounded, single-flight memoisation of [`BusClient::get_metrics`]
/// calls.
///
/// Backed by `moka`'s async cache: `try_get_with` coalesces concurrent
/// misses for the same key into one loader invocation, and entries expire
/// 10 minutes after insertion regardless of how often they're read
/// (eviction is purely time-based, per spec §4.E).
pub struct MetadataCache {
    inner: Cache<GetMetricsParams, Arc<BTreeMap<String, MetricMetadata>>>,
}

impl MetadataCache {
    /// Build a new cache with the spec-mandated 10-minute TTL.
    pub fn new() -> Self {
        Self {
            inner: Cache::builder().time_to_live(TTL).build(),
        }
    }

    /// Look up `params`, deduplicating concurrent identical lookups and
    /// serving from cache within the TTL window.
    pub async fn get_metrics(
        &self,
        bus: &dyn BusClient,
        params: GetMetricsParams,
    ) -> Result<Arc<BTreeMap<String, MetricMetadata>>> {
        self.inner
            .try_get_with(params.clone(), async move {
                bus.get_metrics(params).await.map(Arc::new)
            })
            .await
            .map_err(|e: Arc<Error>| Error::upstream(e.to_string()))
    }
}

impl Default for MetadataCache {
    fn default() -> Self {
        Self::new()
    }
}

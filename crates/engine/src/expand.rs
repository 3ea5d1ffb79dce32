// Copyright 2026 Query Bridge Contributors
// SPDX-License-Identifier: Apache-2.0

//! Metric-pattern expansion (spec §4.D).

use query_bridge_core::{BusClient, GetMetricsParams, Result};

use crate::cache::MetadataCache;

/// Expand a pattern into the concrete metric names it selects.
///
/// If `pattern` contains both `(` and `)` it is treated as a back-end
/// selector and resolved via a cached `get_metrics` call (historic=true,
/// metadata=false); otherwise it is returned unchanged as a single-element
/// list. An empty expansion is not an error — the caller simply contributes
/// zero series for that target.
pub async fn expand_metric(
    bus: &dyn BusClient,
    cache: &MetadataCache,
    pattern: &str,
) -> Result<Vec<String>> {
    if pattern.contains('(') && pattern.contains(')') {
        let params = GetMetricsParams {
            selector: Some(query_bridge_core::MetricSelector::Pattern(pattern.to_string())),
            infix: None,
            limit: None,
            metadata: false,
            historic: Some(true),
        };
        let metrics = cache.get_metrics(bus, params).await?;
        Ok(metrics.keys().cloned().collect())
    } else {
        Ok(vec![pattern.to_string()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBusClient;

    #[tokio::test]
    async fn plain_pattern_passes_through() {
        let bus = FakeBusClient::new();
        let cache = MetadataCache::new();
        let out = expand_metric(&bus, &cache, "cpu.load").await.unwrap();
        assert_eq!(out, vec!["cpu.load".to_string()]);
    }

    #[tokio::test]
    async fn selector_pattern_expands_via_bus() {
        let bus = FakeBusClient::new().with_metric("cpu.a", Default::default())
            .with_metric("cpu.b", Default::default());
        let cache = MetadataCache::new();
        let mut out = expand_metric(&bus, &cache, "cpu.(a|b)").await.unwrap();
        out.sort();
        assert_eq!(out, vec!["cpu.a".to_string(), "cpu.b".to_string()]);
    }

    #[tokio::test]
    async fn empty_expansion_is_not_an_error() {
        let bus = FakeBusClient::new();
        let cache = MetadataCache::new();
        let out = expand_metric(&bus, &cache, "cpu.(nonexistent)").await.unwrap();
        assert!(out.is_empty());
    }
}

// Copyright 2026 Query Bridge Contributors
// SPDX-License-Identifier: Apache-2.0

//! Request coordinator (spec §4.G): parses inbound envelopes, expands
//! targets, fans out executors concurrently, and assembles the documented
//! response shapes for every endpoint in §6.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use futures::future::try_join_all;
use query_bridge_core::{
    AggregateRequestParams, BusClient, Duration, Error, Function, GetMetricsParams,
    MetricMetadata, MetricSelector, Result, Target, TargetDescriptor, Timestamp,
};
use serde::{Deserialize, Serialize};

use crate::cache::MetadataCache;
use crate::executor::execute_target;
use crate::expand::expand_metric;
use crate::series::Series;

const QUERY_TIMEOUT: Duration = Duration::from_secs(30);
const COUNTER_TIMEOUT: Duration = Duration::from_secs(5);

/// An inclusive wall-clock window, wire-encoded as ISO-8601 strings.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TimeRange {
    /// Window start.
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub from: Timestamp,
    /// Window end.
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub to: Timestamp,
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<Timestamp, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Timestamp::parse_iso8601(&raw).map_err(serde::de::Error::custom)
}

/// The shared envelope for `/query` and `/analyze` (spec §6).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryEnvelope {
    /// Requested targets, in declaration order.
    pub targets: Vec<TargetDescriptor>,
    /// Requested window.
    pub range: TimeRange,
    /// Client-supplied interval hint. Documented as unreliable (spec §4.G)
    /// and never used for the interval computation; kept only so the field
    /// round-trips for clients that send it.
    #[serde(default, alias = "interval_ms")]
    pub interval_ms: Option<u64>,
    /// Desired point density, used to derive the query interval.
    #[serde(alias = "max_data_points")]
    pub max_data_points: u64,
}

/// Timing breakdown for an `/analyze` record (spec §4.G: `{
/// time_measurements.http, ... }` — unlike a `Series`, there is no `db`
/// component here since a single-window aggregate request carries only
/// the adapter-observed wall-clock duration).
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AnalyzeTimeMeasurements {
    /// Adapter-observed wall-clock duration, in seconds.
    pub http: f64,
}

/// One `/analyze` result record, or `None` when the backend has nothing to
/// report for that metric.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeRecord {
    /// Rendered alias.
    pub target: String,
    /// Timing breakdown for this record.
    pub time_measurements: AnalyzeTimeMeasurements,
    /// Window minimum.
    pub minimum: f64,
    /// Window maximum.
    pub maximum: f64,
    /// Window sum.
    pub sum: f64,
    /// Sample count.
    pub count: u64,
    /// Time-weighted integral, in value-nanoseconds.
    pub integral_ns: f64,
    /// Active time, in nanoseconds.
    pub active_time_ns: i64,
    /// Arithmetic mean.
    pub mean: f64,
    /// Integral-weighted mean.
    pub mean_integral: f64,
}

/// The legacy `/legacy/counter_data.php` response shape.
#[derive(Debug, Clone, Serialize)]
pub struct CounterData {
    /// Metric description, empty string on a failed metadata lookup.
    pub description: String,
    /// Metric unit, empty string on a failed metadata lookup.
    pub unit: String,
    /// `(posix_ms, value)` pairs within `[start, stop]`.
    pub data: Vec<[serde_json::Value; 2]>,
}

/// Either a sorted metric-name list or a metric→metadata mapping, depending
/// on whether the `/search` caller requested metadata (spec §4.G).
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SearchResult {
    /// Sorted metric names (`metadata == false`).
    Names(Vec<String>),
    /// Metric→metadata mapping (`metadata == true`).
    Metadata(BTreeMap<String, MetricMetadata>),
}

/// Binds one bus client and metadata cache to the coordinator operations
/// the view façade (component H) calls into.
pub struct Coordinator {
    bus: Arc<dyn BusClient>,
    cache: MetadataCache,
}

impl Coordinator {
    /// Build a coordinator around a long-lived bus client handle.
    pub fn new(bus: Arc<dyn BusClient>) -> Self {
        Self { bus, cache: MetadataCache::new() }
    }

    /// `/query`: expand every target, fan out executors, concatenate
    /// series in target-order with each target's functions pre-sorted.
    pub async fn query(&self, envelope: QueryEnvelope) -> Result<Vec<Series>> {
        let started = Instant::now();
        let start = envelope.range.from;
        let end = envelope.range.to;
        let interval = query_interval(start, end, envelope.max_data_points);

        let expanded = self.expand_targets(&envelope.targets).await?;
        let tasks = expanded.into_iter().map(|(idx, descriptor, metric)| {
            let bus = Arc::clone(&self.bus);
            let cache = &self.cache;
            async move {
                let mut dto = descriptor;
                dto.metric = metric;
                let target = Target::from_object(dto)?;
                let series = execute_target(
                    bus.as_ref(),
                    cache,
                    &target,
                    start,
                    end,
                    interval,
                    QUERY_TIMEOUT,
                )
                .await?;
                Ok::<(usize, Vec<Series>), Error>((idx, series))
            }
        });

        let mut results = try_join_all(tasks).await?;
        results.sort_by_key(|(idx, _)| *idx);
        let out = results.into_iter().flat_map(|(_, series)| series).collect();

        self.log_duration("query", started.elapsed());
        Ok(out)
    }

    /// `/analyze`: same expansion as `/query`, but requests one full-window
    /// aggregate per metric instead of a windowed history.
    pub async fn analyze(&self, envelope: QueryEnvelope) -> Result<Vec<Option<AnalyzeRecord>>> {
        let started = Instant::now();
        let start = envelope.range.from;
        let end = envelope.range.to;

        let expanded = self.expand_targets(&envelope.targets).await?;
        let tasks = expanded.into_iter().map(|(idx, descriptor, metric)| {
            let bus = Arc::clone(&self.bus);
            let cache = &self.cache;
            async move {
                let mut dto = descriptor;
                dto.metric = metric.clone();
                let target = Target::from_object(dto)?;

                let metadata_fut = async {
                    if target.requires_metadata() {
                        cache
                            .get_metrics(bus.as_ref(), GetMetricsParams::metadata_for(vec![metric.clone()]))
                            .await
                            .ok()
                    } else {
                        None
                    }
                };
                let call_started = Instant::now();
                let aggregate_fut = bus.history_aggregate_request(AggregateRequestParams {
                    metric: metric.clone(),
                    start,
                    end,
                });
                let (aggregate, metadata) = tokio::join!(aggregate_fut, metadata_fut);
                let http = call_started.elapsed().as_secs_f64();

                let record = aggregate?.map(|agg| {
                    let md = metadata.and_then(|m| m.get(&metric).cloned());
                    AnalyzeRecord {
                        target: target.render_name(&Function::Avg, md.as_ref()),
                        time_measurements: AnalyzeTimeMeasurements { http },
                        minimum: agg.minimum,
                        maximum: agg.maximum,
                        sum: agg.sum,
                        count: agg.count,
                        integral_ns: agg.integral_ns,
                        active_time_ns: agg.active_time.ns(),
                        mean: agg.mean,
                        mean_integral: agg.mean_integral,
                    }
                });
                Ok::<(usize, Option<AnalyzeRecord>), Error>((idx, record))
            }
        });

        let mut results = try_join_all(tasks).await?;
        results.sort_by_key(|(idx, _)| *idx);
        let out = results.into_iter().map(|(_, record)| record).collect();

        self.log_duration("analyze", started.elapsed());
        Ok(out)
    }

    /// `/legacy/counter_data.php`: single metric, integer ms window and
    /// point width, datapoints clipped to `[start, stop]`.
    pub async fn counter_data(
        &self,
        metric: &str,
        start_ms: i64,
        stop_ms: i64,
        width: i64,
    ) -> Result<CounterData> {
        let started = Instant::now();
        let start = Timestamp::from_posix_ms(start_ms);
        let stop = Timestamp::from_posix_ms(stop_ms);
        let interval = Duration::from_ns((stop - start).ns() / width.max(1));

        let mut target = Target::from_legacy_string(metric)?;
        target.order_time_value = true;
        let base_metric = target.metric.clone();

        let series_fut =
            execute_target(self.bus.as_ref(), &self.cache, &target, start, stop, interval, COUNTER_TIMEOUT);
        let metadata_fut = self
            .cache
            .get_metrics(self.bus.as_ref(), GetMetricsParams::metadata_for(vec![base_metric.clone()]));

        let (series, metadata) = tokio::join!(series_fut, metadata_fut);
        let series = series?;

        let (description, unit) = metadata
            .ok()
            .and_then(|m| m.get(&base_metric).cloned())
            .map(|md| {
                (
                    string_field(&md, "description"),
                    string_field(&md, "unit"),
                )
            })
            .unwrap_or_default();

        let data = series
            .into_iter()
            .next()
            .map(|s| {
                s.datapoints
                    .into_iter()
                    .filter(|pair| {
                        pair[0]
                            .as_i64()
                            .map(|ms| ms >= start_ms && ms <= stop_ms)
                            .unwrap_or(false)
                    })
                    .collect()
            })
            .unwrap_or_default();

        self.log_duration("counter_data", started.elapsed());
        Ok(CounterData { description, unit, data })
    }

    /// `/legacy/cntr_status.php`: `[metric, description]` pairs, in the
    /// bus's natural (ascending) key order.
    pub async fn counter_status(&self, selector: &str) -> Result<Vec<(String, String)>> {
        let params = GetMetricsParams {
            selector: Some(MetricSelector::Pattern(selector.to_string())),
            infix: None,
            limit: None,
            metadata: true,
            historic: Some(true),
        };
        let metrics = self.bus.get_metrics(params).await?;
        Ok(metrics
            .into_iter()
            .map(|(name, md)| (name, string_field(&md, "description")))
            .collect())
    }

    /// `/search`: slash-wrapped selector or plain infix, metric names or
    /// metadata mapping depending on `metadata`.
    pub async fn search(&self, target: &str, metadata: bool, limit: Option<u32>) -> Result<SearchResult> {
        let params = if target.len() > 1 && target.starts_with('/') && target.ends_with('/') {
            GetMetricsParams {
                selector: Some(MetricSelector::Pattern(target[1..target.len() - 1].to_string())),
                infix: None,
                limit,
                metadata,
                historic: None,
            }
        } else {
            GetMetricsParams {
                selector: None,
                infix: Some(target.to_string()),
                limit: Some(limit.unwrap_or(100)),
                metadata,
                historic: None,
            }
        };

        let metrics = self.cache.get_metrics(self.bus.as_ref(), params).await?;
        if metadata {
            Ok(SearchResult::Metadata((*metrics).clone()))
        } else {
            let mut names: Vec<String> = metrics.keys().cloned().collect();
            names.sort();
            Ok(SearchResult::Names(names))
        }
    }

    /// `/metadata`: exact-match lookup, 404 (via [`Error::NotFound`]) when
    /// empty.
    pub async fn metadata(&self, metric: &str) -> Result<BTreeMap<String, MetricMetadata>> {
        let params = GetMetricsParams::metadata_for(vec![metric.to_string()]);
        let metrics = self.cache.get_metrics(self.bus.as_ref(), params).await?;
        if metrics.is_empty() {
            return Err(Error::not_found(format!("no metadata for metric '{metric}'")));
        }
        Ok((*metrics).clone())
    }

    async fn expand_targets(
        &self,
        targets: &[TargetDescriptor],
    ) -> Result<Vec<(usize, TargetDescriptor, String)>> {
        let mut expanded = Vec::new();
        for (idx, descriptor) in targets.iter().enumerate() {
            let metrics = expand_metric(self.bus.as_ref(), &self.cache, &descriptor.metric).await?;
            for metric in metrics {
                expanded.push((idx, descriptor.clone(), metric));
            }
        }
        Ok(expanded)
    }

    fn log_duration(&self, operation: &str, elapsed: std::time::Duration) {
        let seconds = elapsed.as_secs_f64();
        if seconds >= 1.0 {
            tracing::info!(operation, duration_s = seconds, "coordinator request completed");
        } else {
            tracing::debug!(operation, duration_s = seconds, "coordinator request completed");
        }
    }
}

fn string_field(metadata: &MetricMetadata, key: &str) -> String {
    metadata.get(key).and_then(|v| v.as_str()).unwrap_or_default().to_string()
}

/// `((end - start) / maxDataPoints) * 2`, the intentionally coarser
/// estimate used instead of the client-supplied `intervalMs` (spec §4.G).
fn query_interval(start: Timestamp, end: Timestamp, max_data_points: u64) -> Duration {
    let span_ns = (end - start).ns();
    let points = max_data_points.max(1) as i64;
    Duration::from_ns((span_ns / points) * 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBusClient;
    use query_bridge_core::{HistoryBody, HistoryResponse, TimeAggregate};

    fn bus_with_two_metrics() -> FakeBusClient {
        FakeBusClient::new()
            .with_metric("cpu.a", Default::default())
            .with_metric("cpu.b", Default::default())
            .with_history(
                "cpu.a",
                HistoryResponse {
                    body: HistoryBody::Aggregates(vec![TimeAggregate {
                        timestamp: Timestamp::from_posix_ms(1_000),
                        minimum: 1.0,
                        maximum: 1.0,
                        sum: 1.0,
                        count: 1,
                        integral_ns: 1_000_000_000.0,
                        active_time: Duration::from_secs(1),
                        mean: 1.0,
                        mean_integral: 1.0,
                    }]),
                    request_duration: 0.01,
                },
            )
            .with_history(
                "cpu.b",
                HistoryResponse {
                    body: HistoryBody::Aggregates(vec![TimeAggregate {
                        timestamp: Timestamp::from_posix_ms(1_000),
                        minimum: 2.0,
                        maximum: 2.0,
                        sum: 2.0,
                        count: 1,
                        integral_ns: 2_000_000_000.0,
                        active_time: Duration::from_secs(1),
                        mean: 2.0,
                        mean_integral: 2.0,
                    }]),
                    request_duration: 0.01,
                },
            )
    }

    #[tokio::test]
    async fn pattern_expansion_yields_two_series_in_expansion_order() {
        let bus = Arc::new(bus_with_two_metrics());
        let coordinator = Coordinator::new(bus);

        let envelope = QueryEnvelope {
            targets: vec![TargetDescriptor {
                metric: "cpu.(a|b)".to_string(),
                name: None,
                functions: vec!["avg".to_string()],
                scaling_factor: 1.0,
                sma_window: None,
            }],
            range: TimeRange {
                from: Timestamp::from_posix_ms(0),
                to: Timestamp::from_posix_ms(2_000),
            },
            interval_ms: None,
            max_data_points: 10,
        };

        let series = coordinator.query(envelope).await.unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].target, "cpu.a/avg");
        assert_eq!(series[1].target, "cpu.b/avg");
    }

    #[tokio::test]
    async fn metadata_path_errors_when_empty() {
        let bus = Arc::new(FakeBusClient::new());
        let coordinator = Coordinator::new(bus);
        let err = coordinator.metadata("missing.metric").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn counter_data_filters_to_inclusive_window() {
        let bus = FakeBusClient::new().with_history(
            "m1",
            HistoryResponse {
                body: HistoryBody::Aggregates(vec![
                    TimeAggregate {
                        timestamp: Timestamp::from_posix_ms(500),
                        minimum: 1.0,
                        maximum: 1.0,
                        sum: 1.0,
                        count: 1,
                        integral_ns: 1.0,
                        active_time: Duration::from_secs(1),
                        mean: 1.0,
                        mean_integral: 1.0,
                    },
                    TimeAggregate {
                        timestamp: Timestamp::from_posix_ms(1_500),
                        minimum: 2.0,
                        maximum: 2.0,
                        sum: 2.0,
                        count: 1,
                        integral_ns: 2.0,
                        active_time: Duration::from_secs(1),
                        mean: 2.0,
                        mean_integral: 2.0,
                    },
                    TimeAggregate {
                        timestamp: Timestamp::from_posix_ms(2_500),
                        minimum: 3.0,
                        maximum: 3.0,
                        sum: 3.0,
                        count: 1,
                        integral_ns: 3.0,
                        active_time: Duration::from_secs(1),
                        mean: 3.0,
                        mean_integral: 3.0,
                    },
                ]),
                request_duration: 0.01,
            },
        );
        let coordinator = Coordinator::new(Arc::new(bus));
        let result = coordinator.counter_data("m1", 1_000, 2_000, 10).await.unwrap();
        assert_eq!(result.data, vec![[serde_json::json!(1_500), serde_json::json!(2.0)]]);
    }
}

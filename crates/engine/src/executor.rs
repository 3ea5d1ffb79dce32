// Copyright 2026 Query Bridge Contributors
// SPDX-License-Identifier: Apache-2.0

//! Target executor (spec §4.F): drives one target's pipeline from a padded
//! window to a list of rendered [`Series`].

use std::time::Duration as StdDuration;
use std::time::Instant;

use query_bridge_core::{
    sanitize, BusClient, Duration, Error, Function, GetMetricsParams, HistoryBody, HistoryMode,
    HistoryRequestParams, Result, Target, Timestamp,
};

use crate::cache::MetadataCache;
use crate::series::{Series, TimeMeasurements};

/// Run one target's pipeline over `[start, end]` at the given interval.
///
/// A genuinely empty/null history response yields zero series, not an
/// error (spec §7 "backend-empty" is an empty result set). A bus timeout —
/// whether the local `tokio::time::timeout` elapsing or the bus client's
/// own reported timeout — surfaces as `Err(Error::NotFound(_))` per spec
/// §5/§7 ("a timeout from the bus surfaces as a 404"); any other bus error
/// propagates as-is. `timeout` is the per-request deadline (30s on the
/// query/analyze path, 5s on the legacy counter-data path).
pub async fn execute_target(
    bus: &dyn BusClient,
    cache: &MetadataCache,
    target: &Target,
    start: Timestamp,
    end: Timestamp,
    interval: Duration,
    timeout: Duration,
) -> Result<Vec<Series>> {
    let extension = target.window_extension();
    let history_params = HistoryRequestParams {
        metric: target.metric.clone(),
        start: start - extension,
        end: end + extension,
        interval,
        mode: HistoryMode::FlexTimeline,
        timeout,
    };

    let wants_metadata = target.requires_metadata();
    let metadata_fut = async {
        if !wants_metadata {
            return None;
        }
        cache
            .get_metrics(bus, GetMetricsParams::metadata_for(vec![target.metric.clone()]))
            .await
            .ok()
    };

    let deadline = StdDuration::from_nanos(timeout.ns().max(0) as u64);
    let started = Instant::now();
    let history_fut = tokio::time::timeout(deadline, bus.history_data_request(history_params));

    let (history_result, metadata) = tokio::join!(history_fut, metadata_fut);
    let http_time = started.elapsed().as_secs_f64();

    let response = match history_result {
        Ok(Ok(Some(response))) => response,
        Ok(Ok(None)) => return Ok(Vec::new()),
        Ok(Err(e)) => return Err(e),
        Err(_elapsed) => {
            return Err(Error::not_found(format!(
                "history request for '{}' timed out",
                target.metric
            )))
        }
    };
    if response.is_empty() {
        return Ok(Vec::new());
    }

    let metric_metadata = metadata.and_then(|m| m.get(&target.metric).cloned());

    let values_mode = matches!(response.body, HistoryBody::Values(_));
    let functions: Vec<Function> = if values_mode {
        vec![Function::Raw]
    } else {
        target.functions.clone()
    };

    Ok(functions
        .into_iter()
        .map(|f| render_series(target, &f, metric_metadata.as_ref(), &response, http_time))
        .collect())
}

fn render_series(
    target: &Target,
    f: &Function,
    metadata: Option<&query_bridge_core::MetricMetadata>,
    response: &query_bridge_core::HistoryResponse,
    http_time: f64,
) -> Series {
    let name = target.render_name(f, metadata);
    let datapoints = f
        .transform(response)
        .into_iter()
        .map(|(ts, v)| {
            let value = v
                .map(|v| v * target.scaling_factor)
                .and_then(sanitize)
                .and_then(serde_json::Number::from_f64)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null);
            let ms = serde_json::Value::from(ts.posix_ms());
            if target.order_time_value {
                [ms, value]
            } else {
                [value, ms]
            }
        })
        .collect();
    Series {
        target: name,
        time_measurements: TimeMeasurements { db: response.request_duration, http: http_time },
        datapoints,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use query_bridge_core::{HistoryResponse, TimeAggregate};
    use crate::testing::FakeBusClient;

    fn aggregate(ts_ms: i64, count: u64, mean: f64) -> TimeAggregate {
        TimeAggregate {
            timestamp: Timestamp::from_posix_ms(ts_ms),
            minimum: mean,
            maximum: mean,
            sum: mean * count as f64,
            count,
            integral_ns: mean * 1_000_000_000.0,
            active_time: Duration::from_secs(1),
            mean,
            mean_integral: mean,
        }
    }

    #[tokio::test]
    async fn simple_avg_query_yields_one_series_with_null_for_empty_interval() {
        let response = HistoryResponse {
            body: HistoryBody::Aggregates(vec![aggregate(300_000, 1, 2.0), aggregate(600_000, 0, 0.0)]),
            request_duration: 0.02,
        };
        let bus = FakeBusClient::new().with_history("m1", response);
        let cache = MetadataCache::new();
        let target = Target::from_object(
            serde_json::from_str(r#"{"metric":"m1"}"#).unwrap(),
        )
        .unwrap();

        let series = execute_target(
            &bus,
            &cache,
            &target,
            Timestamp::from_posix_ms(0),
            Timestamp::from_posix_ms(600_000),
            Duration::from_secs(60),
            Duration::from_secs(30),
        )
        .await
        .unwrap();

        assert_eq!(series.len(), 1);
        assert_eq!(series[0].target, "m1/avg");
        assert_eq!(
            series[0].datapoints,
            vec![
                [serde_json::json!(2.0), serde_json::json!(300_000)],
                [serde_json::Value::Null, serde_json::json!(600_000)],
            ]
        );
    }

    #[tokio::test]
    async fn values_mode_response_yields_single_raw_series() {
        let response = HistoryResponse {
            body: HistoryBody::Values(vec![
                query_bridge_core::RawSample { timestamp: Timestamp::from_posix_ms(0), value: 1.5 },
            ]),
            request_duration: 0.01,
        };
        let bus = FakeBusClient::new().with_history("m1", response);
        let cache = MetadataCache::new();
        let target = Target::from_object(
            serde_json::from_str(r#"{"metric":"m1","functions":["min","max"]}"#).unwrap(),
        )
        .unwrap();

        let series = execute_target(
            &bus,
            &cache,
            &target,
            Timestamp::from_posix_ms(0),
            Timestamp::from_posix_ms(1_000),
            Duration::from_secs(1),
            Duration::from_secs(30),
        )
        .await
        .unwrap();

        assert_eq!(series.len(), 1);
        assert_eq!(series[0].target, "m1/raw");
    }

    #[tokio::test]
    async fn missing_history_yields_no_series() {
        let bus = FakeBusClient::new();
        let cache = MetadataCache::new();
        let target = Target::from_object(
            serde_json::from_str(r#"{"metric":"m1"}"#).unwrap(),
        )
        .unwrap();

        let series = execute_target(
            &bus,
            &cache,
            &target,
            Timestamp::from_posix_ms(0),
            Timestamp::from_posix_ms(1_000),
            Duration::from_secs(1),
            Duration::from_secs(30),
        )
        .await
        .unwrap();

        assert!(series.is_empty());
    }

    #[tokio::test]
    async fn scaling_factor_multiplies_emitted_values() {
        let response = HistoryResponse {
            body: HistoryBody::Aggregates(vec![aggregate(1_000, 1, 10.0)]),
            request_duration: 0.01,
        };
        let bus = FakeBusClient::new().with_history("m1", response);
        let cache = MetadataCache::new();
        let target = Target::from_object(
            serde_json::from_str(r#"{"metric":"m1","scalingFactor":0.5}"#).unwrap(),
        )
        .unwrap();

        let series = execute_target(
            &bus,
            &cache,
            &target,
            Timestamp::from_posix_ms(0),
            Timestamp::from_posix_ms(1_000),
            Duration::from_secs(1),
            Duration::from_secs(30),
        )
        .await
        .unwrap();

        assert_eq!(series[0].datapoints[0][0], serde_json::json!(5.0));
    }

    #[tokio::test]
    async fn bus_timeout_surfaces_as_not_found_error() {
        let bus = FakeBusClient::new().with_timeout("m1");
        let cache = MetadataCache::new();
        let target = Target::from_object(
            serde_json::from_str(r#"{"metric":"m1"}"#).unwrap(),
        )
        .unwrap();

        let err = execute_target(
            &bus,
            &cache,
            &target,
            Timestamp::from_posix_ms(0),
            Timestamp::from_posix_ms(1_000),
            Duration::from_secs(1),
            Duration::from_secs(30),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, query_bridge_core::Error::NotFound(_)));
    }
}

// Copyright 2026 Query Bridge Contributors
// SPDX-License-Identifier: Apache-2.0

//! The aggregate/windowing function registry (spec §4.B).
//!
//! Each [`Function`] is a pure rewriter from a [`HistoryResponse`] to a
//! sequence of `(Timestamp, Option<f64>)` pairs — `None` stands in for a
//! sanitised-away or skipped value, never for "this function raised".

use std::fmt;

use crate::aggregate::HistoryResponse;
use crate::error::{Error, Result};
use crate::time::{Duration, Timestamp};

/// One requested aggregate or windowing transform.
///
/// `Raw` is never user-requestable (spec §4.B) — it is substituted by the
/// target executor when a history response turns out to be in VALUES mode.
#[derive(Debug, Clone, PartialEq)]
pub enum Function {
    /// Sample count per interval.
    Count,
    /// Interval maximum.
    Max,
    /// Interval mean.
    Avg,
    /// Interval minimum.
    Min,
    /// Unmodified raw samples (VALUES-mode substitute for aggregates).
    Raw,
    /// Time-weighted moving average over the given window.
    MovingAverage(Duration),
}

impl Function {
    /// Canonical ordering key used to sort a target's function list
    /// (spec §3 Function invariant): Count=0, Max=1, Avg=Raw=2, Min=3,
    /// MovingAverage=4.
    pub fn order_key(&self) -> u8 {
        match self {
            Function::Count => 0,
            Function::Max => 1,
            Function::Avg | Function::Raw => 2,
            Function::Min => 3,
            Function::MovingAverage(_) => 4,
        }
    }

    /// The function's associated interval: zero for everything except
    /// `MovingAverage`, whose interval is its window.
    pub fn interval(&self) -> Duration {
        match self {
            Function::MovingAverage(window) => *window,
            _ => Duration::ZERO,
        }
    }

    /// Wire/display name, also used as the `$function` template
    /// substitution (spec §4.F).
    pub fn name(&self) -> &'static str {
        match self {
            Function::Count => "count",
            Function::Max => "max",
            Function::Avg => "avg",
            Function::Min => "min",
            Function::Raw => "raw",
            Function::MovingAverage(_) => "sma",
        }
    }

    /// Apply this function's transform contract to a history response.
    pub fn transform(&self, response: &HistoryResponse) -> Vec<(Timestamp, Option<f64>)> {
        match self {
            Function::Avg => transform_simple(response, |ta| ta.mean),
            Function::Min => transform_simple(response, |ta| ta.minimum),
            Function::Max => transform_simple(response, |ta| ta.maximum),
            Function::Count => transform_count(response),
            Function::Raw => transform_raw(response),
            Function::MovingAverage(window) => transform_moving_average(*window, response),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn transform_simple(
    response: &HistoryResponse,
    pick: impl Fn(&crate::aggregate::TimeAggregate) -> f64,
) -> Vec<(Timestamp, Option<f64>)> {
    let Some(aggregates) = response.aggregates() else {
        return Vec::new();
    };
    aggregates
        .iter()
        .map(|ta| {
            if ta.is_empty() {
                (ta.timestamp, None)
            } else {
                (ta.timestamp, Some(pick(ta)))
            }
        })
        .collect()
}

fn transform_count(response: &HistoryResponse) -> Vec<(Timestamp, Option<f64>)> {
    let Some(aggregates) = response.aggregates() else {
        return Vec::new();
    };
    aggregates
        .iter()
        .map(|ta| {
            if ta.is_empty() {
                (ta.timestamp, None)
            } else {
                (ta.timestamp, Some(ta.count as f64))
            }
        })
        .collect()
}

fn transform_raw(response: &HistoryResponse) -> Vec<(Timestamp, Option<f64>)> {
    let Some(values) = response.values() else {
        return Vec::new();
    };
    values.iter().map(|s| (s.timestamp, Some(s.value))).collect()
}

/// Interval durations used by the moving-average window: `t[k] - t[k-1]`
/// for `k >= 1`, `0` for `k == 0` (LAST semantics — see spec §4.B).
fn interval_durations(aggregates: &[crate::aggregate::TimeAggregate]) -> Vec<Duration> {
    let mut out = Vec::with_capacity(aggregates.len());
    out.push(Duration::ZERO);
    for pair in aggregates.windows(2) {
        let duration = pair[1].timestamp - pair[0].timestamp;
        debug_assert!(duration > Duration::ZERO, "history response must be strictly monotonic");
        out.push(duration);
    }
    out
}

fn transform_moving_average(
    window: Duration,
    response: &HistoryResponse,
) -> Vec<(Timestamp, Option<f64>)> {
    let Some(aggregates) = response.aggregates() else {
        return Vec::new();
    };
    if aggregates.is_empty() {
        return Vec::new();
    }

    let durations = interval_durations(aggregates);

    let mut ma_integral: f64 = 0.0;
    let mut ma_active_time_ns: f64 = 0.0;
    let mut begin_index = 1usize;
    let mut begin_time = aggregates[0].timestamp;
    let mut end_index = 1usize;
    let mut end_time = aggregates[0].timestamp;

    let mut out = Vec::new();

    for (i, ta) in aggregates.iter().enumerate() {
        let current_interval_duration = durations[i];
        let outside_duration = {
            let d = window - current_interval_duration;
            if d > Duration::ZERO {
                d
            } else {
                Duration::ZERO
            }
        };
        let seek_begin_time = ta.timestamp - current_interval_duration - outside_duration / 2;
        let seek_end_time = ta.timestamp + outside_duration / 2;

        // Slide the left edge of the window forward to seek_begin_time,
        // scaling out partial contributions from the interval it leaves.
        while begin_time < seek_begin_time {
            let next_step_time = aggregates[begin_index].timestamp.min(seek_begin_time);
            let step_duration = next_step_time - begin_time;
            let scale = step_duration.ratio(durations[begin_index]);
            ma_active_time_ns -= aggregates[begin_index].active_time.ns() as f64 * scale;
            ma_integral -= aggregates[begin_index].integral_ns * scale;

            begin_time = next_step_time;
            if begin_time == aggregates[begin_index].timestamp {
                begin_index += 1;
            }
        }

        // Slide the right edge forward to seek_end_time, scaling in
        // partial contributions from the interval it enters.
        while end_time < seek_end_time && end_index < aggregates.len() {
            let next_step_time = aggregates[end_index].timestamp.min(seek_end_time);
            let step_duration = next_step_time - end_time;
            let scale = step_duration.ratio(durations[end_index]);
            ma_active_time_ns += aggregates[end_index].active_time.ns() as f64 * scale;
            ma_integral += aggregates[end_index].integral_ns * scale;

            end_time = next_step_time;
            if end_time == aggregates[end_index].timestamp {
                end_index += 1;
            }
        }

        if seek_begin_time != begin_time || seek_end_time != end_time {
            continue; // window not fully covered at this interval
        }
        if ma_active_time_ns == 0.0 {
            continue;
        }

        out.push((ta.timestamp, Some(ma_integral / ma_active_time_ns)));
    }

    out
}

/// Build the function list for a target from requested names plus an
/// optional `sma` window string (spec §4.B dispatch table). Unknown names
/// are a hard error; a missing/invalid `sma` window is silently dropped.
pub fn construct_functions(names: &[String], sma_window: Option<&str>) -> Result<Vec<Function>> {
    let mut functions = Vec::with_capacity(names.len());
    for name in names {
        match name.as_str() {
            "avg" => functions.push(Function::Avg),
            "min" => functions.push(Function::Min),
            "max" => functions.push(Function::Max),
            "count" => functions.push(Function::Count),
            "sma" => {
                if let Some(window) = sma_window.and_then(|w| Duration::parse(w).ok()) {
                    functions.push(Function::MovingAverage(window));
                }
            }
            other => return Err(Error::unknown_function(other)),
        }
    }
    functions.sort_by_key(Function::order_key);
    Ok(functions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{HistoryBody, RawSample, TimeAggregate};

    fn aggregate(ts_ms: i64, count: u64, mean: f64, integral_ns: f64, active_ns: i64) -> TimeAggregate {
        TimeAggregate {
            timestamp: Timestamp::from_posix_ms(ts_ms),
            minimum: mean,
            maximum: mean,
            sum: mean * count as f64,
            count,
            integral_ns,
            active_time: Duration::from_ns(active_ns),
            mean,
            mean_integral: if active_ns == 0 { 0.0 } else { integral_ns / active_ns as f64 },
        }
    }

    #[test]
    fn unknown_function_name_is_an_error() {
        let err = construct_functions(&["bogus".to_string()], None).unwrap_err();
        assert!(matches!(err, Error::UnknownFunction(ref n) if n == "bogus"));
    }

    #[test]
    fn functions_sort_by_ordering_key() {
        let names = vec!["min".to_string(), "max".to_string(), "avg".to_string(), "count".to_string()];
        let functions = construct_functions(&names, None).unwrap();
        let keys: Vec<u8> = functions.iter().map(Function::order_key).collect();
        assert_eq!(keys, vec![0, 1, 2, 3]);
    }

    #[test]
    fn sma_without_window_is_silently_dropped() {
        let functions = construct_functions(&["avg".to_string(), "sma".to_string()], None).unwrap();
        assert_eq!(functions, vec![Function::Avg]);
    }

    #[test]
    fn sma_with_invalid_window_is_silently_dropped() {
        let functions =
            construct_functions(&["sma".to_string()], Some("not-a-duration")).unwrap();
        assert!(functions.is_empty());
    }

    #[test]
    fn avg_yields_null_for_empty_intervals() {
        let response = HistoryResponse {
            body: HistoryBody::Aggregates(vec![
                aggregate(0, 1, 2.0, 0.0, 0),
                aggregate(5_000, 0, 0.0, 0.0, 0),
            ]),
            request_duration: 0.01,
        };
        let out = Function::Avg.transform(&response);
        assert_eq!(out, vec![
            (Timestamp::from_posix_ms(0), Some(2.0)),
            (Timestamp::from_posix_ms(5_000), None),
        ]);
    }

    #[test]
    fn raw_passes_samples_through_unchanged() {
        let response = HistoryResponse {
            body: HistoryBody::Values(vec![
                RawSample { timestamp: Timestamp::from_posix_ms(0), value: 1.5 },
                RawSample { timestamp: Timestamp::from_posix_ms(1_000), value: 2.5 },
            ]),
            request_duration: 0.01,
        };
        let out = Function::Raw.transform(&response);
        assert_eq!(out, vec![
            (Timestamp::from_posix_ms(0), Some(1.5)),
            (Timestamp::from_posix_ms(1_000), Some(2.5)),
        ]);
    }

    #[test]
    fn moving_average_of_constant_stream_is_that_constant() {
        // 30 one-second intervals of constant value 5, sma window 10s.
        let mut aggregates = Vec::new();
        for i in 0..30 {
            let ts_ms = (i + 1) * 1_000;
            aggregates.push(aggregate(ts_ms, 1, 5.0, 5.0 * 1_000_000_000.0, 1_000_000_000));
        }
        let response = HistoryResponse {
            body: HistoryBody::Aggregates(aggregates),
            request_duration: 0.01,
        };
        let out = Function::MovingAverage(Duration::from_secs(10)).transform(&response);

        // Leading/trailing points where the window isn't fully covered are
        // skipped; interior points equal 5.0 within floating tolerance.
        assert!(out.len() < 30);
        for (_, v) in &out {
            let v = v.expect("fully covered interval should not be null");
            assert!((v - 5.0).abs() < 1e-9);
        }
    }
}

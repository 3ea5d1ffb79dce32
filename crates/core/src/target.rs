// Copyright 2026 Query Bridge Contributors
// SPDX-License-Identifier: Apache-2.0

//! Target parsing (spec §4.C): the object form used by `/query` and
//! `/analyze`, and the legacy alias-wrapped string form used by the
//! counter endpoints.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::bus::MetricMetadata;
use crate::error::{Error, Result};
use crate::function::{construct_functions, Function};
use crate::template::{referenced_tokens, safe_substitute};
use crate::time::Duration;

/// The default alias template applied when a target specifies none.
pub const DEFAULT_NAME_TEMPLATE: &str = "$metric/$function";

/// A parsed, ready-to-execute target (spec §3 data model).
///
/// Invariant: `functions` is non-empty and sorted by [`Function::order_key`].
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    /// The metric to query.
    pub metric: String,
    /// Alias template, safe-substituted at render time.
    pub name: String,
    /// Requested functions, already sorted.
    pub functions: Vec<Function>,
    /// Multiplier applied to every emitted numeric value.
    pub scaling_factor: f64,
    /// Datapoint tuple order: `(ms, value)` when true, `(value, ms)`
    /// otherwise.
    pub order_time_value: bool,
    /// Fallback values for metadata keys referenced by `name` but possibly
    /// absent from the metric's metadata (e.g. `description`).
    pub metadata_defaults: BTreeMap<String, String>,
}

impl Target {
    /// Whether rendering this target's name needs metadata beyond
    /// `$metric`/`$function` (spec §4.F step 2).
    pub fn requires_metadata(&self) -> bool {
        referenced_tokens(&self.name)
            .iter()
            .any(|t| t != "metric" && t != "function")
    }

    /// The additional window padding this target needs on either side of
    /// the requested range (spec §4.F step 1): half of the widest
    /// function interval.
    pub fn window_extension(&self) -> Duration {
        let widest = self
            .functions
            .iter()
            .map(Function::interval)
            .max()
            .unwrap_or(Duration::ZERO);
        widest / 2
    }

    /// Render this target's alias for one of its functions, given the
    /// metadata fetched for its metric (if any).
    pub fn render_name(&self, function: &Function, metadata: Option<&MetricMetadata>) -> String {
        let mut vars: BTreeMap<String, String> = self.metadata_defaults.clone();
        if let Some(metadata) = metadata {
            for (k, v) in metadata {
                vars.insert(k.clone(), metadata_value_to_string(v));
            }
        }
        vars.insert("metric".to_string(), self.metric.clone());
        vars.insert("function".to_string(), function.name().to_string());
        safe_substitute(&self.name, &vars)
    }

    /// Parse the object form used by `/query` and `/analyze` targets.
    pub fn from_object(dto: TargetDescriptor) -> Result<Self> {
        let mut functions = construct_functions(&dto.functions, dto.sma_window.as_deref())?;
        if functions.is_empty() {
            functions.push(Function::Avg);
        }
        Ok(Target {
            metric: dto.metric,
            name: dto.name.unwrap_or_else(|| DEFAULT_NAME_TEMPLATE.to_string()),
            functions,
            scaling_factor: dto.scaling_factor,
            order_time_value: false,
            metadata_defaults: BTreeMap::new(),
        })
    }

    /// Parse the legacy alias-wrapped string form used by the counter
    /// endpoints (spec §4.C).
    pub fn from_legacy_string(input: &str) -> Result<Self> {
        let stripped = strip_alias_wrapper(input)?;
        let (metric_and_suffix, name, metadata_defaults, forced_function) = stripped;

        let (metric, explicit_function_names) = split_trailing_function(&metric_and_suffix);

        let functions = if let Some(forced) = forced_function {
            match explicit_function_names {
                Some(names) => construct_functions(&names, None)?,
                None => vec![forced],
            }
        } else {
            let names = explicit_function_names.unwrap_or_else(|| vec!["avg".to_string()]);
            construct_functions(&names, None)?
        };
        let functions = if functions.is_empty() { vec![Function::Avg] } else { functions };

        Ok(Target {
            metric,
            name,
            functions,
            scaling_factor: 1.0,
            order_time_value: false,
            metadata_defaults,
        })
    }
}

fn metadata_value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Raw JSON shape of an object-form target (spec §4.C).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetDescriptor {
    /// Metric name.
    pub metric: String,
    /// Optional alias template; defaults to [`DEFAULT_NAME_TEMPLATE`].
    #[serde(default)]
    pub name: Option<String>,
    /// Requested function names; defaults to `["avg"]`.
    #[serde(default = "default_function_names")]
    pub functions: Vec<String>,
    /// Scaling factor, accepting both the camelCase and snake_case keys.
    #[serde(alias = "scaling_factor", default = "default_scaling_factor")]
    pub scaling_factor: f64,
    /// Moving-average window, accepting both key spellings.
    #[serde(alias = "sma_window", default)]
    pub sma_window: Option<String>,
}

fn default_function_names() -> Vec<String> {
    vec!["avg".to_string()]
}

fn default_scaling_factor() -> f64 {
    1.0
}

/// Slash-separated trailing aggregate-type suffix, e.g. `/max` or
/// `/(min|max|avg)` (spec §4.C). Returns the bare metric and, if a suffix
/// was present, the explicit function name list it selects.
fn split_trailing_function(s: &str) -> (String, Option<Vec<String>>) {
    match s.rfind('/') {
        Some(idx) => {
            let metric = &s[..idx];
            let suffix = &s[idx + 1..];
            match parse_multi_type(suffix) {
                Some(names) => (metric.to_string(), Some(names)),
                None => (metric.to_string(), Some(vec![suffix.to_string()])),
            }
        }
        None => (s.to_string(), None),
    }
}

fn parse_multi_type(suffix: &str) -> Option<Vec<String>> {
    let inner = suffix.strip_prefix('(')?.strip_suffix(')')?;
    let parts: Vec<String> = inner.split('|').map(str::to_string).collect();
    if !parts.is_empty() && parts.iter().all(|p| matches!(p.as_str(), "min" | "max" | "avg")) {
        Some(parts)
    } else {
        None
    }
}

type StrippedWrapper = (String, String, BTreeMap<String, String>, Option<Function>);

/// Strip a legacy alias wrapper, returning `(metric_and_suffix, name
/// template, metadata defaults, forced moving-average function)`.
fn strip_alias_wrapper(input: &str) -> Result<StrippedWrapper> {
    const ALIAS: &str = "alias(";
    const BY_METRIC: &str = "aliasByMetric(";
    const BY_DESC: &str = "aliasByDescription(";
    const BY_METRIC_DESC: &str = "aliasByMetricAndDescription(";
    const MOVING_AVG: &str = "movingAverageWithAlias(";

    if let Some(inner) = unwrap(input, ALIAS) {
        let (metric, text) = split_first_comma(inner)
            .ok_or_else(|| Error::malformed(format!("malformed alias() target '{input}'")))?;
        return Ok((metric.trim().to_string(), text.trim().to_string(), BTreeMap::new(), None));
    }
    if let Some(inner) = unwrap(input, BY_METRIC) {
        let metric_and_suffix = inner.trim().to_string();
        let (metric, _) = split_trailing_function(&metric_and_suffix);
        let name = format!("{}/$function", metric.replace('.', "/"));
        return Ok((metric_and_suffix, name, BTreeMap::new(), None));
    }
    if let Some(inner) = unwrap(input, BY_DESC) {
        let metric_and_suffix = inner.trim().to_string();
        let mut defaults = BTreeMap::new();
        defaults.insert("description".to_string(), "No description found".to_string());
        return Ok((metric_and_suffix, "$description".to_string(), defaults, None));
    }
    if let Some(inner) = unwrap(input, BY_METRIC_DESC) {
        let metric_and_suffix = inner.trim().to_string();
        let (metric, _) = split_trailing_function(&metric_and_suffix);
        let mut defaults = BTreeMap::new();
        defaults.insert("description".to_string(), "No description found".to_string());
        let name = format!("{}/$function ($description)", metric.replace('.', "/"));
        return Ok((metric_and_suffix, name, defaults, None));
    }
    if let Some(inner) = unwrap(input, MOVING_AVG) {
        let parts: Vec<&str> = inner.split(',').collect();
        if parts.len() < 3 {
            return Err(Error::malformed(format!(
                "malformed movingAverageWithAlias() target '{input}'"
            )));
        }
        let metric = parts[0].trim().to_string();
        let window_str = parts[parts.len() - 1].trim();
        let text = parts[1..parts.len() - 1].join(",").trim().to_string();
        let window = Duration::parse(window_str)?;
        return Ok((metric, text, BTreeMap::new(), Some(Function::MovingAverage(window))));
    }

    Ok((input.to_string(), DEFAULT_NAME_TEMPLATE.to_string(), BTreeMap::new(), None))
}

fn unwrap<'a>(input: &'a str, prefix: &str) -> Option<&'a str> {
    if input.starts_with(prefix) && input.ends_with(')') {
        Some(&input[prefix.len()..input.len() - 1])
    } else {
        None
    }
}

fn split_first_comma(s: &str) -> Option<(&str, &str)> {
    let idx = s.find(',')?;
    Some((&s[..idx], &s[idx + 1..]))
}

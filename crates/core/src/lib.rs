// Copyright 2026 Query Bridge Contributors
// SPDX-License-Identifier: Apache-2.0

//! Core domain types for the query-bridge adapter.
//!
//! This crate holds the data model and pure-function layer shared by the
//! engine and the HTTP service: timestamps and durations, interval
//! aggregates, the function registry, target parsing, and the `BusClient`
//! trait the rest of the workspace programs against.

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod aggregate;
pub mod bus;
pub mod error;
pub mod function;
pub mod sanitize;
pub mod target;
pub mod template;
pub mod time;

pub use aggregate::{HistoryBody, HistoryResponse, RawSample, TimeAggregate};
pub use bus::{
    AggregateRequestParams, BusClient, GetMetricsParams, HistoryMode, HistoryRequestParams,
    MetricMetadata, MetricSelector,
};
pub use error::{Error, Result};
pub use function::Function;
pub use sanitize::sanitize;
pub use target::{Target, TargetDescriptor};
pub use time::{Duration, Timestamp};

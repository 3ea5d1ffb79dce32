// Copyright 2026 Query Bridge Contributors
// SPDX-License-Identifier: Apache-2.0

//! Query planning, fan-out, and aggregate-transformation engine.
//!
//! This crate implements spec components D–G: the metadata cache, the
//! metric-pattern expander, the per-target executor, and the request
//! coordinator that fans out across a query's targets.

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod cache;
pub mod coordinator;
pub mod executor;
pub mod expand;
pub mod series;
pub mod testing;

pub use cache::MetadataCache;
pub use coordinator::{
    AnalyzeRecord, AnalyzeTimeMeasurements, Coordinator, CounterData, QueryEnvelope, SearchResult,
    TimeRange,
};
pub use executor::execute_target;
pub use expand::expand_metric;
pub use series::{Series, TimeMeasurements};

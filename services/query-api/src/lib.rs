// Copyright 2026 Query Bridge Contributors
// SPDX-License-Identifier: Apache-2.0

//! HTTP view façade bridging a simple-json dashboard client to the
//! query-bridge engine (spec §4.H, §6).

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod errors;
pub mod models;
pub mod routes;

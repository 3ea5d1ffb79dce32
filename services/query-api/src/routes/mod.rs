// Copyright 2026 Query Bridge Contributors
// SPDX-License-Identifier: Apache-2.0

//! View façade (spec §4.H): thin adapters from HTTP envelope to
//! [`query_bridge_engine::Coordinator`] calls.

pub mod discover;
pub mod health;
pub mod legacy;
pub mod query;

// Copyright 2026 Query Bridge Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy shared by the engine, bus client, and HTTP service.
//!
//! Kinds map onto spec §7: *client-malformed* → 400, *not-found* → 404,
//! *unsupported-function* → 400, *backend-unavailable* is handled above
//! this type (process exit), not as a variant here.

/// Result type alias using this crate's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by target parsing, function construction, and the bus
/// client abstraction.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed request envelope or target (bad JSON, missing keys, value
    /// conversion failure). Maps to HTTP 400.
    #[error("malformed request: {0}")]
    Malformed(String),

    /// A requested function name is not in the registry (spec §4.B).
    /// Maps to HTTP 400.
    #[error("unknown function '{0}' requested")]
    UnknownFunction(String),

    /// The bus reported a timeout, or a metric/metadata lookup came back
    /// empty when a result was required. Maps to HTTP 404.
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other failure reported by the bus client. Maps to HTTP 400 per
    /// spec §5 ("all other back-end errors surface as 400").
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Serialization/deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Build a [`Error::Malformed`].
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }

    /// Build a [`Error::UnknownFunction`].
    pub fn unknown_function(name: impl Into<String>) -> Self {
        Self::UnknownFunction(name.into())
    }

    /// Build a [`Error::NotFound`].
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Build a [`Error::Upstream`].
    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }
}

// SPDX-FileCopyrightText: 2026 Burrow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Burrow persistence engine.

use thiserror::Error;

/// The primary error type returned by storage operations and the persistence controller.
///
/// Read paths never surface these to callers (they resolve to empty results);
/// write paths return them as the failure signal.
#[derive(Debug, Error)]
pub enum BurrowError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (query failure, constraint violation, I/O).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The store is not open, failed to open, or was closed mid-operation.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// A bulk id-delete could not complete and was rolled back in full.
    #[error("bulk delete of {requested} ids rolled back: {reason}")]
    PartialBatchFailure { requested: usize, reason: String },

    /// One or more messages listed for an upload already belong to an open upload.
    #[error("messages already claimed by an open upload: {message_ids:?}")]
    AlreadyClaimed { message_ids: Vec<i64> },

    /// A stored row could not be decoded into its record type.
    #[error("failed to decode {table} row {id}: {reason}")]
    Serialization {
        table: &'static str,
        id: i64,
        reason: String,
    },

    /// A record builder rejected its input.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Typed construction failures raised by record builders.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("invalid url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unsupported http method `{0}`")]
    UnsupportedMethod(String),

    #[error("timestamp must be finite and non-negative, got {0}")]
    InvalidTimestamp(f64),
}

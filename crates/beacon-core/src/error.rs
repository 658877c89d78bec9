// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Beacon SMS dispatcher.
//!
//! `BeaconError` covers infrastructure failures only. Expected domain outcomes
//! (rate limiting, compliance rejection, provider failures) are modelled as
//! values in [`crate::types`].

use thiserror::Error;

/// The primary error type used across Beacon adapter traits and core operations.
#[derive(Debug, Error)]
pub enum BeaconError {
    /// Configuration errors (invalid TOML, missing required fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, row decoding).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// SMS provider errors that are not part of a dispatch outcome
    /// (client construction, health checks).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A requested entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl BeaconError {
    /// Wrap any error as a storage failure.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        BeaconError::Storage {
            source: Box::new(err),
        }
    }
}

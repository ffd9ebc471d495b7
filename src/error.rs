// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error types for the registry throttle.

use std::time::Duration;
use thiserror::Error;

/// Errors raised by the admission gate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("Invalid capacity: must admit at least one call per window")]
    InvalidCapacity,

    #[error("Invalid window: duration must be greater than zero")]
    InvalidWindow,

    #[error("Admission cancelled before a slot was granted")]
    Cancelled,

    #[error("Admission timed out after {waited:?}")]
    TimedOut { waited: Duration },

    #[error("Failed to register gate metrics: {0}")]
    Metrics(String),
}

impl From<prometheus::Error> for GateError {
    fn from(err: prometheus::Error) -> Self {
        GateError::Metrics(err.to_string())
    }
}

impl GateError {
    /// Whether this error came from gate construction.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::InvalidCapacity | Self::InvalidWindow)
    }
}

/// Errors raised while sending a document to the registry.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Invalid registry endpoint {url}: {source}")]
    InvalidEndpoint {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors returned by [`crate::client::RegistryClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Gate(#[from] GateError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ClientError>;

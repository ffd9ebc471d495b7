// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Registry Throttle
//!
//! Client-side throttling for document submissions to the registry API:
//!
//! - Sliding-window admission gate (at most N calls per rolling window)
//! - Callers are delayed in arrival order, never rejected
//! - Cancellable waits that leave the gate untouched
//! - HTTP submission transport (base64 payload, bearer auth)
//! - Per-gate Prometheus metrics

pub mod client;
pub mod config;
pub mod error;
pub mod gate;
pub mod metrics;
pub mod transport;

pub use client::RegistryClient;
pub use config::Config;
pub use error::{ClientError, GateError, TransportError};
pub use gate::{Admission, AdmissionGate};
pub use transport::{DocumentRequest, DocumentType, HttpTransport, ProductGroup, SubmissionTransport};

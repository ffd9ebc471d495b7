// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Registry client: admission first, then exactly one transport call.

use crate::config::Config;
use crate::error::{ClientError, Result};
use crate::gate::AdmissionGate;
use crate::transport::{DocumentRequest, HttpTransport, SubmissionTransport};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// Throttled client for the registry document API.
pub struct RegistryClient<T> {
    gate: Arc<AdmissionGate>,
    transport: T,
}

impl RegistryClient<HttpTransport> {
    /// Build a client with its own gate and an HTTP transport.
    pub fn from_config(config: &Config) -> Result<Self> {
        let gate = AdmissionGate::from_config(&config.throttle)?;
        let transport = HttpTransport::new(&config.registry)?;
        Ok(Self::new(Arc::new(gate), transport))
    }
}

impl<T: SubmissionTransport> RegistryClient<T> {
    /// Pass the same `gate` to several clients to have them share one limit.
    pub fn new(gate: Arc<AdmissionGate>, transport: T) -> Self {
        Self { gate, transport }
    }

    pub fn gate(&self) -> &Arc<AdmissionGate> {
        &self.gate
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Create a document, waiting for a free slot first.
    pub async fn create_document(&self, request: &DocumentRequest) -> Result<String> {
        let admission = self.gate.acquire().await;
        debug!(
            admitted_at = %admission.timestamp,
            waited_ms = admission.waited.as_millis() as u64,
            product_group = %request.product_group,
            "Slot granted for document submission"
        );
        self.send(request).await
    }

    /// Like [`create_document`](Self::create_document), but abandons the wait
    /// when `cancel` completes first. The transport is not called in that case.
    pub async fn create_document_with_cancel<F>(
        &self,
        request: &DocumentRequest,
        cancel: F,
    ) -> Result<String>
    where
        F: Future<Output = ()>,
    {
        let admission = self.gate.acquire_with_cancel(cancel).await.map_err(|e| {
            warn!(product_group = %request.product_group, "Document submission cancelled");
            ClientError::from(e)
        })?;
        debug!(
            admitted_at = %admission.timestamp,
            waited_ms = admission.waited.as_millis() as u64,
            "Slot granted for document submission"
        );
        self.send(request).await
    }

    async fn send(&self, request: &DocumentRequest) -> Result<String> {
        self.transport.submit(request).await.map_err(|e| {
            warn!(error = %e, "Document submission failed");
            ClientError::Transport(e)
        })
    }
}

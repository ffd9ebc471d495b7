// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus instrumentation for a single admission gate.
//!
//! Each gate owns its own [`Registry`], so two gates never share counters.

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};
use std::time::Duration;

/// Collectors updated by [`crate::gate::AdmissionGate`].
#[derive(Clone)]
pub struct GateMetrics {
    registry: Registry,
    admissions: IntCounter,
    delayed: IntCounter,
    cancellations: IntCounter,
    wait_seconds: Histogram,
}

impl GateMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let admissions = IntCounter::new(
            "registry_throttle_admissions_total",
            "Calls admitted by the gate",
        )?;
        let delayed = IntCounter::new(
            "registry_throttle_delayed_admissions_total",
            "Calls admitted only after waiting for a slot",
        )?;
        let cancellations = IntCounter::new(
            "registry_throttle_cancellations_total",
            "Waits abandoned before admission",
        )?;
        let wait_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "registry_throttle_wait_seconds",
                "Time spent waiting for admission",
            )
            .buckets(vec![0.0, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 15.0, 60.0]),
        )?;

        registry.register(Box::new(admissions.clone()))?;
        registry.register(Box::new(delayed.clone()))?;
        registry.register(Box::new(cancellations.clone()))?;
        registry.register(Box::new(wait_seconds.clone()))?;

        Ok(Self {
            registry,
            admissions,
            delayed,
            cancellations,
            wait_seconds,
        })
    }

    pub(crate) fn record_admission(&self, waited: Duration) {
        self.admissions.inc();
        if !waited.is_zero() {
            self.delayed.inc();
        }
        self.wait_seconds.observe(waited.as_secs_f64());
    }

    pub(crate) fn record_cancellation(&self) {
        self.cancellations.inc();
    }

    /// Total admissions so far.
    pub fn admissions(&self) -> u64 {
        self.admissions.get()
    }

    /// Admissions that had to wait.
    pub fn delayed_admissions(&self) -> u64 {
        self.delayed.get()
    }

    /// Abandoned waits.
    pub fn cancellations(&self) -> u64 {
        self.cancellations.get()
    }

    /// Render all collectors in the Prometheus text format.
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!(error = %e, "Failed to encode gate metrics");
            return String::new();
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

impl std::fmt::Debug for GateMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GateMetrics")
            .field("admissions", &self.admissions())
            .field("delayed", &self.delayed_admissions())
            .field("cancellations", &self.cancellations())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_and_render() {
        let metrics = GateMetrics::new().unwrap();
        metrics.record_admission(Duration::ZERO);
        metrics.record_admission(Duration::from_millis(250));
        metrics.record_cancellation();

        assert_eq!(metrics.admissions(), 2);
        assert_eq!(metrics.delayed_admissions(), 1);
        assert_eq!(metrics.cancellations(), 1);

        let text = metrics.render();
        assert!(text.contains("registry_throttle_admissions_total 2"));
        assert!(text.contains("registry_throttle_wait_seconds_count 2"));
    }

    #[test]
    fn test_instances_are_independent() {
        let a = GateMetrics::new().unwrap();
        let b = GateMetrics::new().unwrap();
        a.record_admission(Duration::ZERO);
        assert_eq!(a.admissions(), 1);
        assert_eq!(b.admissions(), 0);
    }
}

// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Sliding-window admission gate.
//!
//! Caps the number of admitted calls to `capacity` within any rolling
//! `window`. Callers that find the gate full are delayed, never rejected:
//! they sleep until the oldest admission expires and then re-check.
//!
//! Expiry uses tokio's monotonic clock only. An entry admitted at `t` is live
//! for the half-open interval `[t, t + window)`, so waits are computed from
//! monotonic instants and can never come out negative. Wall-clock time is
//! attached to each [`Admission`] for logging and nothing else.
//!
//! Every caller that purges expired entries wakes all suspended callers, and
//! each of them re-checks capacity under the lock. A freed slot therefore
//! goes to whoever takes the lock first, and the lock hands out access in
//! FIFO order.

use crate::config::{ThrottleConfig, WindowUnit};
use crate::error::GateError;
use crate::metrics::GateMetrics;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::time::{sleep_until, Instant};
use tracing::debug;

/// Upper bound on ledger slots reserved up front; the ledger grows past it
/// one entry per admission.
const LEDGER_PREALLOC: usize = 1024;

/// A granted admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    /// Monotonic instant recorded in the ledger
    pub admitted_at: Instant,
    /// Wall-clock time of admission
    pub timestamp: DateTime<Utc>,
    /// Time spent suspended before the slot was granted; zero when admitted
    /// on the first check
    pub waited: Duration,
}

/// Thread-safe sliding-window admission gate.
///
/// Each gate owns its own ledger. Share one gate between clients by wrapping
/// it in an `Arc`.
pub struct AdmissionGate {
    window: Duration,
    capacity: usize,
    /// Admission instants, oldest first
    ledger: Mutex<VecDeque<Instant>>,
    /// Signalled whenever expired entries are purged
    released: Notify,
    metrics: GateMetrics,
}

impl AdmissionGate {
    /// Create a gate admitting at most `capacity` calls per `window`.
    pub fn new(window: Duration, capacity: u32) -> Result<Self, GateError> {
        if capacity == 0 {
            return Err(GateError::InvalidCapacity);
        }
        if window.is_zero() {
            return Err(GateError::InvalidWindow);
        }

        let capacity = capacity as usize;
        Ok(Self {
            window,
            capacity,
            ledger: Mutex::new(VecDeque::with_capacity(capacity.min(LEDGER_PREALLOC))),
            released: Notify::new(),
            metrics: GateMetrics::new()?,
        })
    }

    /// Create a gate from configuration.
    pub fn from_config(config: &ThrottleConfig) -> Result<Self, GateError> {
        Self::new(config.window_duration(), config.capacity)
    }

    /// Create a gate whose window is exactly one `unit`.
    pub fn per_unit(unit: WindowUnit, capacity: u32) -> Result<Self, GateError> {
        Self::new(unit.duration(), capacity)
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn metrics(&self) -> &GateMetrics {
        &self.metrics
    }

    /// Wait until a slot is free, then record the admission.
    ///
    /// Dropping the returned future before it completes abandons the wait
    /// without touching the ledger.
    pub async fn acquire(&self) -> Admission {
        let started = Instant::now();
        let mut guard = WaitGuard::new(&self.metrics);
        let mut slept = false;

        loop {
            // Register for wake-ups before inspecting the ledger so that a
            // purge between unlock and sleep is not missed.
            let released = self.released.notified();
            tokio::pin!(released);
            released.as_mut().enable();

            let expires_at = {
                let mut ledger = self.ledger.lock().await;
                let now = Instant::now();
                self.purge(&mut ledger, now);

                if ledger.len() < self.capacity {
                    ledger.push_back(now);
                    let in_flight = ledger.len();
                    drop(ledger);

                    guard.disarm();
                    let admission = Admission {
                        admitted_at: now,
                        timestamp: Utc::now(),
                        waited: if slept {
                            now.duration_since(started)
                        } else {
                            Duration::ZERO
                        },
                    };
                    self.metrics.record_admission(admission.waited);
                    debug!(
                        waited_ms = admission.waited.as_millis() as u64,
                        in_flight,
                        capacity = self.capacity,
                        "Admission granted"
                    );
                    return admission;
                }

                // Full, so the ledger holds at least one entry.
                match ledger.front() {
                    Some(oldest) => self.expiry_of(*oldest),
                    None => Some(now),
                }
            };

            match expires_at {
                Some(deadline) => {
                    debug!(
                        wait_ms = deadline.saturating_duration_since(Instant::now()).as_millis() as u64,
                        "Gate full, waiting for oldest admission to expire"
                    );
                    tokio::select! {
                        _ = sleep_until(deadline) => {}
                        _ = &mut released => {}
                    }
                }
                None => {
                    // Expiry lies beyond what the clock can represent.
                    debug!("Gate full, waiting for a release");
                    released.as_mut().await;
                }
            }
            slept = true;
        }
    }

    /// Like [`acquire`](Self::acquire), but gives up when `cancel` completes
    /// while the caller is still waiting.
    ///
    /// A free slot is always checked first, so a `cancel` future that is
    /// already complete only takes effect when the gate is full.
    pub async fn acquire_with_cancel<F>(&self, cancel: F) -> Result<Admission, GateError>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            admission = self.acquire() => Ok(admission),
            _ = cancel => Err(GateError::Cancelled),
        }
    }

    /// Like [`acquire`](Self::acquire), but gives up after `limit`.
    pub async fn acquire_timeout(&self, limit: Duration) -> Result<Admission, GateError> {
        tokio::time::timeout(limit, self.acquire())
            .await
            .map_err(|_| GateError::TimedOut { waited: limit })
    }

    /// Admit immediately if a slot is free.
    ///
    /// Returns `None` when the gate is full or another caller currently holds
    /// the ledger lock.
    pub fn try_acquire(&self) -> Option<Admission> {
        let mut ledger = self.ledger.try_lock().ok()?;
        let now = Instant::now();
        self.purge(&mut ledger, now);

        if ledger.len() >= self.capacity {
            return None;
        }
        ledger.push_back(now);
        drop(ledger);

        self.metrics.record_admission(Duration::ZERO);
        Some(Admission {
            admitted_at: now,
            timestamp: Utc::now(),
            waited: Duration::ZERO,
        })
    }

    /// Number of admissions still inside the window.
    pub async fn in_flight(&self) -> usize {
        let mut ledger = self.ledger.lock().await;
        self.purge(&mut ledger, Instant::now());
        ledger.len()
    }

    /// Time until a slot frees up; zero if one is free now, `Duration::MAX`
    /// if the expiry cannot be represented.
    pub async fn next_available_in(&self) -> Duration {
        let mut ledger = self.ledger.lock().await;
        let now = Instant::now();
        self.purge(&mut ledger, now);

        if ledger.len() < self.capacity {
            return Duration::ZERO;
        }
        ledger
            .front()
            .map(|oldest| match self.expiry_of(*oldest) {
                Some(expiry) => expiry.saturating_duration_since(now),
                None => Duration::MAX,
            })
            .unwrap_or(Duration::ZERO)
    }

    /// Instant at which an entry admitted at `admitted_at` leaves the window.
    fn expiry_of(&self, admitted_at: Instant) -> Option<Instant> {
        admitted_at.checked_add(self.window)
    }

    /// Drop entries that have left the window and wake every waiter if any
    /// slot was freed.
    fn purge(&self, ledger: &mut VecDeque<Instant>, now: Instant) {
        let before = ledger.len();
        while let Some(oldest) = ledger.front() {
            if now.saturating_duration_since(*oldest) < self.window {
                break;
            }
            ledger.pop_front();
        }

        if ledger.len() < before {
            self.released.notify_waiters();
        }
    }
}

impl std::fmt::Debug for AdmissionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionGate")
            .field("window", &self.window)
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

/// Counts a wait as cancelled if `acquire` is dropped before admission.
struct WaitGuard<'a> {
    metrics: &'a GateMetrics,
    armed: bool,
}

impl<'a> WaitGuard<'a> {
    fn new(metrics: &'a GateMetrics) -> Self {
        Self {
            metrics,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for WaitGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.metrics.record_cancellation();
            debug!("Admission wait abandoned");
        }
    }
}

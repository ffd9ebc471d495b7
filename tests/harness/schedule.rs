// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Admission schedule recording and sliding-window checks.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Collects admission instants from concurrent callers.
#[derive(Debug, Clone, Default)]
pub struct ScheduleRecorder {
    admissions: Arc<Mutex<Vec<Instant>>>,
}

impl ScheduleRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, at: Instant) {
        self.admissions.lock().unwrap().push(at);
    }

    /// Admission instants sorted oldest first.
    pub fn sorted(&self) -> Vec<Instant> {
        let mut times = self.admissions.lock().unwrap().clone();
        times.sort_unstable();
        times
    }

    /// Offsets from `start` in milliseconds, sorted.
    pub fn offsets_ms(&self, start: Instant) -> Vec<u64> {
        self.sorted()
            .into_iter()
            .map(|t| t.duration_since(start).as_millis() as u64)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.admissions.lock().unwrap().len()
    }
}

/// Largest number of admissions inside any half-open interval
/// `[t, t + window)` anchored at an admission.
pub fn max_in_any_window(sorted: &[Instant], window: Duration) -> usize {
    let mut best = 0;
    let mut tail = 0;
    for head in 0..sorted.len() {
        while sorted[head].duration_since(sorted[tail]) >= window {
            tail += 1;
        }
        best = best.max(head - tail + 1);
    }
    best
}

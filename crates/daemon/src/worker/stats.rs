// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use capd_wire::UpdateData;
use tokio::time::Instant;

#[cfg(test)]
#[path = "stats_tests.rs"]
mod tests;

/// Throughput counters for one worker.
///
/// `received` counts records since the last sample and resets on every
/// sample; `total` is seeded from the job and never resets.
#[derive(Debug, Clone)]
pub struct WorkerStats {
    received: u64,
    total: u64,
    last_sample: Instant,
}

impl WorkerStats {
    pub fn new(total: u64, now: Instant) -> Self {
        Self { received: 0, total, last_sample: now }
    }

    pub fn record(&mut self) {
        self.received += 1;
        self.total += 1;
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn due(&self, now: Instant, interval: Duration) -> bool {
        now.saturating_duration_since(self.last_sample) >= interval
    }

    /// Take a sample at `now` and start the next window.
    pub fn sample(&mut self, now: Instant, epoch_ms: u64) -> UpdateData {
        let elapsed = now.saturating_duration_since(self.last_sample).as_secs_f64();
        let rate = if elapsed > 0.0 { self.received as f64 / elapsed } else { 0.0 };
        let update = UpdateData { time: epoch_ms, received: self.received, rate, total: self.total };
        self.received = 0;
        self.last_sample = now;
        update
    }
}

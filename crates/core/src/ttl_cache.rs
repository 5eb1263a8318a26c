// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Short-horizon memoization for remote queries.
//!
//! Collapses bursts of polls within one tick into a single remote call. The
//! result is cached whatever it is, including a failure, so a failing query
//! is retried at most once per TTL.

use crate::clock::{Clock, SystemClock};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

pub struct TtlCache<T, C: Clock = SystemClock> {
    ttl: Duration,
    clock: C,
    // Held across the fetch so concurrent callers wait for one result.
    slot: Mutex<Option<(Instant, T)>>,
}

impl<T: Clone, C: Clock> TtlCache<T, C> {
    pub fn new(ttl: Duration, clock: C) -> Self {
        Self { ttl, clock, slot: Mutex::new(None) }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached value if it is at most `ttl` old, otherwise run
    /// `fetch` and cache its output. `bypass` forces a fresh fetch.
    pub async fn get_or_fetch<F, Fut>(&self, bypass: bool, fetch: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let mut slot = self.slot.lock().await;
        if !bypass {
            if let Some((at, value)) = slot.as_ref() {
                if self.clock.now().saturating_duration_since(*at) <= self.ttl {
                    return value.clone();
                }
            }
        }

        let value = fetch().await;
        *slot = Some((self.clock.now(), value.clone()));
        value
    }

    /// Drop the cached value so the next call fetches.
    pub async fn invalidate(&self) {
        *self.slot.lock().await = None;
    }
}

#[cfg(test)]
#[path = "ttl_cache_tests.rs"]
mod tests;

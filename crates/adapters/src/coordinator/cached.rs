// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TTL-caching decorator for the two coordinator polls.

use super::{Coordinator, CoordinatorError};
use async_trait::async_trait;
use capd_core::{CaptureStatus, Clock, Job, JobId, JobList, Progress, SystemClock, TtlCache};
use std::sync::Arc;
use std::time::Duration;

/// Wraps a coordinator so that status and active-job polls made within
/// `ttl` of each other share one remote call. Commands pass straight through.
#[derive(Clone)]
pub struct CachedCoordinator<C, K: Clock = SystemClock> {
    inner: C,
    status: Arc<TtlCache<Result<Job, CoordinatorError>, K>>,
    active_jobs: Arc<TtlCache<Result<JobList, CoordinatorError>, K>>,
}

impl<C: Coordinator> CachedCoordinator<C> {
    pub fn new(inner: C, ttl: Duration) -> Self {
        Self::with_clock(inner, ttl, SystemClock)
    }
}

impl<C: Coordinator, K: Clock> CachedCoordinator<C, K> {
    pub fn with_clock(inner: C, ttl: Duration, clock: K) -> Self {
        Self {
            inner,
            status: Arc::new(TtlCache::new(ttl, clock.clone())),
            active_jobs: Arc::new(TtlCache::new(ttl, clock)),
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Status snapshot that skips the cache (and refreshes it).
    pub async fn job_status_fresh(&self) -> Result<Job, CoordinatorError> {
        self.status.get_or_fetch(true, || self.inner.job_status()).await
    }
}

#[async_trait]
impl<C: Coordinator, K: Clock> Coordinator for CachedCoordinator<C, K> {
    async fn active_jobs(&self) -> Result<JobList, CoordinatorError> {
        self.active_jobs.get_or_fetch(false, || self.inner.active_jobs()).await
    }

    async fn job_status(&self) -> Result<Job, CoordinatorError> {
        self.status.get_or_fetch(false, || self.inner.job_status()).await
    }

    async fn update_status(&self, status: CaptureStatus) -> Result<(), CoordinatorError> {
        self.inner.update_status(status).await
    }

    async fn put_update(&self, progress: Progress) -> Result<(), CoordinatorError> {
        self.inner.put_update(progress).await
    }

    async fn set_active_job(&self, job: Option<JobId>) {
        self.inner.set_active_job(job).await;
        // A cached snapshot belongs to the previous job.
        self.status.invalidate().await;
    }
}

#[cfg(test)]
#[path = "cached_tests.rs"]
mod tests;

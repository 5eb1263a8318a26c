// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote job coordinator adapter.
//!
//! Every call may fail. Callers treat a failure as transient and retry on
//! their next poll tick.

mod cached;
mod http;

pub use cached::CachedCoordinator;
pub use http::HttpCoordinator;

use async_trait::async_trait;
use capd_core::{CaptureStatus, Job, JobId, JobList, Progress};
use thiserror::Error;

/// Errors from coordinator calls.
///
/// `Clone` so a cached failure can be handed to every caller within its TTL.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CoordinatorError {
    #[error("no active job set")]
    NoActiveJob,

    #[error("request failed: {0}")]
    Request(String),

    #[error("coordinator returned HTTP {0}")]
    Status(u16),

    #[error("invalid response: {0}")]
    Decode(String),
}

/// Query/command interface to the coordinator.
///
/// Job-scoped calls address the job most recently passed to
/// [`Coordinator::set_active_job`].
#[async_trait]
pub trait Coordinator: Clone + Send + Sync + 'static {
    /// Jobs the coordinator currently flags active.
    async fn active_jobs(&self) -> Result<JobList, CoordinatorError>;

    /// Status snapshot of the active job.
    async fn job_status(&self) -> Result<Job, CoordinatorError>;

    /// Set the active job's status.
    async fn update_status(&self, status: CaptureStatus) -> Result<(), CoordinatorError>;

    /// Report a throughput sample for the active job.
    async fn put_update(&self, progress: Progress) -> Result<(), CoordinatorError>;

    /// Address subsequent job-scoped calls to `job`, or to nothing.
    async fn set_active_job(&self, job: Option<JobId>);
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{CoordinatorCall, FakeCoordinator};

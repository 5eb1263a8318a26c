// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{Coordinator, CoordinatorError};
use async_trait::async_trait;
use capd_core::{CaptureStatus, Job, JobId, JobList, Progress};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Recorded coordinator call
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinatorCall {
    ActiveJobs,
    JobStatus,
    UpdateStatus(CaptureStatus),
    PutUpdate(Progress),
    SetActiveJob(Option<JobId>),
}

#[derive(Default)]
struct FakeCoordinatorState {
    calls: Vec<CoordinatorCall>,
    active_jobs: Option<Result<JobList, CoordinatorError>>,
    /// Served first, one per call, before falling back to `status`.
    queued_status: VecDeque<Result<Job, CoordinatorError>>,
    status: Option<Result<Job, CoordinatorError>>,
    active_job: Option<JobId>,
}

/// Scriptable in-memory coordinator for tests.
///
/// Unscripted queries fail with `CoordinatorError::Request`.
/// `update_status` also writes through to the scripted status snapshot.
#[derive(Clone, Default)]
pub struct FakeCoordinator {
    inner: Arc<Mutex<FakeCoordinatorState>>,
}

impl FakeCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_active_jobs(&self, jobs: Vec<Job>) {
        self.inner.lock().active_jobs = Some(Ok(JobList::new(jobs)));
    }

    pub fn set_active_jobs_result(&self, result: Result<JobList, CoordinatorError>) {
        self.inner.lock().active_jobs = Some(result);
    }

    pub fn set_status(&self, job: Job) {
        self.inner.lock().status = Some(Ok(job));
    }

    pub fn set_status_result(&self, result: Result<Job, CoordinatorError>) {
        self.inner.lock().status = Some(result);
    }

    /// Queue a one-shot status response ahead of the standing one.
    pub fn push_status_result(&self, result: Result<Job, CoordinatorError>) {
        self.inner.lock().queued_status.push_back(result);
    }

    pub fn active_job(&self) -> Option<JobId> {
        self.inner.lock().active_job
    }

    pub fn calls(&self) -> Vec<CoordinatorCall> {
        self.inner.lock().calls.clone()
    }

    pub fn status_updates(&self) -> Vec<CaptureStatus> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                CoordinatorCall::UpdateStatus(status) => Some(status),
                _ => None,
            })
            .collect()
    }

    pub fn progress_updates(&self) -> Vec<Progress> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                CoordinatorCall::PutUpdate(progress) => Some(progress),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, call: &CoordinatorCall) -> usize {
        self.inner.lock().calls.iter().filter(|c| *c == call).count()
    }
}

fn unscripted() -> CoordinatorError {
    CoordinatorError::Request("unscripted".to_string())
}

#[async_trait]
impl Coordinator for FakeCoordinator {
    async fn active_jobs(&self) -> Result<JobList, CoordinatorError> {
        let mut state = self.inner.lock();
        state.calls.push(CoordinatorCall::ActiveJobs);
        state.active_jobs.clone().unwrap_or_else(|| Err(unscripted()))
    }

    async fn job_status(&self) -> Result<Job, CoordinatorError> {
        let mut state = self.inner.lock();
        state.calls.push(CoordinatorCall::JobStatus);
        if let Some(result) = state.queued_status.pop_front() {
            return result;
        }
        state.status.clone().unwrap_or_else(|| Err(unscripted()))
    }

    async fn update_status(&self, status: CaptureStatus) -> Result<(), CoordinatorError> {
        let mut state = self.inner.lock();
        state.calls.push(CoordinatorCall::UpdateStatus(status));
        if let Some(Ok(job)) = state.status.as_mut() {
            job.status = status;
        }
        Ok(())
    }

    async fn put_update(&self, progress: Progress) -> Result<(), CoordinatorError> {
        self.inner.lock().calls.push(CoordinatorCall::PutUpdate(progress));
        Ok(())
    }

    async fn set_active_job(&self, job: Option<JobId>) {
        let mut state = self.inner.lock();
        state.calls.push(CoordinatorCall::SetActiveJob(job));
        state.active_job = job;
    }
}

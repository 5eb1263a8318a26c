// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Finds and holds the single job this agent works on.

use std::time::Duration;

use capd_adapters::Coordinator;
use capd_core::{Job, JobId};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[cfg(test)]
#[path = "claimer_tests.rs"]
mod tests;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClaimError {
    #[error("no job to activate")]
    NoJob,
}

pub struct JobClaimer<C> {
    coordinator: C,
    active: Option<Job>,
}

impl<C: Coordinator> JobClaimer<C> {
    pub fn new(coordinator: C) -> Self {
        Self { coordinator, active: None }
    }

    /// First job the coordinator lists as active, if any.
    ///
    /// More than one active job breaks the coordinator's own contract; the
    /// first is taken and the count logged.
    pub async fn find_active_job(&self) -> Option<Job> {
        let list = match self.coordinator.active_jobs().await {
            Ok(list) => list,
            Err(e) => {
                warn!(error = %e, "failed to list active jobs");
                return None;
            }
        };
        if list.results.len() > 1 {
            warn!(count = list.results.len(), "coordinator reports more than one active job, taking the first");
        }
        list.results.into_iter().next()
    }

    /// Poll every `interval` until a job whose status is running shows up.
    /// Returns `None` if cancelled first.
    pub async fn wait_for_runnable(
        &self,
        interval: Duration,
        cancel: &CancellationToken,
    ) -> Option<Job> {
        while !cancel.is_cancelled() {
            match self.find_active_job().await {
                Some(job) if job.status.is_running() => return Some(job),
                Some(job) => debug!(job_id = %job.id, status = %job.status, "active job is not running"),
                None => debug!("no active job"),
            }
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = cancel.cancelled() => break,
            }
        }
        None
    }

    pub async fn activate(&mut self, job: Option<Job>) -> Result<(), ClaimError> {
        let Some(job) = job else {
            error!("asked to activate no job");
            return Err(ClaimError::NoJob);
        };
        info!(job_id = %job.id, name = %job.name, "job activated");
        self.coordinator.set_active_job(Some(job.id)).await;
        self.active = Some(job);
        Ok(())
    }

    pub async fn deactivate(&mut self) {
        if let Some(job) = self.active.take() {
            info!(job_id = %job.id, "job deactivated");
        }
        self.coordinator.set_active_job(None).await;
    }

    pub fn active_job(&self) -> Option<&Job> {
        self.active.as_ref()
    }

    pub fn active_job_id(&self) -> Option<JobId> {
        self.active.as_ref().map(|job| job.id)
    }
}

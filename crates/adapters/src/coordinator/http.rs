// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON-over-HTTP coordinator client.
//!
//! Endpoints, relative to the base URL:
//!   `GET activejobs/`  active jobs
//!   `GET jobs/<id>/`   job status snapshot
//!   `PUT jobs/<id>/`   status change (whole snapshot)
//!   `POST update/`     throughput sample

use super::{Coordinator, CoordinatorError};
use async_trait::async_trait;
use capd_core::{CaptureStatus, Job, JobId, JobList, Progress};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct HttpCoordinator {
    client: reqwest::Client,
    base_url: String,
    active_job: Arc<Mutex<Option<JobId>>>,
}

#[derive(Debug, Serialize)]
struct UpdateBody {
    count: u64,
    total_count: u64,
    rate: f64,
    job: JobId,
}

impl HttpCoordinator {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CoordinatorError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoordinatorError::Request(e.to_string()))?;
        let mut base_url = base_url.to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        tracing::debug!(%base_url, "coordinator client initialized");
        Ok(Self { client, base_url, active_job: Arc::new(Mutex::new(None)) })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn job_endpoint(&self) -> Result<String, CoordinatorError> {
        let id = (*self.active_job.lock()).ok_or(CoordinatorError::NoActiveJob)?;
        Ok(format!("jobs/{}/", id))
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, CoordinatorError> {
        let response =
            request.send().await.map_err(|e| CoordinatorError::Request(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), %body, "coordinator request error");
            return Err(CoordinatorError::Status(status.as_u16()));
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, CoordinatorError> {
        let url = format!("{}{}", self.base_url, endpoint);
        tracing::debug!(%url, "GET");
        let response = self.send(self.client.get(&url)).await?;
        response.json::<T>().await.map_err(|e| CoordinatorError::Decode(e.to_string()))
    }
}

/// Truncate toward zero at three decimals, the precision the coordinator
/// stores rates with.
pub(crate) fn truncate_rate(rate: f64) -> f64 {
    if !rate.is_finite() {
        return 0.0;
    }
    (rate * 1000.0).trunc() / 1000.0
}

#[async_trait]
impl Coordinator for HttpCoordinator {
    async fn active_jobs(&self) -> Result<JobList, CoordinatorError> {
        self.get_json("activejobs/").await
    }

    async fn job_status(&self) -> Result<Job, CoordinatorError> {
        let endpoint = self.job_endpoint()?;
        self.get_json(&endpoint).await
    }

    async fn update_status(&self, status: CaptureStatus) -> Result<(), CoordinatorError> {
        let endpoint = self.job_endpoint()?;
        let mut job: Job = self.get_json(&endpoint).await?;
        if job.status == status {
            tracing::warn!(%status, "attempt to update status and it's already set");
            return Ok(());
        }

        job.status = status;
        let url = format!("{}{}", self.base_url, endpoint);
        tracing::debug!(%url, %status, "PUT");
        self.send(self.client.put(&url).json(&job)).await?;
        Ok(())
    }

    async fn put_update(&self, progress: Progress) -> Result<(), CoordinatorError> {
        let job = (*self.active_job.lock()).ok_or(CoordinatorError::NoActiveJob)?;
        let body = UpdateBody {
            count: progress.received,
            total_count: progress.total,
            rate: truncate_rate(progress.rate),
            job,
        };
        let url = format!("{}update/", self.base_url);
        tracing::debug!(%url, ?body, "POST");
        self.send(self.client.post(&url).json(&body)).await?;
        Ok(())
    }

    async fn set_active_job(&self, job: Option<JobId>) {
        *self.active_job.lock() = job;
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;

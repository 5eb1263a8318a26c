// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Top-level control loop.
//!
//! Claims a job, runs one worker for it, and on every tick reconciles the
//! coordinator's desired status with the worker's reported one. Everything
//! here runs sequentially on one task; the worker is reached only through
//! its handle and the message channel.

mod reconcile;

pub use reconcile::{decide, Action, Decision};

use std::time::Duration;

use async_trait::async_trait;
use capd_adapters::Coordinator;
use capd_core::{CaptureStatus, Job};
use capd_wire::UpdateData;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::channel::{dispatch, MessageHandler, WorkerChannel};
use crate::claimer::JobClaimer;
use crate::terms::TermTracker;
use crate::worker::{WorkerHandle, WorkerLauncher, WorkerSpec};

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

/// Control loop timing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorSettings {
    /// Cadence of the wait-for-job poll.
    pub poll_interval: Duration,
    /// How long each tick drains worker messages before polling the coordinator.
    pub drain_window: Duration,
    /// Sleep between drain attempts when no message is pending.
    pub drain_idle: Duration,
    /// Pause between stopping and restarting a worker on a terms change.
    pub restart_settle: Duration,
    pub stop_poll: Duration,
    /// Wait for a cancelled worker before killing it.
    pub stop_timeout: Duration,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            drain_window: Duration::from_secs(5),
            drain_idle: Duration::from_secs(1),
            restart_settle: Duration::from_secs(10),
            stop_poll: Duration::from_millis(500),
            stop_timeout: Duration::from_secs(30),
        }
    }
}

pub struct Supervisor<C> {
    coordinator: C,
    claimer: JobClaimer<C>,
    launcher: Box<dyn WorkerLauncher>,
    channel: WorkerChannel,
    worker: Option<Box<dyn WorkerHandle>>,
    /// Last status the worker reported.
    client_status: CaptureStatus,
    /// Terms changed while the worker kept running.
    restart_pending: bool,
    settings: SupervisorSettings,
    shutdown: CancellationToken,
}

impl<C: Coordinator> Supervisor<C> {
    pub fn new(
        coordinator: C,
        launcher: Box<dyn WorkerLauncher>,
        settings: SupervisorSettings,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            claimer: JobClaimer::new(coordinator.clone()),
            coordinator,
            launcher,
            channel: WorkerChannel::new(),
            worker: None,
            client_status: CaptureStatus::UNKNOWN,
            restart_pending: false,
            settings,
            shutdown,
        }
    }

    pub fn client_status(&self) -> CaptureStatus {
        self.client_status
    }

    pub fn worker_active(&self) -> bool {
        self.worker.is_some()
    }

    /// Claim and work jobs until shutdown, then stop the worker and release
    /// the job.
    pub async fn run(&mut self) {
        info!("supervisor running");
        while !self.shutdown.is_cancelled() {
            let Some(job) = self.wait_for_job().await else {
                break;
            };
            info!(job_id = %job.id, name = %job.name, "starting collection");
            self.do_job(job).await;
            info!("collection ended, waiting for an active job");
        }

        self.stop_worker().await;
        self.claimer.deactivate().await;
        info!("supervisor stopped");
    }

    async fn wait_for_job(&mut self) -> Option<Job> {
        self.claimer.deactivate().await;
        let job =
            self.claimer.wait_for_runnable(self.settings.poll_interval, &self.shutdown).await?;
        self.claimer.activate(Some(job.clone())).await.ok()?;
        Some(job)
    }

    /// Per-job loop. Returns when the coordinator stops or archives the job,
    /// or on shutdown.
    pub async fn do_job(&mut self, job: Job) {
        let mut terms = TermTracker::new();
        terms.check(&job);
        terms.reset_changed();
        self.restart_pending = false;

        while !self.shutdown.is_cancelled() {
            self.drain().await;
            if self.shutdown.is_cancelled() {
                break;
            }

            let snapshot = match self.coordinator.job_status().await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!(error = %e, "failed to fetch job status");
                    continue;
                }
            };

            if snapshot.is_archived() {
                info!(job_id = %snapshot.id, "job archived");
                self.stop_worker().await;
                break;
            }

            if terms.check(&snapshot) {
                self.restart_pending = true;
                terms.reset_changed();
            }

            if self.reconcile(&snapshot, &terms).await {
                break;
            }

            if self.restart_pending && !self.restart(&snapshot, &mut terms).await {
                break;
            }
        }
        debug!(shutting_down = self.shutdown.is_cancelled(), "leaving job");
    }

    /// One reconciliation pass. Returns true when the coordinator stopped
    /// the job and the worker was stopped.
    pub(crate) async fn reconcile(&mut self, snapshot: &Job, terms: &TermTracker) -> bool {
        let remote = snapshot.status;
        if remote != self.client_status {
            info!(server = %remote, client = %self.client_status, "statuses differ");
        }

        let decision = decide(remote, self.client_status);
        let stopped = match decision.action {
            Action::None => false,
            Action::Stop => {
                info!("stopping capture");
                self.stop_worker().await;
                true
            }
            Action::Start => {
                self.start_worker(WorkerSpec {
                    name: snapshot.name.clone(),
                    terms: terms.terms().clone(),
                    total: snapshot.total(),
                })
                .await;
                // A fresh start already carries the current terms.
                self.restart_pending = false;
                false
            }
        };

        if let Some(status) = decision.report {
            debug!(%status, "reporting status");
            if let Err(e) = self.coordinator.update_status(status).await {
                warn!(%status, error = %e, "failed to report status");
            }
        }
        stopped
    }

    /// Stop, settle, re-read terms and start again. Returns false if
    /// shutdown began during the settle pause.
    async fn restart(&mut self, snapshot: &Job, terms: &mut TermTracker) -> bool {
        info!(terms = %terms.terms().joined(), "restarting worker with new terms");
        self.stop_worker().await;
        if !pause(&self.shutdown, self.settings.restart_settle).await {
            return false;
        }

        let (name, total) = match self.coordinator.job_status().await {
            Ok(fresh) => {
                terms.check(&fresh);
                (fresh.name.clone(), fresh.total())
            }
            Err(e) => {
                warn!(error = %e, "failed to refresh terms, restarting with the last known ones");
                (snapshot.name.clone(), snapshot.total())
            }
        };
        terms.reset_changed();

        self.start_worker(WorkerSpec { name, terms: terms.terms().clone(), total }).await;
        self.restart_pending = false;
        true
    }

    /// Launch a worker unless one is already active. Returns whether one
    /// was launched.
    pub async fn start_worker(&mut self, spec: WorkerSpec) -> bool {
        self.reap_if_exited().await;
        if self.worker.is_some() {
            debug!(name = %spec.name, "worker already active, not starting another");
            return false;
        }

        info!(name = %spec.name, terms = %spec.terms.joined(), total = spec.total, "starting worker");
        match self.launcher.launch(spec, self.channel.sender()) {
            Ok(handle) => {
                self.worker = Some(handle);
                true
            }
            Err(e) => {
                error!(error = %e, "failed to launch worker");
                false
            }
        }
    }

    /// Cancel the worker and block until it has exited, killing it once
    /// `stop_timeout` passes. No-op without a worker.
    pub async fn stop_worker(&mut self) {
        let Some(mut worker) = self.worker.take() else {
            return;
        };

        debug!("stopping worker");
        worker.cancel();
        let started = Instant::now();
        let mut killed = false;
        while !worker.has_exited() {
            if !killed && started.elapsed() >= self.settings.stop_timeout {
                warn!(
                    timeout_ms = self.settings.stop_timeout.as_millis() as u64,
                    "worker ignored cancellation"
                );
                worker.kill();
                killed = true;
            }
            tokio::time::sleep(self.settings.stop_poll).await;
        }
        worker.reap().await;
        self.drain_pending().await;
        if self.client_status.is_running() {
            // A killed worker never reports its own stop.
            warn!(client = %self.client_status, "worker exited without reporting STOPPED");
            self.client_status = CaptureStatus::STOPPED;
        }
        info!(client = %self.client_status, "worker stopped");
    }

    /// Drain worker messages for one drain window, idling between empty
    /// polls and reaping a worker that exited on its own.
    pub(crate) async fn drain(&mut self) {
        let deadline = Instant::now() + self.settings.drain_window;
        while Instant::now() < deadline {
            match self.channel.try_recv() {
                Some(message) => dispatch(self, message).await,
                None => {
                    self.reap_if_exited().await;
                    if !pause(&self.shutdown, self.settings.drain_idle).await {
                        return;
                    }
                }
            }
        }
    }

    async fn drain_pending(&mut self) {
        while let Some(message) = self.channel.try_recv() {
            dispatch(self, message).await;
        }
    }

    async fn reap_if_exited(&mut self) {
        let exited = match self.worker.as_mut() {
            Some(worker) => worker.has_exited(),
            None => return,
        };
        if !exited {
            return;
        }

        if let Some(mut worker) = self.worker.take() {
            worker.reap().await;
        }
        self.drain_pending().await;
        if self.client_status.is_running() {
            warn!(client = %self.client_status, "worker exited unexpectedly");
            self.client_status = CaptureStatus::STOPPED;
        } else {
            info!("worker exited");
        }
    }
}

/// Sleep unless shutdown begins first. Returns false on shutdown.
async fn pause(shutdown: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => true,
        _ = shutdown.cancelled() => false,
    }
}

#[async_trait]
impl<C: Coordinator> MessageHandler for Supervisor<C> {
    async fn on_status(&mut self, status: CaptureStatus) {
        if status != self.client_status {
            info!(from = %self.client_status, to = %status, "worker status changed");
            self.client_status = status;
        }
    }

    async fn on_update(&mut self, update: UpdateData) {
        debug!(received = update.received, total = update.total, rate = update.rate, "worker update");
        if let Err(e) = self.coordinator.put_update(update.progress()).await {
            warn!(error = %e, "failed to forward progress");
        }
    }
}

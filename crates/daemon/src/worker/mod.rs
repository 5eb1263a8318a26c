// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The capture worker and the launchers that run it.
//!
//! A worker owns one streaming source and one rotating output file for the
//! lifetime of a single job configuration (name, terms, starting total). It
//! reports `STARTING`, `STARTED`, `STOPPING` and `STOPPED` over the
//! [`MessageSender`] and sends a throughput sample at most once per update
//! interval.

mod launcher;
mod process;
mod stats;
mod task;

#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use launcher::{LaunchError, WorkerHandle, WorkerLauncher};
pub use process::{serve_process, ProcessLauncher};
pub use stats::WorkerStats;
pub use task::{command_source_factory, SourceFactory, TaskLauncher};

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeLauncher, LaunchRecord};

use std::time::Duration;

use capd_adapters::{EventSink, Flow, SourceConfig, SourceError, StreamSource};
use capd_core::{CaptureStatus, Clock, SystemClock, TermSet};
use capd_storage::{OutputConfig, OutputError, RotatingOutputFile};
use capd_wire::WorkerMessage;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::channel::MessageSender;

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("output error: {0}")]
    Output(#[from] OutputError),

    #[error("source error: {0}")]
    Source(#[from] SourceError),
}

/// What a worker captures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSpec {
    /// Collection name; also names the output directory.
    pub name: String,
    pub terms: TermSet,
    /// Records already captured for this job before this worker.
    pub total: u64,
}

/// How a worker captures.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub output: OutputConfig,
    pub source: SourceConfig,
    pub update_interval: Duration,
}

/// Sends a status only when it differs from the last one sent.
struct StatusReporter {
    tx: MessageSender,
    last: CaptureStatus,
}

impl StatusReporter {
    fn report(&mut self, status: CaptureStatus) {
        if status == self.last {
            return;
        }
        debug!(%status, "worker status");
        self.last = status;
        self.send(WorkerMessage::Status(status));
    }

    fn send(&self, message: WorkerMessage) {
        // The supervisor going away is not the worker's problem; it keeps
        // capturing until cancelled.
        if self.tx.send(message).is_err() {
            debug!("supervisor channel closed");
        }
    }
}

pub struct Worker {
    spec: WorkerSpec,
    settings: WorkerSettings,
    source: Box<dyn StreamSource>,
    output: Option<RotatingOutputFile>,
    reporter: StatusReporter,
}

impl Worker {
    pub fn new(
        spec: WorkerSpec,
        settings: WorkerSettings,
        source: Box<dyn StreamSource>,
        tx: MessageSender,
    ) -> Self {
        Self {
            spec,
            settings,
            source,
            output: None,
            reporter: StatusReporter { tx, last: CaptureStatus::CREATED },
        }
    }

    /// Capture until the source disconnects or `cancel` fires, then shut
    /// down. Shutdown runs whether or not capture failed.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<(), WorkerError> {
        info!(
            name = %self.spec.name,
            terms = %self.spec.terms.joined(),
            total = self.spec.total,
            "worker starting"
        );
        self.reporter.report(CaptureStatus::STARTING);

        let result = self.capture(&cancel).await;
        if let Err(e) = &result {
            warn!(name = %self.spec.name, error = %e, "capture failed");
        }
        self.shutdown().await;
        result
    }

    async fn capture(&mut self, cancel: &CancellationToken) -> Result<(), WorkerError> {
        let output = self.output.insert(RotatingOutputFile::new(
            self.settings.output.clone(),
            &self.spec.name,
        )?);
        self.source.configure(&self.settings.source)?;
        self.source.initialize().await?;

        let mut sink = CaptureSink {
            output,
            reporter: &mut self.reporter,
            stats: WorkerStats::new(self.spec.total, Instant::now()),
            update_interval: self.settings.update_interval,
            cancel,
        };
        self.source.run(&mut sink, cancel).await?;

        if cancel.is_cancelled() {
            info!(name = %self.spec.name, "capture cancelled");
        } else {
            info!(name = %self.spec.name, "source disconnected");
        }
        Ok(())
    }

    /// Tear down source and output independently; a failure in one does
    /// not skip the other.
    async fn shutdown(&mut self) {
        self.reporter.report(CaptureStatus::STOPPING);

        if let Err(e) = self.source.shutdown().await {
            warn!(name = %self.spec.name, error = %e, "source shutdown failed");
        }
        if let Some(output) = self.output.take() {
            match output.finalize() {
                Ok(Some(path)) => info!(path = %path.display(), "output finalized"),
                Ok(None) => {}
                Err(e) => warn!(name = %self.spec.name, error = %e, "output shutdown failed"),
            }
        }

        self.reporter.report(CaptureStatus::STOPPED);
        info!(name = %self.spec.name, "worker stopped");
    }
}

/// Per-event handling while the source runs.
struct CaptureSink<'a> {
    output: &'a RotatingOutputFile,
    reporter: &'a mut StatusReporter,
    stats: WorkerStats,
    update_interval: Duration,
    cancel: &'a CancellationToken,
}

impl EventSink for CaptureSink<'_> {
    fn on_event(&mut self, record: &str) -> Flow {
        if self.cancel.is_cancelled() {
            return Flow::Stop;
        }

        self.stats.record();
        if let Err(e) = self.output.write(record) {
            warn!(error = %e, "failed to write record");
        }
        self.reporter.report(CaptureStatus::STARTED);

        let now = Instant::now();
        if self.stats.due(now, self.update_interval) {
            let update = self.stats.sample(now, SystemClock.epoch_ms());
            self.reporter.send(WorkerMessage::Update(update));
        }
        Flow::Continue
    }
}

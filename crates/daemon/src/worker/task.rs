// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker as a tokio task inside the supervisor process.
//!
//! Cheaper than a child process, but a worker that panics or wedges the
//! runtime takes the supervisor with it.

use std::sync::Arc;

use async_trait::async_trait;
use capd_adapters::{CommandSource, StreamSource};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{LaunchError, Worker, WorkerHandle, WorkerLauncher, WorkerSettings, WorkerSpec};
use crate::channel::MessageSender;

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;

/// Builds the streaming source for a worker.
pub type SourceFactory = Arc<dyn Fn(&WorkerSpec) -> Box<dyn StreamSource> + Send + Sync>;

/// Sources that run the configured feed program with the worker's terms.
pub fn command_source_factory() -> SourceFactory {
    Arc::new(|spec: &WorkerSpec| {
        Box::new(CommandSource::new(spec.terms.terms().to_vec())) as Box<dyn StreamSource>
    })
}

pub struct TaskLauncher {
    settings: WorkerSettings,
    sources: SourceFactory,
}

impl TaskLauncher {
    pub fn new(settings: WorkerSettings) -> Self {
        Self::with_sources(settings, command_source_factory())
    }

    pub fn with_sources(settings: WorkerSettings, sources: SourceFactory) -> Self {
        Self { settings, sources }
    }
}

impl WorkerLauncher for TaskLauncher {
    fn launch(
        &self,
        spec: WorkerSpec,
        tx: MessageSender,
    ) -> Result<Box<dyn WorkerHandle>, LaunchError> {
        let cancel = CancellationToken::new();
        let source = (self.sources)(&spec);
        let name = spec.name.clone();
        let worker = Worker::new(spec, self.settings.clone(), source, tx);
        let task = tokio::spawn(worker.run(cancel.clone()));

        info!(%name, "worker task started");
        Ok(Box::new(TaskHandle { cancel, task: Some(task) }))
    }
}

struct TaskHandle {
    cancel: CancellationToken,
    /// Taken on reap.
    task: Option<JoinHandle<Result<(), super::WorkerError>>>,
}

#[async_trait]
impl WorkerHandle for TaskHandle {
    fn cancel(&mut self) {
        self.cancel.cancel();
    }

    fn has_exited(&mut self) -> bool {
        match &self.task {
            Some(task) => task.is_finished(),
            None => true,
        }
    }

    fn kill(&mut self) {
        if let Some(task) = &self.task {
            warn!("aborting worker task");
            task.abort();
        }
    }

    async fn reap(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        match task.await {
            Ok(Ok(())) => {}
            // Already logged by the worker
            Ok(Err(_)) => {}
            Err(e) if e.is_cancelled() => {}
            Err(e) => warn!(error = %e, "worker task panicked"),
        }
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use async_trait::async_trait;
use thiserror::Error;

use super::WorkerSpec;
use crate::channel::MessageSender;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("failed to spawn worker process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("worker process has no {0} pipe")]
    MissingPipe(&'static str),
}

/// Starts workers in some isolated execution context.
pub trait WorkerLauncher: Send + Sync + 'static {
    /// Start a worker that reports over `tx`.
    fn launch(
        &self,
        spec: WorkerSpec,
        tx: MessageSender,
    ) -> Result<Box<dyn WorkerHandle>, LaunchError>;
}

/// Supervisor's grip on a running worker.
#[async_trait]
pub trait WorkerHandle: Send {
    /// Raise the one-shot cancellation signal. Repeated calls are harmless.
    fn cancel(&mut self);

    /// Non-blocking liveness check.
    fn has_exited(&mut self) -> bool;

    /// Last resort for a worker that ignores cancellation.
    fn kill(&mut self);

    /// Reclaim the exited worker and wait for its last messages to reach
    /// the channel.
    async fn reap(&mut self);
}

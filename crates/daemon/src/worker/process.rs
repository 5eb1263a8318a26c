// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker in a child process.
//!
//! The supervisor runs `capd worker ...` with piped stdin and stdout. The
//! child writes length-prefixed `WorkerMessage` frames to stdout; the
//! supervisor closing the child's stdin is the cancellation signal.

use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use capd_adapters::CommandSource;
use capd_wire::WorkerMessage;
use tokio::io::AsyncWrite;
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{LaunchError, Worker, WorkerError, WorkerHandle, WorkerLauncher, WorkerSettings, WorkerSpec};
use crate::channel::{pump_frames, MessageSender};

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;

/// Upper bound on waiting for a reaped worker's last frames.
const PUMP_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

pub struct ProcessLauncher {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ProcessLauncher {
    /// Launch `program worker --config=<config_path> ...`.
    pub fn new(program: impl Into<PathBuf>, config_path: &Path) -> Self {
        let mut config = OsString::from("--config=");
        config.push(config_path);
        let args = vec!["worker".into(), config];
        Self { program: program.into(), args }
    }

    /// Launch `program <args> ...` with the worker name, terms and total appended.
    pub fn with_args<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self { program: program.into(), args: args.into_iter().map(Into::into).collect() }
    }

    fn command(&self, spec: &WorkerSpec) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            // `--flag=value` so values starting with `-` are not read as flags
            .arg(format!("--name={}", spec.name))
            .arg(format!("--terms={}", spec.terms.joined()))
            .arg(format!("--total={}", spec.total))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        cmd
    }
}

impl WorkerLauncher for ProcessLauncher {
    fn launch(
        &self,
        spec: WorkerSpec,
        tx: MessageSender,
    ) -> Result<Box<dyn WorkerHandle>, LaunchError> {
        let mut child = self.command(&spec).spawn().map_err(LaunchError::Spawn)?;
        let stdin = child.stdin.take().ok_or(LaunchError::MissingPipe("stdin"))?;
        let stdout = child.stdout.take().ok_or(LaunchError::MissingPipe("stdout"))?;
        let pump = tokio::spawn(pump_frames(stdout, tx));

        info!(name = %spec.name, pid = child.id().unwrap_or_default(), "worker process started");
        Ok(Box::new(ProcessHandle { child, stdin: Some(stdin), pump: Some(pump) }))
    }
}

struct ProcessHandle {
    child: Child,
    stdin: Option<ChildStdin>,
    pump: Option<JoinHandle<()>>,
}

#[async_trait]
impl WorkerHandle for ProcessHandle {
    fn cancel(&mut self) {
        if self.stdin.take().is_some() {
            debug!(pid = self.child.id().unwrap_or_default(), "closed worker stdin");
        }
    }

    fn has_exited(&mut self) -> bool {
        match self.child.try_wait() {
            Ok(Some(status)) => {
                debug!(%status, "worker process exited");
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "failed to poll worker process");
                true
            }
        }
    }

    fn kill(&mut self) {
        warn!(pid = self.child.id().unwrap_or_default(), "killing worker process");
        if let Err(e) = self.child.start_kill() {
            warn!(error = %e, "failed to kill worker process");
        }
    }

    async fn reap(&mut self) {
        self.stdin.take();
        if let Err(e) = self.child.wait().await {
            warn!(error = %e, "failed to reap worker process");
        }
        if let Some(pump) = self.pump.take() {
            if tokio::time::timeout(PUMP_DRAIN_TIMEOUT, pump).await.is_err() {
                warn!("worker output still open after exit");
            }
        }
    }
}

/// Body of `capd worker`: run one worker against the configured source,
/// reporting on stdout, until stdin closes or the source disconnects.
pub async fn serve_process(spec: WorkerSpec, settings: WorkerSettings) -> Result<(), WorkerError> {
    let cancel = CancellationToken::new();
    cancel_on_close(std::io::stdin(), cancel.clone());
    tokio::spawn(cancel_on_interrupt(cancel.clone()));

    let (tx, rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(forward_frames(rx, tokio::io::stdout()));

    let source = Box::new(CommandSource::new(spec.terms.terms().to_vec()));
    let result = Worker::new(spec, settings, source, tx).run(cancel).await;

    if let Err(e) = writer.await {
        warn!(error = %e, "frame writer failed");
    }
    result
}

/// Cancel once `reader` reaches EOF.
///
/// Runs on a plain detached thread: a blocking read cannot be interrupted,
/// and a detached thread does not hold up process exit.
fn cancel_on_close<R: Read + Send + 'static>(mut reader: R, cancel: CancellationToken) {
    std::thread::spawn(move || {
        let _ = std::io::copy(&mut reader, &mut std::io::sink());
        debug!("supervisor closed stdin");
        cancel.cancel();
    });
}

async fn cancel_on_interrupt(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        debug!("worker interrupted");
        cancel.cancel();
    }
}

/// Write every message as one frame until all senders are gone.
async fn forward_frames<W: AsyncWrite + Unpin>(
    mut rx: mpsc::UnboundedReceiver<WorkerMessage>,
    mut writer: W,
) {
    while let Some(message) = rx.recv().await {
        if let Err(e) = capd_wire::write_worker_message(&mut writer, &message).await {
            warn!(error = %e, "failed to write worker message");
            return;
        }
    }
}

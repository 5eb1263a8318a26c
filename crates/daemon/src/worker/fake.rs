// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use async_trait::async_trait;
use capd_core::CaptureStatus;
use capd_wire::WorkerMessage;
use parking_lot::Mutex;

use super::{LaunchError, WorkerHandle, WorkerLauncher, WorkerSpec};
use crate::channel::MessageSender;

/// One recorded launch and what happened to it since.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRecord {
    pub spec: WorkerSpec,
    pub cancelled: bool,
    pub killed: bool,
    pub exited: bool,
}

struct FakeLauncherState {
    launches: Vec<LaunchRecord>,
    senders: Vec<MessageSender>,
    report_status: bool,
    ignore_cancel: bool,
    fail: bool,
}

impl FakeLauncherState {
    fn send(&self, index: usize, message: WorkerMessage) {
        if let Some(tx) = self.senders.get(index) {
            let _ = tx.send(message);
        }
    }
}

/// Launcher whose workers exist only as records.
///
/// By default a fake worker behaves like a real one that connects at once:
/// it reports STARTING then STARTED on launch, and STOPPING then STOPPED
/// when cancelled.
#[derive(Clone)]
pub struct FakeLauncher {
    inner: Arc<Mutex<FakeLauncherState>>,
}

impl Default for FakeLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeLauncherState {
                launches: Vec::new(),
                senders: Vec::new(),
                report_status: true,
                ignore_cancel: false,
                fail: false,
            })),
        }
    }

    /// Workers that never report status on their own.
    pub fn silent(self) -> Self {
        self.inner.lock().report_status = false;
        self
    }

    /// Workers that only exit when killed.
    pub fn ignore_cancel(self) -> Self {
        self.inner.lock().ignore_cancel = true;
        self
    }

    pub fn fail_launches(&self, fail: bool) {
        self.inner.lock().fail = fail;
    }

    pub fn launches(&self) -> Vec<LaunchRecord> {
        self.inner.lock().launches.clone()
    }

    pub fn launch_count(&self) -> usize {
        self.inner.lock().launches.len()
    }

    /// Workers launched and not yet exited.
    pub fn running(&self) -> usize {
        self.inner.lock().launches.iter().filter(|l| !l.exited).count()
    }

    /// Make worker `index` exit on its own, without reporting anything.
    pub fn crash(&self, index: usize) {
        if let Some(launch) = self.inner.lock().launches.get_mut(index) {
            launch.exited = true;
        }
    }

    /// Send `message` as worker `index`.
    pub fn send(&self, index: usize, message: WorkerMessage) {
        self.inner.lock().send(index, message);
    }
}

impl WorkerLauncher for FakeLauncher {
    fn launch(
        &self,
        spec: WorkerSpec,
        tx: MessageSender,
    ) -> Result<Box<dyn WorkerHandle>, LaunchError> {
        let mut state = self.inner.lock();
        if state.fail {
            return Err(LaunchError::Spawn(std::io::Error::other("fake launch failure")));
        }
        let index = state.launches.len();
        state.launches.push(LaunchRecord { spec, cancelled: false, killed: false, exited: false });
        state.senders.push(tx);
        if state.report_status {
            state.send(index, WorkerMessage::Status(CaptureStatus::STARTING));
            state.send(index, WorkerMessage::Status(CaptureStatus::STARTED));
        }
        Ok(Box::new(FakeHandle { index, inner: Arc::clone(&self.inner) }))
    }
}

struct FakeHandle {
    index: usize,
    inner: Arc<Mutex<FakeLauncherState>>,
}

#[async_trait]
impl WorkerHandle for FakeHandle {
    fn cancel(&mut self) {
        let mut state = self.inner.lock();
        let ignore = state.ignore_cancel;
        let report = state.report_status;
        let Some(launch) = state.launches.get_mut(self.index) else {
            return;
        };
        launch.cancelled = true;
        if ignore || launch.exited {
            return;
        }
        launch.exited = true;
        if report {
            state.send(self.index, WorkerMessage::Status(CaptureStatus::STOPPING));
            state.send(self.index, WorkerMessage::Status(CaptureStatus::STOPPED));
        }
    }

    fn has_exited(&mut self) -> bool {
        self.inner.lock().launches.get(self.index).map(|l| l.exited).unwrap_or(true)
    }

    fn kill(&mut self) {
        if let Some(launch) = self.inner.lock().launches.get_mut(self.index) {
            launch.killed = true;
            launch.exited = true;
        }
    }

    async fn reap(&mut self) {}
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{EventSink, Flow, SourceConfig, SourceError, StreamSource};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Recorded source call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceCall {
    Configure,
    Initialize,
    Run,
    Shutdown,
}

/// Source that replays fixed records. Clones share the call log.
#[derive(Clone)]
pub struct FakeSource {
    records: Vec<String>,
    hold_open: bool,
    fail_shutdown: bool,
    calls: Arc<Mutex<Vec<SourceCall>>>,
}

impl FakeSource {
    pub fn new<S: Into<String>>(records: impl IntoIterator<Item = S>) -> Self {
        Self {
            records: records.into_iter().map(Into::into).collect(),
            hold_open: false,
            fail_shutdown: false,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// After the records, stay connected until cancelled instead of
    /// disconnecting.
    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    /// Make `shutdown` fail.
    pub fn fail_shutdown(mut self) -> Self {
        self.fail_shutdown = true;
        self
    }

    pub fn calls(&self) -> Vec<SourceCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl StreamSource for FakeSource {
    fn configure(&mut self, _config: &SourceConfig) -> Result<(), SourceError> {
        self.calls.lock().push(SourceCall::Configure);
        Ok(())
    }

    async fn initialize(&mut self) -> Result<(), SourceError> {
        self.calls.lock().push(SourceCall::Initialize);
        Ok(())
    }

    async fn run(
        &mut self,
        sink: &mut dyn EventSink,
        cancel: &CancellationToken,
    ) -> Result<(), SourceError> {
        self.calls.lock().push(SourceCall::Run);
        for record in &self.records {
            if cancel.is_cancelled() {
                return Ok(());
            }
            if sink.on_event(record) == Flow::Stop {
                return Ok(());
            }
            tokio::task::yield_now().await;
        }
        if self.hold_open {
            cancel.cancelled().await;
        }
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), SourceError> {
        self.calls.lock().push(SourceCall::Shutdown);
        if self.fail_shutdown {
            return Err(SourceError::Io(std::io::Error::other("fake shutdown failure")));
        }
        Ok(())
    }
}

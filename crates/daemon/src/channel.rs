// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker-to-supervisor message channel.
//!
//! Status and update messages only flow from the worker to the supervisor.
//! Control flows the other way through a cancellation signal, never through
//! this channel.

use async_trait::async_trait;
use capd_core::CaptureStatus;
use capd_wire::{ProtocolError, UpdateData, WorkerMessage};
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tracing::{debug, error};

#[cfg(test)]
#[path = "channel_tests.rs"]
mod tests;

/// Worker side of the channel. Sends never block.
pub type MessageSender = mpsc::UnboundedSender<WorkerMessage>;

/// Supervisor side of the channel.
///
/// One channel outlives every worker of a job; each worker gets a fresh
/// sender from [`WorkerChannel::sender`].
pub struct WorkerChannel {
    tx: MessageSender,
    rx: mpsc::UnboundedReceiver<WorkerMessage>,
}

impl Default for WorkerChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkerChannel {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    pub fn sender(&self) -> MessageSender {
        self.tx.clone()
    }

    /// Next pending message, or `None` immediately if there is none.
    pub fn try_recv(&mut self) -> Option<WorkerMessage> {
        self.rx.try_recv().ok()
    }
}

/// Receiver of worker messages.
///
/// A handler overrides the methods for the messages it cares about; the
/// rest are logged at debug level and dropped.
#[async_trait]
pub trait MessageHandler: Send {
    async fn on_status(&mut self, status: CaptureStatus) {
        debug!(%status, "no status handler, dropping message");
    }

    async fn on_update(&mut self, update: UpdateData) {
        debug!(?update, "no update handler, dropping message");
    }
}

/// Route one message to the handler method for its tag.
pub async fn dispatch<H: MessageHandler + ?Sized>(handler: &mut H, message: WorkerMessage) {
    match message {
        WorkerMessage::Status(status) => handler.on_status(status).await,
        WorkerMessage::Update(update) => handler.on_update(update).await,
    }
}

/// Forward frames from a worker process's stdout into the channel until the
/// stream closes. Malformed frames are logged and dropped.
pub async fn pump_frames<R: AsyncRead + Unpin>(mut reader: R, tx: MessageSender) {
    loop {
        match capd_wire::read_worker_message(&mut reader).await {
            Ok(message) => {
                if tx.send(message).is_err() {
                    debug!("channel closed, stopping frame pump");
                    return;
                }
            }
            Err(e) if e.is_malformed() => error!(error = %e, "dropping malformed worker message"),
            Err(ProtocolError::ConnectionClosed) => {
                debug!("worker output closed");
                return;
            }
            Err(e) => {
                error!(error = %e, "worker output failed");
                return;
            }
        }
    }
}

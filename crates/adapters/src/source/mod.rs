// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Streaming data source adapter.
//!
//! A source delivers opaque text records, one per event, to an [`EventSink`]
//! until it disconnects, the sink asks it to stop, or it is cancelled.

mod command;

pub use command::CommandSource;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source is not configured: {0}")]
    NotConfigured(String),

    #[error("source is not initialized")]
    NotInitialized,

    #[error("failed to start source: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("source IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Source settings, read from the `[source]` config section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    /// Program and leading arguments. The current terms are appended as
    /// `--track <a,b,c>`.
    pub command: Vec<String>,
}

/// Whether the source should keep delivering events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Receiver of source events.
pub trait EventSink: Send {
    fn on_event(&mut self, record: &str) -> Flow;
}

#[async_trait]
pub trait StreamSource: Send {
    fn configure(&mut self, config: &SourceConfig) -> Result<(), SourceError>;

    /// Establish the connection.
    async fn initialize(&mut self) -> Result<(), SourceError>;

    /// Deliver events to `sink` until disconnect, [`Flow::Stop`], or `cancel`.
    async fn run(
        &mut self,
        sink: &mut dyn EventSink,
        cancel: &CancellationToken,
    ) -> Result<(), SourceError>;

    async fn shutdown(&mut self) -> Result<(), SourceError>;
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeSource, SourceCall};

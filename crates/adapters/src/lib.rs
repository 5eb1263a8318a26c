// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Adapters for the agent's external collaborators: the remote job
//! coordinator and the streaming data source.

pub mod coordinator;
pub mod source;

pub use coordinator::{CachedCoordinator, Coordinator, CoordinatorError, HttpCoordinator};
pub use source::{CommandSource, EventSink, Flow, SourceConfig, SourceError, StreamSource};

#[cfg(any(test, feature = "test-support"))]
pub use coordinator::{CoordinatorCall, FakeCoordinator};
#[cfg(any(test, feature = "test-support"))]
pub use source::{FakeSource, SourceCall};

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Capture agent daemon
//!
//! Claims a job from the coordinator, supervises one capture worker for it,
//! and keeps the coordinator's view of the job in step with the worker.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod channel;
pub mod claimer;
pub mod config;
pub mod env;
pub mod logging;
pub mod supervisor;
pub mod terms;
pub mod worker;

#[cfg(test)]
mod test_helpers;

pub use channel::{dispatch, MessageHandler, MessageSender, WorkerChannel};
pub use claimer::{ClaimError, JobClaimer};
pub use config::{Config, ConfigError, Isolation};
pub use supervisor::{Supervisor, SupervisorSettings};
pub use terms::TermTracker;
pub use worker::{
    serve_process, LaunchError, ProcessLauncher, TaskLauncher, Worker, WorkerError, WorkerHandle,
    WorkerLauncher, WorkerSettings, WorkerSpec,
};

#[cfg(any(test, feature = "test-support"))]
pub use worker::{FakeLauncher, LaunchRecord};

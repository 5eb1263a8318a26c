// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status reconciliation between coordinator and worker.

use capd_core::CaptureStatus;

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    Start,
    Stop,
}

/// Outcome of one reconciliation pass: at most one corrective action and
/// at most one status to push back to the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub action: Action,
    pub report: Option<CaptureStatus>,
}

impl Decision {
    const NOTHING: Decision = Decision { action: Action::None, report: None };
}

/// Compare the coordinator's desired status with the worker's last
/// reported one.
pub fn decide(remote: CaptureStatus, local: CaptureStatus) -> Decision {
    if remote == local {
        return Decision::NOTHING;
    }

    if remote.is_stopped() {
        if !local.is_running() {
            return Decision::NOTHING;
        }
        let report = (remote == CaptureStatus::STOPPING).then_some(CaptureStatus::STOPPED);
        return Decision { action: Action::Stop, report };
    }

    if local == CaptureStatus::STARTED {
        // Coordinator still says STARTING; the worker is further along.
        Decision { action: Action::None, report: Some(CaptureStatus::STARTED) }
    } else {
        Decision { action: Action::Start, report: None }
    }
}

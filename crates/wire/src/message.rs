// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use capd_core::{CaptureStatus, Progress};
use serde::{Deserialize, Serialize};

/// Message from a worker to its supervisor.
///
/// Serialized adjacently tagged: `{"type": "status", "data": 3}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum WorkerMessage {
    /// Worker lifecycle transition
    Status(CaptureStatus),

    /// Periodic throughput sample
    Update(UpdateData),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UpdateData {
    /// Sample time, epoch milliseconds
    pub time: u64,
    pub received: u64,
    pub rate: f64,
    pub total: u64,
}

impl UpdateData {
    pub fn progress(&self) -> Progress {
        Progress { received: self.received, total: self.total, rate: self.rate }
    }
}

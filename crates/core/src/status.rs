// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Capture lifecycle status shared by the coordinator, supervisor and worker.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a job or worker.
///
/// Stored as the raw integer code the coordinator uses so that codes this
/// agent does not know about survive a round trip and still render in logs.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaptureStatus(i64);

impl CaptureStatus {
    pub const UNKNOWN: Self = Self(0);
    pub const CREATED: Self = Self(1);
    pub const STARTING: Self = Self(2);
    pub const STARTED: Self = Self(3);
    pub const STOPPING: Self = Self(4);
    pub const STOPPED: Self = Self(5);
    pub const UNRESPONSIVE: Self = Self(6);
    pub const DEAD: Self = Self(7);

    pub const fn from_code(code: i64) -> Self {
        Self(code)
    }

    pub const fn code(self) -> i64 {
        self.0
    }

    /// True for STARTING and STARTED.
    pub fn is_running(self) -> bool {
        matches!(self, Self::STARTING | Self::STARTED)
    }

    pub fn is_stopped(self) -> bool {
        !self.is_running()
    }

    /// Symbolic name, or `None` for a code outside the known range.
    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            Self::UNKNOWN => "STATUS_UNKNOWN",
            Self::CREATED => "STATUS_CREATED",
            Self::STARTING => "STATUS_STARTING",
            Self::STARTED => "STATUS_STARTED",
            Self::STOPPING => "STATUS_STOPPING",
            Self::STOPPED => "STATUS_STOPPED",
            Self::UNRESPONSIVE => "STATUS_UNRESPONSIVE",
            Self::DEAD => "STATUS_DEAD",
            _ => return None,
        };
        Some(name)
    }
}

impl From<i64> for CaptureStatus {
    fn from(code: i64) -> Self {
        Self(code)
    }
}

impl fmt::Display for CaptureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} ({})", name, self.0),
            None => write!(f, "<<INVALID STATUS ({})>>", self.0),
        }
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;

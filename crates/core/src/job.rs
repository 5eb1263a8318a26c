// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordinator-owned job records, as seen by the agent.

use crate::status::CaptureStatus;
use crate::terms::TermSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coordinator identifier for a job.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub i64);

impl JobId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for JobId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Snapshot of a job as reported by the coordinator.
///
/// The agent never owns this record. Fields it does not interpret are kept in
/// `extra` so a snapshot can be written back without dropping data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    #[serde(default)]
    pub id: JobId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: CaptureStatus,
    #[serde(default)]
    pub total_count: Option<u64>,
    /// Comma-joined filter terms.
    #[serde(default, rename = "twitter_keywords")]
    pub terms: Option<String>,
    #[serde(default)]
    pub archived_date: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Job {
    pub fn new(id: impl Into<JobId>, name: impl Into<String>, status: CaptureStatus) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status,
            total_count: None,
            terms: None,
            archived_date: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_terms(mut self, terms: impl Into<String>) -> Self {
        self.terms = Some(terms.into());
        self
    }

    pub fn with_total(mut self, total: u64) -> Self {
        self.total_count = Some(total);
        self
    }

    pub fn with_archived_date(mut self, date: impl Into<String>) -> Self {
        self.archived_date = Some(date.into());
        self
    }

    /// Parsed filter terms of this snapshot.
    pub fn term_set(&self) -> TermSet {
        TermSet::parse(self.terms.as_deref())
    }

    pub fn total(&self) -> u64 {
        self.total_count.unwrap_or(0)
    }

    pub fn is_archived(&self) -> bool {
        self.archived_date.is_some()
    }
}

/// Response of the coordinator's active-jobs query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobList {
    pub count: usize,
    #[serde(default)]
    pub results: Vec<Job>,
}

impl JobList {
    pub fn new(results: Vec<Job>) -> Self {
        Self { count: results.len(), results }
    }
}

/// Throughput sample forwarded from the worker to the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Progress {
    /// Records received since the previous sample.
    pub received: u64,
    /// Running total for the job.
    pub total: u64,
    /// Records per second over the sample window.
    pub rate: f64,
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;

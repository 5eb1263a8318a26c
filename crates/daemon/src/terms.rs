// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Detects changes to a job's filter terms between polls.

use capd_core::{Job, TermSet};
use tracing::info;

#[cfg(test)]
#[path = "terms_tests.rs"]
mod tests;

/// Remembers the last term set seen in a job snapshot.
///
/// The `changed` flag is sticky: `check` only ever sets it, and the consumer
/// clears it with `reset_changed` once the new terms are applied.
#[derive(Debug, Default)]
pub struct TermTracker {
    terms: TermSet,
    changed: bool,
}

impl TermTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare the snapshot's terms with the stored ones, replacing them and
    /// raising the changed flag on any difference. Returns the flag.
    pub fn check(&mut self, snapshot: &Job) -> bool {
        let current = snapshot.term_set();
        if current != self.terms {
            let (added, removed) = current.diff(&self.terms);
            info!(job_id = %snapshot.id, ?added, ?removed, "terms changed");
            self.terms = current;
            self.changed = true;
        }
        self.changed
    }

    pub fn changed(&self) -> bool {
        self.changed
    }

    pub fn reset_changed(&mut self) {
        self.changed = false;
    }

    pub fn terms(&self) -> &TermSet {
        &self.terms
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filter term lists.

use std::collections::BTreeSet;

/// Ordered list of trimmed, non-empty filter terms.
///
/// Equality compares the set of terms, not their order, so a coordinator
/// reordering the same terms is not a change.
#[derive(Debug, Clone, Default)]
pub struct TermSet {
    terms: Vec<String>,
    set: BTreeSet<String>,
}

impl TermSet {
    /// Parse a comma-separated term field. `None` yields an empty set.
    pub fn parse(raw: Option<&str>) -> Self {
        let terms = raw
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        Self::from_terms(terms)
    }

    pub fn from_terms(terms: impl IntoIterator<Item = String>) -> Self {
        let terms: Vec<String> = terms.into_iter().collect();
        let set = terms.iter().cloned().collect();
        Self { terms, set }
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Terms in `self` missing from `previous`, and terms in `previous`
    /// missing from `self`.
    pub fn diff(&self, previous: &TermSet) -> (Vec<String>, Vec<String>) {
        let added = self.set.difference(&previous.set).cloned().collect();
        let removed = previous.set.difference(&self.set).cloned().collect();
        (added, removed)
    }

    /// Comma-joined form, as the coordinator stores it.
    pub fn joined(&self) -> String {
        self.terms.join(",")
    }
}

impl PartialEq for TermSet {
    fn eq(&self, other: &Self) -> bool {
        self.set == other.set
    }
}

impl Eq for TermSet {}

#[cfg(test)]
#[path = "terms_tests.rs"]
mod tests;

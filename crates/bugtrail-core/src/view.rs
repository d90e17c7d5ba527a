//! Caller-owned cache of one project and its bug list.
//!
//! The lifecycle rules and the ordering engine hold no state. The view is
//! where the current snapshot lives: the caller passes it to the tracker,
//! which merges store-confirmed records into it after each successful
//! mutation.

use std::collections::HashSet;

use crate::error::{Result, TrackerError};
use crate::model::{Bug, BugSummary, Project, User};
use crate::ordering::{FilterSet, SortCriterion, sort_bugs};

/// Entity ids with a write in flight.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PendingMutations {
    in_flight: HashSet<String>,
}

impl PendingMutations {
    /// Mark `id` in flight.
    ///
    /// # Errors
    ///
    /// `Validation` when a mutation for `id` has not finished yet.
    pub fn begin(&mut self, id: &str) -> Result<()> {
        if !self.in_flight.insert(id.to_string()) {
            return Err(TrackerError::validation(
                "mutation",
                format!("a change to '{id}' is already in progress"),
            ));
        }
        Ok(())
    }

    pub fn finish(&mut self, id: &str) {
        self.in_flight.remove(id);
    }

    #[must_use]
    pub fn is_pending(&self, id: &str) -> bool {
        self.in_flight.contains(id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }
}

/// Snapshot of a project page: the project, its roster, its bugs and the
/// active filter/sort selection.
#[derive(Debug, Clone)]
pub struct ProjectView {
    pub project: Project,
    pub developers: Vec<User>,
    pub bugs: Vec<BugSummary>,
    pub filters: FilterSet,
    pub sort: SortCriterion,
    pub pending: PendingMutations,
}

impl ProjectView {
    #[must_use]
    pub fn new(project: Project, developers: Vec<User>, bugs: Vec<BugSummary>) -> Self {
        Self {
            project,
            developers,
            bugs,
            filters: FilterSet::default(),
            sort: SortCriterion::default(),
            pending: PendingMutations::default(),
        }
    }

    #[must_use]
    pub fn with_selection(mut self, filters: FilterSet, sort: SortCriterion) -> Self {
        self.filters = filters;
        self.sort = sort;
        self
    }

    /// Rows to display: filtered, then sorted. Recomputed on every call.
    #[must_use]
    pub fn visible(&self) -> Vec<&BugSummary> {
        let rows: Vec<&BugSummary> = self.bugs.iter().collect();
        sort_bugs(&self.filters.apply(&rows), self.sort)
    }

    #[must_use]
    pub fn bug(&self, bug_id: &str) -> Option<&BugSummary> {
        self.bugs.iter().find(|b| b.id == bug_id)
    }

    /// Replace the cached row for `bug` (or add it) and carry its
    /// `updated_at` up to the project.
    pub fn merge_bug(&mut self, bug: &Bug) {
        let row = bug.summary();
        match self.bugs.iter_mut().find(|b| b.id == row.id) {
            Some(existing) => *existing = row,
            None => self.bugs.push(row),
        }
        if bug.updated_at > self.project.updated_at {
            self.project.updated_at = bug.updated_at;
        }
    }
}

//! List ordering: filter and sort bug collections for display.
//!
//! Everything here is a pure function over an in-memory slice. Inputs are
//! never reordered in place; callers get a fresh `Vec` back. Sorting is
//! stable, so equal keys keep their original relative order and applying the
//! same criterion twice yields the same sequence.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Bug, BugSummary, ParseEnumError, Priority, Project, Status};

// ---------------------------------------------------------------------------
// Sort criteria
// ---------------------------------------------------------------------------

/// Sort key for bug lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortCriterion {
    /// Newest first by creation time.
    #[default]
    Recent,
    /// Oldest first by creation time.
    Oldest,
    /// `CRITICAL` first.
    HighestPriority,
    /// `LOW` first.
    LowestPriority,
    MostComments,
    LeastComments,
}

impl SortCriterion {
    /// Menu order of the sort picker.
    pub const ALL: [Self; 6] = [
        Self::MostComments,
        Self::LeastComments,
        Self::HighestPriority,
        Self::LowestPriority,
        Self::Recent,
        Self::Oldest,
    ];

    /// URL/CLI slug, e.g. `most-comments`.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Recent => "recent",
            Self::Oldest => "oldest",
            Self::HighestPriority => "highest-priority",
            Self::LowestPriority => "lowest-priority",
            Self::MostComments => "most-comments",
            Self::LeastComments => "least-comments",
        }
    }

    fn compare<T: Rankable>(self, a: &T, b: &T) -> Ordering {
        match self {
            Self::Recent => b.created_at().cmp(&a.created_at()),
            Self::Oldest => a.created_at().cmp(&b.created_at()),
            Self::HighestPriority => a.priority().rank().cmp(&b.priority().rank()),
            Self::LowestPriority => b.priority().rank().cmp(&a.priority().rank()),
            Self::MostComments => b.comment_count().cmp(&a.comment_count()),
            Self::LeastComments => a.comment_count().cmp(&b.comment_count()),
        }
    }
}

impl fmt::Display for SortCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for SortCriterion {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "recent" | "newest" => Ok(Self::Recent),
            "oldest" => Ok(Self::Oldest),
            "highest-priority" => Ok(Self::HighestPriority),
            "lowest-priority" => Ok(Self::LowestPriority),
            "most-comments" => Ok(Self::MostComments),
            "least-comments" => Ok(Self::LeastComments),
            _ => Err(ParseEnumError {
                expected: "sort criterion",
                got: s.to_string(),
            }),
        }
    }
}

/// Display label for a sort criterion.
#[must_use]
pub const fn label_for(criterion: SortCriterion) -> &'static str {
    match criterion {
        SortCriterion::Recent => "Newest",
        SortCriterion::Oldest => "Oldest",
        SortCriterion::HighestPriority => "Highest Priority",
        SortCriterion::LowestPriority => "Lowest Priority",
        SortCriterion::MostComments => "Most Comments",
        SortCriterion::LeastComments => "Least Comments",
    }
}

// ---------------------------------------------------------------------------
// Rankable
// ---------------------------------------------------------------------------

/// The fields the ordering engine reads from a bug-like row.
pub trait Rankable {
    fn id(&self) -> &str;
    fn status(&self) -> Status;
    fn priority(&self) -> Priority;
    fn created_at(&self) -> DateTime<Utc>;
    fn comment_count(&self) -> usize;
}

impl Rankable for Bug {
    fn id(&self) -> &str {
        &self.id
    }
    fn status(&self) -> Status {
        self.status
    }
    fn priority(&self) -> Priority {
        self.priority
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn comment_count(&self) -> usize {
        self.comments.len()
    }
}

impl Rankable for BugSummary {
    fn id(&self) -> &str {
        &self.id
    }
    fn status(&self) -> Status {
        self.status
    }
    fn priority(&self) -> Priority {
        self.priority
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn comment_count(&self) -> usize {
        self.comment_count
    }
}

impl<T: Rankable + ?Sized> Rankable for &T {
    fn id(&self) -> &str {
        (**self).id()
    }
    fn status(&self) -> Status {
        (**self).status()
    }
    fn priority(&self) -> Priority {
        (**self).priority()
    }
    fn created_at(&self) -> DateTime<Utc> {
        (**self).created_at()
    }
    fn comment_count(&self) -> usize {
        (**self).comment_count()
    }
}

// ---------------------------------------------------------------------------
// Sorting and filtering
// ---------------------------------------------------------------------------

/// Return `bugs` ordered by `criterion`. Ties keep their input order.
#[must_use]
pub fn sort_bugs<T: Rankable + Clone>(bugs: &[T], criterion: SortCriterion) -> Vec<T> {
    let mut sorted = bugs.to_vec();
    sorted.sort_by(|a, b| criterion.compare(a, b));
    sorted
}

/// Keep the bugs whose status is in `statuses` and whose priority is in
/// `priorities`. An empty set matches nothing.
#[must_use]
pub fn filter_by_status_and_priority<T: Rankable + Clone>(
    bugs: &[T],
    statuses: &HashSet<Status>,
    priorities: &HashSet<Priority>,
) -> Vec<T> {
    bugs.iter()
        .filter(|b| statuses.contains(&b.status()) && priorities.contains(&b.priority()))
        .cloned()
        .collect()
}

/// Projects with the most recently touched first.
#[must_use]
pub fn sort_projects_by_recency(projects: &[Project]) -> Vec<Project> {
    let mut sorted = projects.to_vec();
    sorted.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    sorted
}

// ---------------------------------------------------------------------------
// FilterSet
// ---------------------------------------------------------------------------

/// Status and priority inclusion sets, toggled one value at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSet {
    pub statuses: HashSet<Status>,
    pub priorities: HashSet<Priority>,
}

impl Default for FilterSet {
    /// Everything except closed bugs.
    fn default() -> Self {
        Self {
            statuses: Status::ALL.into_iter().filter(|s| s.is_open()).collect(),
            priorities: Priority::ALL.into_iter().collect(),
        }
    }
}

impl FilterSet {
    /// Include every status and priority.
    #[must_use]
    pub fn all() -> Self {
        Self {
            statuses: Status::ALL.into_iter().collect(),
            priorities: Priority::ALL.into_iter().collect(),
        }
    }

    /// Include nothing; build up with the toggles.
    #[must_use]
    pub fn none() -> Self {
        Self {
            statuses: HashSet::new(),
            priorities: HashSet::new(),
        }
    }

    /// Flip `status` in or out. Returns whether it is now included.
    pub fn toggle_status(&mut self, status: Status) -> bool {
        if self.statuses.remove(&status) {
            false
        } else {
            self.statuses.insert(status);
            true
        }
    }

    /// Flip `priority` in or out. Returns whether it is now included.
    pub fn toggle_priority(&mut self, priority: Priority) -> bool {
        if self.priorities.remove(&priority) {
            false
        } else {
            self.priorities.insert(priority);
            true
        }
    }

    #[must_use]
    pub fn includes_status(&self, status: Status) -> bool {
        self.statuses.contains(&status)
    }

    #[must_use]
    pub fn includes_priority(&self, priority: Priority) -> bool {
        self.priorities.contains(&priority)
    }

    #[must_use]
    pub fn apply<T: Rankable + Clone>(&self, bugs: &[T]) -> Vec<T> {
        filter_by_status_and_priority(bugs, &self.statuses, &self.priorities)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

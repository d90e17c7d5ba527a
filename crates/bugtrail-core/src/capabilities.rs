//! Role-based permission checks for bug and project mutations.
//!
//! A [`Capabilities`] value is computed once per mutation attempt from the
//! acting user, the bug and its parent project. Lifecycle rules consult the
//! flags instead of re-deriving roles at each call site.
//!
//! # Roles
//!
//! - **owner**: the project's single owner; may do everything, and is the
//!   only one who may close a bug or delete the project.
//! - **assignee**: the developer currently assigned to the bug; may move its
//!   status anywhere except `CLOSED`.
//! - **reporter**: the user who filed the bug; may change its priority.
//!
//! Assignment and commenting carry no role restriction of their own.

use serde::Serialize;
use tracing::trace;

use crate::model::{Bug, Project, Status};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// What an actor may do to one bug (or one project, for `delete_project`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct Capabilities {
    /// Move the bug between non-closed statuses.
    pub change_status: bool,
    /// Set the status to `CLOSED`.
    pub close: bool,
    /// Change the bug's priority.
    pub change_priority: bool,
    /// Change or clear the assignee.
    pub assign: bool,
    /// Append a comment.
    pub comment: bool,
    /// Delete the parent project with all its bugs.
    pub delete_project: bool,
}

/// One capability flag for user-visible display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilityStatus {
    pub name: &'static str,
    pub available: bool,
    /// Who holds this capability.
    pub requires: &'static str,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

impl Capabilities {
    /// Permissions of `actor_id` on `bug` inside `project`.
    #[must_use]
    pub fn for_actor(actor_id: &str, bug: &Bug, project: &Project) -> Self {
        let owner = project.is_owner(actor_id);
        let assignee = bug.is_assigned_to(actor_id);
        let reporter = bug.reporter_id == actor_id;

        let caps = Self {
            change_status: owner || assignee,
            close: owner,
            change_priority: owner || reporter,
            assign: true,
            comment: true,
            delete_project: owner,
        };
        trace!(actor = actor_id, bug = %bug.id, ?caps, "capabilities resolved");
        caps
    }

    /// Project-level permissions, when no bug is involved.
    #[must_use]
    pub fn for_project(actor_id: &str, project: &Project) -> Self {
        let owner = project.is_owner(actor_id);
        Self {
            change_status: false,
            close: false,
            change_priority: false,
            assign: true,
            comment: true,
            delete_project: owner,
        }
    }

    /// Whether the actor may set `status`.
    #[must_use]
    pub const fn may_set_status(&self, status: Status) -> bool {
        match status {
            Status::Closed => self.change_status && self.close,
            _ => self.change_status,
        }
    }

    /// Statuses the actor may pick, in display order.
    #[must_use]
    pub fn allowed_statuses(&self) -> Vec<Status> {
        Status::ALL
            .into_iter()
            .filter(|s| self.may_set_status(*s))
            .collect()
    }
}

/// Describe every capability flag, for `bt bug show`.
#[must_use]
pub fn describe_capabilities(caps: &Capabilities) -> Vec<CapabilityStatus> {
    vec![
        CapabilityStatus {
            name: "status",
            available: caps.change_status,
            requires: "assignee or project owner",
        },
        CapabilityStatus {
            name: "close",
            available: caps.close,
            requires: "project owner",
        },
        CapabilityStatus {
            name: "priority",
            available: caps.change_priority,
            requires: "reporter or project owner",
        },
        CapabilityStatus {
            name: "assign",
            available: caps.assign,
            requires: "anyone",
        },
        CapabilityStatus {
            name: "comment",
            available: caps.comment,
            requires: "anyone",
        },
        CapabilityStatus {
            name: "delete-project",
            available: caps.delete_project,
            requires: "project owner",
        },
    ]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

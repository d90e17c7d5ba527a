//! Bug lifecycle rules.
//!
//! Each function takes the current canonical snapshot plus one requested
//! mutation and returns the next canonical record. They perform no I/O and
//! never modify their input, so a failed call leaves the caller's record
//! exactly as it was.
//!
//! Assignment and status are coupled:
//!
//! - no assignee ⇔ status `UNASSIGNED`
//! - assigning an `UNASSIGNED` bug moves it to `TODO`; reassigning a bug that
//!   is already further along keeps its status
//! - setting status `UNASSIGNED` clears the assignee
//!
//! Every path that changes either field goes through [`change_status`] or
//! [`change_assignment`].

use tracing::debug;

use crate::capabilities::Capabilities;
use crate::config::ValidationConfig;
use crate::error::{Result, TrackerError};
use crate::model::{Bug, Comment, Priority, Project, Status};

/// Fields of a bug about to be filed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBug {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub project_id: String,
    pub reporter_id: String,
    pub assignee_id: Option<String>,
}

impl NewBug {
    /// Status the bug starts in.
    #[must_use]
    pub fn initial_status(&self) -> Status {
        initial_status(self.assignee_id.as_deref())
    }
}

/// `TODO` when created with an assignee, else `UNASSIGNED`.
#[must_use]
pub const fn initial_status(assignee: Option<&str>) -> Status {
    if assignee.is_some() {
        Status::Todo
    } else {
        Status::Unassigned
    }
}

/// Move `bug` to `new_status` on behalf of `actor`.
///
/// `UNASSIGNED` clears the assignee. Any other status requires the bug to
/// have an assignee; assign it first with [`change_assignment`].
///
/// # Errors
///
/// - [`TrackerError::Unauthorized`] unless `actor` is the assignee or the
///   project owner, or when a non-owner asks for `CLOSED`.
/// - [`TrackerError::Validation`] when moving an unassigned bug to a status
///   other than `UNASSIGNED`.
pub fn change_status(bug: &Bug, project: &Project, new_status: Status, actor: &str) -> Result<Bug> {
    let caps = Capabilities::for_actor(actor, bug, project);
    if !caps.change_status {
        return Err(TrackerError::unauthorized(actor, "change the status of this bug"));
    }
    if new_status == Status::Closed && !caps.close {
        return Err(TrackerError::unauthorized(actor, "close this bug"));
    }

    let mut next = bug.clone();
    if new_status == Status::Unassigned {
        next.assignee_id = None;
    } else if next.assignee_id.is_none() {
        return Err(TrackerError::validation(
            "status",
            format!("bug '{}' has no assignee; assign a developer first", bug.id),
        ));
    }
    next.status = new_status;

    debug!(bug = %bug.id, actor, from = %bug.status, to = %new_status, "status change planned");
    Ok(next)
}

/// Change the priority of `bug` on behalf of `actor`. Status is untouched.
///
/// # Errors
///
/// [`TrackerError::Unauthorized`] unless `actor` is the project owner or the
/// bug's reporter.
pub fn change_priority(
    bug: &Bug,
    project: &Project,
    new_priority: Priority,
    actor: &str,
) -> Result<Bug> {
    let caps = Capabilities::for_actor(actor, bug, project);
    if !caps.change_priority {
        return Err(TrackerError::unauthorized(actor, "change the priority of this bug"));
    }

    let mut next = bug.clone();
    next.priority = new_priority;

    debug!(bug = %bug.id, actor, from = %bug.priority, to = %new_priority, "priority change planned");
    Ok(next)
}

/// Assign `bug` to `new_assignee`, or clear the assignee with `None`.
///
/// Clearing forces `UNASSIGNED`. Assigning an `UNASSIGNED` bug forces
/// `TODO`; any other status is kept.
///
/// # Errors
///
/// [`TrackerError::InvalidAssignee`] when the target is neither a developer
/// nor the owner of the bug's project.
pub fn change_assignment(
    bug: &Bug,
    project: &Project,
    new_assignee: Option<&str>,
    actor: &str,
) -> Result<Bug> {
    let mut next = bug.clone();
    match new_assignee {
        None => {
            next.assignee_id = None;
            next.status = Status::Unassigned;
        }
        Some(user) => {
            if !project.is_member(user) {
                return Err(TrackerError::InvalidAssignee {
                    user: user.to_string(),
                    project: project.id.clone(),
                });
            }
            next.assignee_id = Some(user.to_string());
            if next.status == Status::Unassigned {
                next.status = Status::Todo;
            }
        }
    }

    debug!(
        bug = %bug.id,
        actor,
        assignee = new_assignee.unwrap_or("-"),
        status = %next.status,
        "assignment change planned"
    );
    Ok(next)
}

/// Trim a comment body and reject it when nothing is left.
///
/// # Errors
///
/// [`TrackerError::Validation`] on empty or whitespace-only text.
pub fn validate_comment(text: &str) -> Result<String> {
    let body = text.trim();
    if body.is_empty() {
        return Err(TrackerError::validation("comment", "must not be empty"));
    }
    Ok(body.to_string())
}

/// Append a store-confirmed comment and carry its timestamp to
/// `updated_at`. Never touches status, priority or assignment.
#[must_use]
pub fn add_comment(bug: &Bug, comment: Comment) -> Bug {
    let mut next = bug.clone();
    if comment.created_at > next.updated_at {
        next.updated_at = comment.created_at;
    }
    next.comments.push(comment);
    next
}

/// Check a bug about to be filed and return it with a trimmed title.
///
/// # Errors
///
/// - [`TrackerError::Validation`] for a title outside the configured length
///   bounds.
/// - [`TrackerError::Unauthorized`] when the reporter is not a project
///   member.
/// - [`TrackerError::InvalidAssignee`] when the initial assignee is not a
///   project member.
pub fn validate_new_bug(new: &NewBug, project: &Project, rules: &ValidationConfig) -> Result<NewBug> {
    let title = new.title.trim();
    let len = title.chars().count();
    if len < rules.min_title_len {
        return Err(TrackerError::validation(
            "title",
            format!("must be at least {} characters", rules.min_title_len),
        ));
    }
    if len > rules.max_title_len {
        return Err(TrackerError::validation(
            "title",
            format!("must be at most {} characters", rules.max_title_len),
        ));
    }
    if !project.is_member(&new.reporter_id) {
        return Err(TrackerError::unauthorized(
            &new.reporter_id,
            "file bugs on a project they are not a member of",
        ));
    }
    if let Some(assignee) = new.assignee_id.as_deref() {
        if !project.is_member(assignee) {
            return Err(TrackerError::InvalidAssignee {
                user: assignee.to_string(),
                project: project.id.clone(),
            });
        }
    }

    Ok(NewBug {
        title: title.to_string(),
        description: new.description.trim().to_string(),
        ..new.clone()
    })
}

/// Trim a project name and enforce the minimum length.
///
/// # Errors
///
/// [`TrackerError::Validation`] when the trimmed name is too short.
pub fn validate_project_name(name: &str, rules: &ValidationConfig) -> Result<String> {
    let name = name.trim();
    if name.chars().count() < rules.min_project_name_len {
        return Err(TrackerError::validation(
            "project name",
            format!("must be at least {} characters", rules.min_project_name_len),
        ));
    }
    Ok(name.to_string())
}

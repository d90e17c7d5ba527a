//! Mutation orchestration.
//!
//! Every mutation follows the same path:
//!
//! 1. mark the target in flight on the [`ProjectView`]
//! 2. re-read the canonical bug and project from the store
//! 3. run the lifecycle rule, which checks capabilities and returns the next
//!    record
//! 4. write through the store
//! 5. merge the store-confirmed record into the view
//!
//! The view is only touched in step 5. Any error before that leaves it as
//! it was, and the error is returned to the caller.

use tracing::{debug, info, warn};

use crate::capabilities::Capabilities;
use crate::config::{ValidationConfig, ViewConfig};
use crate::error::{Entity, Result, TrackerError};
use crate::lifecycle::{self, NewBug};
use crate::model::{Bug, Comment, Priority, Project, Status};
use crate::store::BugStore;
use crate::view::ProjectView;

pub struct Tracker<S: BugStore> {
    store: S,
    rules: ValidationConfig,
}

impl<S: BugStore> Tracker<S> {
    #[must_use]
    pub const fn new(store: S, rules: ValidationConfig) -> Self {
        Self { store, rules }
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    #[must_use]
    pub const fn rules(&self) -> &ValidationConfig {
        &self.rules
    }

    /// Fetch a project page with the configured default selection.
    ///
    /// # Errors
    ///
    /// `NotFound` when the project is absent, `Persistence` on read failure.
    pub fn load_view(&self, project_id: &str, view: &ViewConfig) -> Result<ProjectView> {
        let project = self.store.fetch_project(project_id)?;
        let developers = self.store.fetch_project_developers(project_id)?;
        let bugs = self.store.list_project_bugs(project_id)?;
        debug!(project = project_id, bugs = bugs.len(), "project view loaded");
        Ok(ProjectView::new(project, developers, bugs)
            .with_selection(view.initial_filters(), view.default_sort))
    }

    /// Move a bug to `status`.
    ///
    /// # Errors
    ///
    /// See [`lifecycle::change_status`]; also `NotFound` and `Persistence`
    /// from the store, and `Validation` when a change to the bug is already
    /// in flight.
    pub fn change_status(
        &mut self,
        view: &mut ProjectView,
        bug_id: &str,
        status: Status,
        actor: &str,
    ) -> Result<Bug> {
        debug!(bug = bug_id, actor, %status, "change_status requested");
        let store = &mut self.store;
        let outcome = guarded(view, bug_id, |view| {
            let (bug, project) = canonical(&*store, view, bug_id)?;
            let planned = lifecycle::change_status(&bug, &project, status, actor)?;
            store.update_bug_status(bug_id, planned.status)
        });
        settle("change_status", bug_id, view, outcome)
    }

    /// Change a bug's priority.
    ///
    /// # Errors
    ///
    /// See [`lifecycle::change_priority`]; also store and in-flight errors
    /// as for [`Self::change_status`].
    pub fn change_priority(
        &mut self,
        view: &mut ProjectView,
        bug_id: &str,
        priority: Priority,
        actor: &str,
    ) -> Result<Bug> {
        debug!(bug = bug_id, actor, %priority, "change_priority requested");
        let store = &mut self.store;
        let outcome = guarded(view, bug_id, |view| {
            let (bug, project) = canonical(&*store, view, bug_id)?;
            let planned = lifecycle::change_priority(&bug, &project, priority, actor)?;
            store.update_bug_priority(bug_id, planned.priority)
        });
        settle("change_priority", bug_id, view, outcome)
    }

    /// Assign a bug to `assignee`, or unassign it with `None`.
    ///
    /// # Errors
    ///
    /// See [`lifecycle::change_assignment`]; also store and in-flight errors
    /// as for [`Self::change_status`].
    pub fn change_assignment(
        &mut self,
        view: &mut ProjectView,
        bug_id: &str,
        assignee: Option<&str>,
        actor: &str,
    ) -> Result<Bug> {
        debug!(bug = bug_id, actor, assignee = assignee.unwrap_or("-"), "change_assignment requested");
        let store = &mut self.store;
        let outcome = guarded(view, bug_id, |view| {
            let (bug, project) = canonical(&*store, view, bug_id)?;
            let planned = lifecycle::change_assignment(&bug, &project, assignee, actor)?;
            store.update_bug_assignment(bug_id, planned.assignee_id.as_deref(), planned.status)
        });
        settle("change_assignment", bug_id, view, outcome)
    }

    /// Post a comment on a bug.
    ///
    /// # Errors
    ///
    /// `Validation` for blank text, `NotFound` for an unknown bug or author,
    /// `Persistence` when the write fails.
    pub fn add_comment(
        &mut self,
        view: &mut ProjectView,
        bug_id: &str,
        author: &str,
        text: &str,
    ) -> Result<Comment> {
        debug!(bug = bug_id, author, "add_comment requested");
        let store = &mut self.store;
        let outcome = guarded(view, bug_id, |view| {
            let body = lifecycle::validate_comment(text)?;
            let (bug, _) = canonical(&*store, view, bug_id)?;
            let comment = store.post_comment(bug_id, author, &body)?;
            Ok((lifecycle::add_comment(&bug, comment.clone()), comment))
        });
        match outcome {
            Ok((bug, comment)) => {
                view.merge_bug(&bug);
                info!(bug = bug_id, comment = %comment.id, "add_comment applied");
                Ok(comment)
            }
            Err(err) => Err(log_failure("add_comment", bug_id, err)),
        }
    }

    /// File a new bug in the view's project.
    ///
    /// # Errors
    ///
    /// See [`lifecycle::validate_new_bug`]; also `Persistence` from the
    /// store.
    pub fn create_bug(&mut self, view: &mut ProjectView, new: &NewBug) -> Result<Bug> {
        debug!(project = %new.project_id, reporter = %new.reporter_id, "create_bug requested");
        let project_id = new.project_id.clone();
        let store = &mut self.store;
        let rules = &self.rules;
        let outcome = guarded(view, &project_id, |view| {
            if project_id != view.project.id {
                return Err(TrackerError::validation(
                    "project",
                    format!("view shows '{}', not '{project_id}'", view.project.id),
                ));
            }
            let project = store.fetch_project(&project_id)?;
            let checked = lifecycle::validate_new_bug(new, &project, rules)?;
            store.create_bug(&checked)
        });
        settle("create_bug", &project_id, view, outcome)
    }

    /// Delete a project with all its bugs and comments.
    ///
    /// `confirmation` must equal the project name exactly.
    ///
    /// # Errors
    ///
    /// `Unauthorized` unless `actor` owns the project, `Validation` when the
    /// confirmation does not match, `NotFound`/`Persistence` from the store.
    pub fn delete_project(&mut self, project_id: &str, actor: &str, confirmation: &str) -> Result<Project> {
        debug!(project = project_id, actor, "delete_project requested");
        match self.try_delete_project(project_id, actor, confirmation) {
            Ok(project) => {
                info!(project = project_id, name = %project.name, "delete_project applied");
                Ok(project)
            }
            Err(err) => Err(log_failure("delete_project", project_id, err)),
        }
    }

    fn try_delete_project(&mut self, project_id: &str, actor: &str, confirmation: &str) -> Result<Project> {
        let project = self.store.fetch_project(project_id)?;
        if !Capabilities::for_project(actor, &project).delete_project {
            return Err(TrackerError::unauthorized(actor, "delete this project"));
        }
        if confirmation != project.name {
            return Err(TrackerError::validation(
                "confirmation",
                format!("type the project name '{}' to confirm", project.name),
            ));
        }
        self.store.delete_project(project_id)?;
        Ok(project)
    }
}

/// Run `f` with `key` marked in flight on `view`, clearing it afterwards.
fn guarded<T>(
    view: &mut ProjectView,
    key: &str,
    f: impl FnOnce(&ProjectView) -> Result<T>,
) -> Result<T> {
    view.pending.begin(key)?;
    let outcome = f(&*view);
    view.pending.finish(key);
    outcome
}

/// Canonical bug and project, refusing bugs outside the view's project.
fn canonical<S: BugStore>(store: &S, view: &ProjectView, bug_id: &str) -> Result<(Bug, Project)> {
    let bug = store.fetch_bug(bug_id)?;
    if bug.project_id != view.project.id {
        return Err(TrackerError::not_found(Entity::Bug, bug_id));
    }
    let project = store.fetch_project(&bug.project_id)?;
    Ok((bug, project))
}

fn settle(op: &'static str, target: &str, view: &mut ProjectView, outcome: Result<Bug>) -> Result<Bug> {
    match outcome {
        Ok(bug) => {
            view.merge_bug(&bug);
            info!(
                op,
                bug = %bug.id,
                status = %bug.status,
                priority = %bug.priority,
                assignee = bug.assignee_id.as_deref().unwrap_or("-"),
                "mutation applied"
            );
            Ok(bug)
        }
        Err(err) => Err(log_failure(op, target, err)),
    }
}

fn log_failure(op: &'static str, target: &str, err: TrackerError) -> TrackerError {
    warn!(op, target, code = %err.code(), retryable = err.is_retryable(), error = %err, "mutation rejected");
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::model::User;
    use crate::store::SqliteStore;

    fn tracker() -> (Tracker<SqliteStore>, ProjectView, Bug) {
        let mut store = SqliteStore::in_memory(&StorageConfig::default()).unwrap();
        for id in ["owner", "dev-42", "dev-7"] {
            store
                .create_user(&User {
                    id: id.into(),
                    name: id.into(),
                    image: None,
                })
                .unwrap();
        }
        let project = store
            .create_project("Tracker", "owner", &["dev-42".into(), "dev-7".into()])
            .unwrap();
        let mut tracker = Tracker::new(store, ValidationConfig::default());
        let mut view = tracker.load_view(&project.id, &ViewConfig::default()).unwrap();
        let bug = tracker
            .create_bug(
                &mut view,
                &NewBug {
                    title: "Crash on save".into(),
                    description: String::new(),
                    priority: Priority::Low,
                    project_id: project.id,
                    reporter_id: "dev-7".into(),
                    assignee_id: None,
                },
            )
            .unwrap();
        (tracker, view, bug)
    }

    #[test]
    fn assign_then_close_scenario() {
        let (mut tracker, mut view, bug) = tracker();

        let assigned = tracker
            .change_assignment(&mut view, &bug.id, Some("dev-42"), "owner")
            .unwrap();
        assert_eq!(assigned.status, Status::Todo);
        assert_eq!(assigned.assignee_id.as_deref(), Some("dev-42"));

        let err = tracker
            .change_status(&mut view, &bug.id, Status::Closed, "dev-42")
            .unwrap_err();
        assert!(matches!(err, TrackerError::Unauthorized { .. }));
        assert_eq!(view.bug(&bug.id).unwrap().status, Status::Todo);

        let closed = tracker
            .change_status(&mut view, &bug.id, Status::Closed, "owner")
            .unwrap();
        assert_eq!(closed.status, Status::Closed);
        assert_eq!(closed.assignee_id.as_deref(), Some("dev-42"));
        assert_eq!(view.bug(&bug.id).unwrap().status, Status::Closed);
        assert!(view.pending.is_empty());
    }

    #[test]
    fn comment_updates_cached_count() {
        let (mut tracker, mut view, bug) = tracker();
        let comment = tracker
            .add_comment(&mut view, &bug.id, "dev-42", "  repro attached ")
            .unwrap();
        assert_eq!(comment.body, "repro attached");
        assert_eq!(view.bug(&bug.id).unwrap().comment_count, 1);

        let err = tracker.add_comment(&mut view, &bug.id, "dev-42", "   ").unwrap_err();
        assert!(matches!(err, TrackerError::Validation { field: "comment", .. }));
        assert_eq!(view.bug(&bug.id).unwrap().comment_count, 1);
    }

    #[test]
    fn comment_from_unknown_author_is_not_retryable() {
        let (mut tracker, mut view, bug) = tracker();
        let err = tracker
            .add_comment(&mut view, &bug.id, "ghost", "hello")
            .unwrap_err();
        assert_eq!(
            err,
            TrackerError::NotFound {
                entity: crate::error::Entity::User,
                id: "ghost".into(),
            }
        );
        assert!(!err.is_retryable());
        assert_eq!(view.bug(&bug.id).unwrap().comment_count, 0);
        assert!(view.pending.is_empty());
    }

    #[test]
    fn delete_requires_owner_and_matching_name() {
        let (mut tracker, view, bug) = tracker();
        let id = view.project.id.clone();
        assert!(matches!(
            tracker.delete_project(&id, "dev-42", "Tracker"),
            Err(TrackerError::Unauthorized { .. })
        ));
        assert!(matches!(
            tracker.delete_project(&id, "owner", "tracker"),
            Err(TrackerError::Validation { field: "confirmation", .. })
        ));
        let deleted = tracker.delete_project(&id, "owner", "Tracker").unwrap();
        assert_eq!(deleted.id, id);
        assert!(matches!(
            tracker.store().fetch_bug(&bug.id),
            Err(TrackerError::NotFound { .. })
        ));
    }

    #[test]
    fn bugs_from_other_projects_are_refused() {
        let (mut tracker, _, bug) = tracker();
        let other = tracker
            .store_mut()
            .create_project("Elsewhere", "owner", &[])
            .unwrap();
        let mut other_view = tracker.load_view(&other.id, &ViewConfig::default()).unwrap();
        let err = tracker
            .change_priority(&mut other_view, &bug.id, Priority::High, "owner")
            .unwrap_err();
        assert!(matches!(err, TrackerError::NotFound { entity: Entity::Bug, .. }));
    }
}

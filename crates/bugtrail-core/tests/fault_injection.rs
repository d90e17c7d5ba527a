//! Store failures must leave the caller's view untouched.
//!
//! A wrapper store delegates to SQLite but can be told to fail every write,
//! either as a plain I/O failure or as a timeout.

use bugtrail_core::config::{StorageConfig, ValidationConfig, ViewConfig};
use bugtrail_core::lifecycle::NewBug;
use bugtrail_core::model::{Bug, BugSummary, Comment, Priority, Project, Status, User};
use bugtrail_core::view::ProjectView;
use bugtrail_core::{BugStore, Result, SqliteStore, Tracker, TrackerError};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Fault {
    None,
    Io,
    Timeout,
}

struct FlakyStore {
    inner: SqliteStore,
    fault: Fault,
    attempted_writes: usize,
}

impl FlakyStore {
    fn check(&mut self) -> Result<()> {
        self.attempted_writes += 1;
        match self.fault {
            Fault::None => Ok(()),
            Fault::Io => Err(TrackerError::Persistence {
                message: "disk I/O error".into(),
                timed_out: false,
            }),
            Fault::Timeout => Err(TrackerError::Persistence {
                message: "interrupted".into(),
                timed_out: true,
            }),
        }
    }
}

impl BugStore for FlakyStore {
    fn fetch_bug(&self, bug_id: &str) -> Result<Bug> {
        self.inner.fetch_bug(bug_id)
    }
    fn fetch_project(&self, project_id: &str) -> Result<Project> {
        self.inner.fetch_project(project_id)
    }
    fn fetch_project_developers(&self, project_id: &str) -> Result<Vec<User>> {
        self.inner.fetch_project_developers(project_id)
    }
    fn list_project_bugs(&self, project_id: &str) -> Result<Vec<BugSummary>> {
        self.inner.list_project_bugs(project_id)
    }
    fn update_bug_status(&mut self, bug_id: &str, status: Status) -> Result<Bug> {
        self.check()?;
        self.inner.update_bug_status(bug_id, status)
    }
    fn update_bug_priority(&mut self, bug_id: &str, priority: Priority) -> Result<Bug> {
        self.check()?;
        self.inner.update_bug_priority(bug_id, priority)
    }
    fn update_bug_assignment(
        &mut self,
        bug_id: &str,
        assignee: Option<&str>,
        status: Status,
    ) -> Result<Bug> {
        self.check()?;
        self.inner.update_bug_assignment(bug_id, assignee, status)
    }
    fn create_bug(&mut self, new: &NewBug) -> Result<Bug> {
        self.check()?;
        self.inner.create_bug(new)
    }
    fn post_comment(&mut self, bug_id: &str, author_id: &str, text: &str) -> Result<Comment> {
        self.check()?;
        self.inner.post_comment(bug_id, author_id, text)
    }
    fn delete_project(&mut self, project_id: &str) -> Result<()> {
        self.check()?;
        self.inner.delete_project(project_id)
    }
}

fn setup() -> (Tracker<FlakyStore>, ProjectView, Bug) {
    let mut inner = SqliteStore::in_memory(&StorageConfig::default()).expect("in-memory store");
    for id in ["owner", "dev-42", "dev-7"] {
        inner
            .create_user(&User {
                id: id.into(),
                name: id.into(),
                image: None,
            })
            .expect("create user");
    }
    let project = inner
        .create_project("Payments", "owner", &["dev-42".into(), "dev-7".into()])
        .expect("create project");
    let store = FlakyStore {
        inner,
        fault: Fault::None,
        attempted_writes: 0,
    };
    let mut tracker = Tracker::new(store, ValidationConfig::default());
    let mut view = tracker
        .load_view(&project.id, &ViewConfig::default())
        .expect("load view");
    let bug = tracker
        .create_bug(
            &mut view,
            &NewBug {
                title: "Refund rounding".into(),
                description: "Off by one cent".into(),
                priority: Priority::Medium,
                project_id: project.id,
                reporter_id: "dev-7".into(),
                assignee_id: Some("dev-42".into()),
            },
        )
        .expect("create bug");
    (tracker, view, bug)
}

fn snapshot(view: &ProjectView) -> (Vec<BugSummary>, Project) {
    (view.bugs.clone(), view.project.clone())
}

#[test]
fn failed_writes_leave_view_and_store_unchanged() {
    for fault in [Fault::Io, Fault::Timeout] {
        let (mut tracker, mut view, bug) = setup();
        let before = snapshot(&view);
        tracker.store_mut().fault = fault;

        let errors = [
            tracker
                .change_status(&mut view, &bug.id, Status::InProgress, "dev-42")
                .unwrap_err(),
            tracker
                .change_priority(&mut view, &bug.id, Priority::Critical, "owner")
                .unwrap_err(),
            tracker
                .change_assignment(&mut view, &bug.id, None, "owner")
                .unwrap_err(),
            tracker
                .add_comment(&mut view, &bug.id, "owner", "looking")
                .unwrap_err(),
        ];

        for err in &errors {
            assert!(err.is_retryable(), "{err}");
            let timed_out = matches!(err, TrackerError::Persistence { timed_out: true, .. });
            assert_eq!(timed_out, fault == Fault::Timeout);
        }
        assert_eq!(snapshot(&view), before);
        assert!(view.pending.is_empty());
        assert_eq!(tracker.store().attempted_writes, 5);

        let stored = tracker.store().fetch_bug(&bug.id).unwrap();
        assert_eq!(stored.status, Status::Todo);
        assert_eq!(stored.priority, Priority::Medium);
        assert!(stored.comments.is_empty());
    }
}

#[test]
fn rejected_mutations_never_reach_the_store() {
    let (mut tracker, mut view, bug) = setup();
    let writes_before = tracker.store().attempted_writes;

    assert!(matches!(
        tracker.change_status(&mut view, &bug.id, Status::Closed, "dev-42"),
        Err(TrackerError::Unauthorized { .. })
    ));
    assert!(matches!(
        tracker.change_priority(&mut view, &bug.id, Priority::High, "dev-42"),
        Err(TrackerError::Unauthorized { .. })
    ));
    assert!(matches!(
        tracker.change_assignment(&mut view, &bug.id, Some("stranger"), "owner"),
        Err(TrackerError::InvalidAssignee { .. })
    ));
    assert!(matches!(
        tracker.add_comment(&mut view, &bug.id, "owner", "  "),
        Err(TrackerError::Validation { .. })
    ));

    assert_eq!(tracker.store().attempted_writes, writes_before);
}

#[test]
fn retry_after_transient_failure_succeeds() {
    let (mut tracker, mut view, bug) = setup();
    tracker.store_mut().fault = Fault::Timeout;
    let err = tracker
        .change_status(&mut view, &bug.id, Status::Testing, "dev-42")
        .unwrap_err();
    assert!(err.is_retryable());

    tracker.store_mut().fault = Fault::None;
    let next = tracker
        .change_status(&mut view, &bug.id, Status::Testing, "dev-42")
        .unwrap();
    assert_eq!(next.status, Status::Testing);
    assert_eq!(view.bug(&bug.id).unwrap().status, Status::Testing);
}

#[test]
fn duplicate_in_flight_mutation_is_refused() {
    let (mut tracker, mut view, bug) = setup();
    view.pending.begin(&bug.id).unwrap();
    let err = tracker
        .change_priority(&mut view, &bug.id, Priority::High, "owner")
        .unwrap_err();
    assert!(matches!(err, TrackerError::Validation { field: "mutation", .. }));
    // The outer holder still owns the mark.
    assert!(view.pending.is_pending(&bug.id));
}

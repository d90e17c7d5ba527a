//! Persistence boundary and its SQLite implementation.
//!
//! [`BugStore`] is the request/response contract the tracker drives. Each
//! call either returns the store-confirmed record or a typed
//! [`TrackerError`]; a failed call leaves the database unchanged.
//!
//! [`SqliteStore`] runs every call inside a transaction with a deadline.
//! The deadline is enforced twice: SQLite's `busy_timeout` bounds lock
//! waits, and a progress handler interrupts long-running statements.
//! Either expiry surfaces as `Persistence { timed_out: true }`.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::Connection;
use tracing::{debug, warn};

use crate::config::StorageConfig;
use crate::db::{self, mutate, query};
use crate::error::{Entity, Result, TrackerError};
use crate::lifecycle::NewBug;
use crate::model::id::{self, IdKind};
use crate::model::{
    AssignedScope, Bug, BugSummary, Comment, Priority, Project, ProjectScope, Sidebar, Status, User,
};

/// VM instructions between deadline checks.
const PROGRESS_OPS: i32 = 1_000;

/// Data-access boundary consumed by the tracker.
pub trait BugStore {
    /// # Errors
    /// `NotFound` when absent, `Persistence` when the read fails.
    fn fetch_bug(&self, bug_id: &str) -> Result<Bug>;

    /// # Errors
    /// `NotFound` when absent, `Persistence` when the read fails.
    fn fetch_project(&self, project_id: &str) -> Result<Project>;

    /// # Errors
    /// `NotFound` when the project is absent, `Persistence` otherwise.
    fn fetch_project_developers(&self, project_id: &str) -> Result<Vec<User>>;

    /// Every bug in a project as list rows.
    ///
    /// # Errors
    /// `NotFound` when the project is absent, `Persistence` otherwise.
    fn list_project_bugs(&self, project_id: &str) -> Result<Vec<BugSummary>>;

    /// Write `status`; `UNASSIGNED` also clears the assignee.
    ///
    /// # Errors
    /// `NotFound` when the bug is absent, `Persistence` when the write fails.
    fn update_bug_status(&mut self, bug_id: &str, status: Status) -> Result<Bug>;

    /// # Errors
    /// `NotFound` when the bug is absent, `Persistence` when the write fails.
    fn update_bug_priority(&mut self, bug_id: &str, priority: Priority) -> Result<Bug>;

    /// Write assignee and status together.
    ///
    /// # Errors
    /// `NotFound` when the bug is absent, `Persistence` when the write fails.
    fn update_bug_assignment(
        &mut self,
        bug_id: &str,
        assignee: Option<&str>,
        status: Status,
    ) -> Result<Bug>;

    /// # Errors
    /// `Persistence` when the write fails.
    fn create_bug(&mut self, new: &NewBug) -> Result<Bug>;

    /// # Errors
    /// `NotFound` when the bug is absent, `Persistence` when the write fails.
    fn post_comment(&mut self, bug_id: &str, author_id: &str, text: &str) -> Result<Comment>;

    /// Delete a project together with its bugs and comments.
    ///
    /// # Errors
    /// `NotFound` when absent, `Persistence` when the write fails.
    fn delete_project(&mut self, project_id: &str) -> Result<()>;
}

/// [`BugStore`] over a single SQLite connection.
pub struct SqliteStore {
    conn: Connection,
    timeout: Duration,
}

impl SqliteStore {
    /// Open the database at `path`, creating and migrating it as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: &Path, storage: &StorageConfig) -> anyhow::Result<Self> {
        let timeout = storage.write_timeout();
        let conn = db::open_db(path, timeout)?;
        Ok(Self { conn, timeout })
    }

    /// Fresh in-memory database with the full schema.
    ///
    /// # Errors
    ///
    /// Returns an error if migrating fails.
    pub fn in_memory(storage: &StorageConfig) -> anyhow::Result<Self> {
        let timeout = storage.write_timeout();
        let conn = db::open_in_memory(timeout)?;
        Ok(Self { conn, timeout })
    }

    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    // -----------------------------------------------------------------------
    // Users
    // -----------------------------------------------------------------------

    /// Register a user under an operator-chosen id.
    ///
    /// # Errors
    ///
    /// `Validation` when the id is blank or taken, `Persistence` otherwise.
    pub fn create_user(&mut self, user: &User) -> Result<User> {
        if user.id.trim().is_empty() {
            return Err(TrackerError::validation("user id", "must not be empty"));
        }
        if user.name.trim().is_empty() {
            return Err(TrackerError::validation("user name", "must not be empty"));
        }
        self.write("create_user", |conn| {
            if query::get_user(conn, &user.id)?.is_some() {
                return Err(TrackerError::validation(
                    "user id",
                    format!("'{}' is already registered", user.id),
                )
                .into());
            }
            mutate::insert_user(conn, user, db::to_us(now()))?;
            Ok(user.clone())
        })
    }

    /// # Errors
    ///
    /// `NotFound` when absent.
    pub fn fetch_user(&self, user_id: &str) -> Result<User> {
        self.read("fetch_user", |conn| query::get_user(conn, user_id))?
            .ok_or_else(|| TrackerError::not_found(Entity::User, user_id))
    }

    /// # Errors
    ///
    /// `Persistence` when the read fails.
    pub fn list_users(&self) -> Result<Vec<User>> {
        self.read("list_users", query::list_users)
    }

    // -----------------------------------------------------------------------
    // Projects
    // -----------------------------------------------------------------------

    /// Create a project owned by `owner_id` with an initial roster.
    ///
    /// The name is stored as given; check it with
    /// [`crate::lifecycle::validate_project_name`] first.
    ///
    /// # Errors
    ///
    /// `NotFound` when the owner or a developer is not registered.
    pub fn create_project(
        &mut self,
        name: &str,
        owner_id: &str,
        developer_ids: &[String],
    ) -> Result<Project> {
        self.write("create_project", |conn| {
            for user in std::iter::once(owner_id).chain(developer_ids.iter().map(String::as_str)) {
                if query::get_user(conn, user)?.is_none() {
                    return Err(TrackerError::not_found(Entity::User, user).into());
                }
            }
            let at = now();
            let mut roster: Vec<String> = Vec::with_capacity(developer_ids.len());
            for dev in developer_ids {
                if dev != owner_id && !roster.contains(dev) {
                    roster.push(dev.clone());
                }
            }
            let project = Project {
                id: id::generate(IdKind::Project, name),
                name: name.to_string(),
                owner_id: owner_id.to_string(),
                developer_ids: roster,
                created_at: at,
                updated_at: at,
            };
            mutate::insert_project(conn, &project, db::to_us(at))?;
            require(query::get_project(conn, &project.id)?, Entity::Project, &project.id)
        })
    }

    /// Add `user_id` to the project's developer roster. Idempotent; the
    /// owner is never listed as a developer.
    ///
    /// # Errors
    ///
    /// `NotFound` when the project or user is absent.
    pub fn add_developer(&mut self, project_id: &str, user_id: &str) -> Result<Project> {
        self.write("add_developer", |conn| {
            let project = require(query::get_project(conn, project_id)?, Entity::Project, project_id)?;
            require(query::get_user(conn, user_id)?, Entity::User, user_id)?;
            if project.is_owner(user_id) {
                return Ok(project);
            }
            mutate::insert_developer(conn, project_id, user_id, db::to_us(now()))?;
            require(query::get_project(conn, project_id)?, Entity::Project, project_id)
        })
    }

    /// Projects `user_id` owns and/or develops on, most recent first.
    ///
    /// # Errors
    ///
    /// `Persistence` when the read fails.
    pub fn list_projects(&self, user_id: &str, scope: ProjectScope) -> Result<Vec<Project>> {
        self.read("list_projects", |conn| query::list_projects(conn, user_id, scope))
    }

    /// Bugs assigned to `user_id`.
    ///
    /// # Errors
    ///
    /// `Persistence` when the read fails.
    pub fn list_assigned_bugs(&self, user_id: &str, scope: AssignedScope) -> Result<Vec<BugSummary>> {
        self.read("list_assigned_bugs", |conn| {
            query::list_assigned_bugs(conn, user_id, scope)
        })
    }

    /// Navigation summary: owned projects, projects developed on, and open
    /// assigned bugs.
    ///
    /// # Errors
    ///
    /// `NotFound` when the user is absent.
    pub fn sidebar(&self, user_id: &str) -> Result<Sidebar> {
        self.read("sidebar", |conn| {
            let user = require(query::get_user(conn, user_id)?, Entity::User, user_id)?;
            Ok(Sidebar {
                user,
                owned: query::list_projects(conn, user_id, ProjectScope::Owner)?,
                developing: query::list_projects(conn, user_id, ProjectScope::Developer)?,
                open_assigned: query::list_assigned_bugs(conn, user_id, AssignedScope::Open)?,
            })
        })
    }

    // -----------------------------------------------------------------------
    // Deadline plumbing
    // -----------------------------------------------------------------------

    fn arm_deadline(&self) {
        let deadline = Instant::now() + self.timeout;
        self.conn
            .progress_handler(PROGRESS_OPS, Some(move || Instant::now() >= deadline));
    }

    fn disarm_deadline(&self) {
        self.conn.progress_handler(0, None::<fn() -> bool>);
    }

    fn read<T>(
        &self,
        op: &'static str,
        f: impl FnOnce(&Connection) -> anyhow::Result<T>,
    ) -> Result<T> {
        self.arm_deadline();
        let outcome = f(&self.conn);
        self.disarm_deadline();
        outcome.map_err(|err| to_tracker_error(op, &err))
    }

    fn write<T>(
        &mut self,
        op: &'static str,
        f: impl FnOnce(&Connection) -> anyhow::Result<T>,
    ) -> Result<T> {
        let started = Instant::now();
        self.arm_deadline();
        let outcome = in_transaction(&mut self.conn, f);
        self.disarm_deadline();

        match outcome {
            Ok(value) => {
                debug!(op, elapsed_ms = started.elapsed().as_millis(), "store write committed");
                Ok(value)
            }
            Err(err) => {
                let mapped = to_tracker_error(op, &err);
                if mapped.is_retryable() {
                    warn!(op, error = %format!("{err:#}"), "store write failed");
                }
                Err(mapped)
            }
        }
    }
}

impl BugStore for SqliteStore {
    fn fetch_bug(&self, bug_id: &str) -> Result<Bug> {
        self.read("fetch_bug", |conn| query::get_bug(conn, bug_id))?
            .ok_or_else(|| TrackerError::not_found(Entity::Bug, bug_id))
    }

    fn fetch_project(&self, project_id: &str) -> Result<Project> {
        self.read("fetch_project", |conn| query::get_project(conn, project_id))?
            .ok_or_else(|| TrackerError::not_found(Entity::Project, project_id))
    }

    fn fetch_project_developers(&self, project_id: &str) -> Result<Vec<User>> {
        self.read("fetch_project_developers", |conn| {
            require(query::get_project(conn, project_id)?, Entity::Project, project_id)?;
            query::list_project_developers(conn, project_id)
        })
    }

    fn list_project_bugs(&self, project_id: &str) -> Result<Vec<BugSummary>> {
        self.read("list_project_bugs", |conn| {
            require(query::get_project(conn, project_id)?, Entity::Project, project_id)?;
            query::list_project_bugs(conn, project_id)
        })
    }

    fn update_bug_status(&mut self, bug_id: &str, status: Status) -> Result<Bug> {
        self.write("update_bug_status", |conn| {
            let changed = mutate::set_bug_status(conn, bug_id, status, db::to_us(now()))?;
            confirmed_bug(conn, changed, bug_id)
        })
    }

    fn update_bug_priority(&mut self, bug_id: &str, priority: Priority) -> Result<Bug> {
        self.write("update_bug_priority", |conn| {
            let changed = mutate::set_bug_priority(conn, bug_id, priority, db::to_us(now()))?;
            confirmed_bug(conn, changed, bug_id)
        })
    }

    fn update_bug_assignment(
        &mut self,
        bug_id: &str,
        assignee: Option<&str>,
        status: Status,
    ) -> Result<Bug> {
        self.write("update_bug_assignment", |conn| {
            let changed =
                mutate::set_bug_assignment(conn, bug_id, assignee, status, db::to_us(now()))?;
            confirmed_bug(conn, changed, bug_id)
        })
    }

    fn create_bug(&mut self, new: &NewBug) -> Result<Bug> {
        self.write("create_bug", |conn| {
            let at = now();
            let bug = Bug {
                id: id::generate(IdKind::Bug, &new.title),
                title: new.title.clone(),
                description: new.description.clone(),
                priority: new.priority,
                status: new.initial_status(),
                reporter_id: new.reporter_id.clone(),
                assignee_id: new.assignee_id.clone(),
                project_id: new.project_id.clone(),
                comments: Vec::new(),
                created_at: at,
                updated_at: at,
            };
            mutate::insert_bug(conn, &bug)?;
            require(query::get_bug(conn, &bug.id)?, Entity::Bug, &bug.id)
        })
    }

    fn post_comment(&mut self, bug_id: &str, author_id: &str, text: &str) -> Result<Comment> {
        self.write("post_comment", |conn| {
            require(query::get_bug(conn, bug_id)?, Entity::Bug, bug_id)?;
            require(query::get_user(conn, author_id)?, Entity::User, author_id)?;
            let comment = Comment {
                id: id::generate(IdKind::Comment, text),
                bug_id: bug_id.to_string(),
                author_id: author_id.to_string(),
                body: text.to_string(),
                created_at: now(),
            };
            mutate::insert_comment(conn, &comment)?;
            Ok(comment)
        })
    }

    fn delete_project(&mut self, project_id: &str) -> Result<()> {
        self.write("delete_project", |conn| {
            if mutate::delete_project(conn, project_id)? == 0 {
                return Err(TrackerError::not_found(Entity::Project, project_id).into());
            }
            Ok(())
        })
    }
}

/// Wall clock truncated to the stored microsecond precision.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn in_transaction<T>(
    conn: &mut Connection,
    f: impl FnOnce(&Connection) -> anyhow::Result<T>,
) -> anyhow::Result<T> {
    let tx = conn.transaction().context("begin transaction")?;
    let value = f(&tx)?;
    tx.commit().context("commit transaction")?;
    Ok(value)
}

fn require<T>(row: Option<T>, entity: Entity, id: &str) -> anyhow::Result<T> {
    row.ok_or_else(|| TrackerError::not_found(entity, id).into())
}

fn confirmed_bug(conn: &Connection, changed: usize, bug_id: &str) -> anyhow::Result<Bug> {
    if changed == 0 {
        return Err(TrackerError::not_found(Entity::Bug, bug_id).into());
    }
    require(query::get_bug(conn, bug_id)?, Entity::Bug, bug_id)
}

/// Domain errors raised inside a store call pass through unchanged; anything
/// else becomes `Persistence`.
fn to_tracker_error(op: &str, err: &anyhow::Error) -> TrackerError {
    if let Some(domain) = err.chain().find_map(|cause| cause.downcast_ref::<TrackerError>()) {
        return domain.clone();
    }
    let timed_out = err
        .chain()
        .filter_map(|cause| cause.downcast_ref::<rusqlite::Error>())
        .any(is_deadline_error);
    TrackerError::Persistence {
        message: format!("{op}: {err:#}"),
        timed_out,
    }
}

fn is_deadline_error(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(
            rusqlite::ErrorCode::OperationInterrupted
                | rusqlite::ErrorCode::DatabaseBusy
                | rusqlite::ErrorCode::DatabaseLocked
        )
    )
}

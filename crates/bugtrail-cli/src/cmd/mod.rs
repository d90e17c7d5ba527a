//! Command handlers. Each submodule owns one `bt` subcommand.

pub mod assign;
pub mod bug;
pub mod comment;
pub mod init;
pub mod priority;
pub mod project;
pub mod sidebar;
pub mod status;
pub mod user;

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use bugtrail_core::config::{self, EffectiveConfig, TRACKER_DIR};
use bugtrail_core::error::ErrorCode;
use bugtrail_core::model::Bug;
use bugtrail_core::view::ProjectView;
use bugtrail_core::{BugStore, SqliteStore, Tracker, TrackerError};

use crate::actor;
use crate::output::{CliError, OutputMode, render, render_error, report};
use crate::validate::ValidationError;

/// Everything a handler needs besides its own arguments.
pub struct Context<'a> {
    pub root: &'a Path,
    pub output: OutputMode,
    pub config: &'a EffectiveConfig,
    pub as_user: Option<&'a str>,
}

impl Context<'_> {
    /// Resolve the acting user or render a `missing_user` error.
    pub fn actor(&self) -> anyhow::Result<String> {
        actor::require_actor(self.as_user, self.config.user.user.as_deref()).map_err(|e| {
            let _ = render_error(
                self.output,
                &CliError::with_details(
                    &e.message,
                    "Pass --as <user>, set BUGTRAIL_USER, or set `user` in the user config",
                    e.code,
                ),
            );
            anyhow::anyhow!(e.message)
        })
    }

    /// Open the tracker database, refusing to create one implicitly.
    pub fn open(&self) -> anyhow::Result<Tracker<SqliteStore>> {
        let path = config::db_path(self.root);
        if !path.exists() {
            let code = ErrorCode::NotInitialized;
            let msg = format!("{}: {} not found", code.message(), path.display());
            let _ = render_error(
                self.output,
                &CliError::with_details(&msg, code.hint().unwrap_or_default(), code.code()),
            );
            anyhow::bail!(msg);
        }
        let store = SqliteStore::open(&path, &self.config.tracker.storage)?;
        Ok(Tracker::new(store, self.config.tracker.validation.clone()))
    }

    /// Render a tracker failure and convert it for `main`.
    pub fn fail(&self, err: TrackerError) -> anyhow::Error {
        report(self.output, err)
    }

    /// Render an argument failure and convert it for `main`.
    pub fn reject(&self, err: &ValidationError) -> anyhow::Error {
        let _ = render_error(self.output, &err.to_cli_error());
        anyhow::anyhow!("{}", err.reason)
    }

    /// Load the page of the project `bug_id` belongs to.
    pub fn view_for_bug(
        &self,
        tracker: &Tracker<SqliteStore>,
        bug_id: &str,
    ) -> anyhow::Result<ProjectView> {
        let loaded = tracker
            .store()
            .fetch_bug(bug_id)
            .and_then(|bug| tracker.load_view(&bug.project_id, &self.config.tracker.view));
        loaded.map_err(|err| self.fail(err))
    }
}

/// Walk up from `start` to the directory holding `.bugtrail/`.
pub fn find_tracker_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(TRACKER_DIR).is_dir() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Shared rendering for status/priority/assignment changes.
pub fn render_bug_change(output: OutputMode, verb: &str, bug: &Bug) -> anyhow::Result<()> {
    render(output, bug, |b, w| {
        if output == OutputMode::Pretty {
            writeln!(w, "✓ {verb} {}", b.id)?;
        }
        write_bug_state(w, b)
    })
}

fn write_bug_state(w: &mut dyn Write, bug: &Bug) -> io::Result<()> {
    writeln!(
        w,
        "{}\t{}\t{}\t{}",
        bug.id,
        bug.status,
        bug.priority,
        bug.assignee_id.as_deref().unwrap_or("-")
    )
}

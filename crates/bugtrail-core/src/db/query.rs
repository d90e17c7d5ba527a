//! `SQLite` read helpers for the tracker database.
//!
//! All functions take a shared `&Connection` and return `anyhow::Result<T>`
//! with domain records (never raw rows). Missing rows come back as `None`
//! so callers decide what "not found" means.

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};
use std::str::FromStr;

use super::from_us;
use crate::model::{AssignedScope, Bug, BugSummary, Comment, Project, ProjectScope, User};

const BUG_COLUMNS: &str = "b.bug_id, b.title, b.description, b.priority, b.status, \
     b.reporter_id, b.assignee_id, b.project_id, \
     (SELECT COUNT(*) FROM comments c WHERE c.bug_id = b.bug_id), \
     b.created_at_us, b.updated_at_us";

const PROJECT_COLUMNS: &str = "p.project_id, p.name, p.owner_id, p.created_at_us, p.updated_at_us";

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Fetch one user by id.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_user(conn: &Connection, user_id: &str) -> Result<Option<User>> {
    conn.query_row(
        "SELECT user_id, name, image FROM users WHERE user_id = ?1",
        params![user_id],
        row_to_user,
    )
    .optional()
    .with_context(|| format!("get_user for '{user_id}'"))
}

/// Every registered user, by name.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_users(conn: &Connection) -> Result<Vec<User>> {
    let mut stmt = conn
        .prepare("SELECT user_id, name, image FROM users ORDER BY name, user_id")
        .context("prepare list_users")?;
    let rows = stmt.query_map([], row_to_user).context("execute list_users")?;

    let mut users = Vec::new();
    for row in rows {
        users.push(row.context("read user row")?);
    }
    Ok(users)
}

/// Developers on a project roster, in the order they were added.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_project_developers(conn: &Connection, project_id: &str) -> Result<Vec<User>> {
    let mut stmt = conn
        .prepare(
            "SELECT u.user_id, u.name, u.image \
             FROM project_developers d \
             INNER JOIN users u ON u.user_id = d.user_id \
             WHERE d.project_id = ?1 \
             ORDER BY d.added_at_us, d.user_id",
        )
        .context("prepare list_project_developers")?;
    let rows = stmt
        .query_map(params![project_id], row_to_user)
        .context("execute list_project_developers")?;

    let mut users = Vec::new();
    for row in rows {
        users.push(row.context("read developer row")?);
    }
    Ok(users)
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

/// Fetch one project with its developer roster.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_project(conn: &Connection, project_id: &str) -> Result<Option<Project>> {
    let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects p WHERE p.project_id = ?1");
    let project = conn
        .query_row(&sql, params![project_id], row_to_project)
        .optional()
        .with_context(|| format!("get_project for '{project_id}'"))?;

    match project {
        Some(mut project) => {
            project.developer_ids = developer_ids(conn, &project.id)?;
            Ok(Some(project))
        }
        None => Ok(None),
    }
}

/// Projects `user_id` owns, develops on, or both; most recently touched
/// first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_projects(conn: &Connection, user_id: &str, scope: ProjectScope) -> Result<Vec<Project>> {
    let condition = match scope {
        ProjectScope::Owner => "p.owner_id = ?1",
        ProjectScope::Developer => {
            "p.project_id IN (SELECT project_id FROM project_developers WHERE user_id = ?1)"
        }
        ProjectScope::All => {
            "p.owner_id = ?1 OR \
             p.project_id IN (SELECT project_id FROM project_developers WHERE user_id = ?1)"
        }
    };
    let sql = format!(
        "SELECT {PROJECT_COLUMNS} FROM projects p WHERE {condition} \
         ORDER BY p.updated_at_us DESC, p.project_id ASC"
    );

    let mut stmt = conn
        .prepare(&sql)
        .with_context(|| format!("prepare list_projects query: {sql}"))?;
    let rows = stmt
        .query_map(params![user_id], row_to_project)
        .context("execute list_projects")?;

    let mut projects = Vec::new();
    for row in rows {
        let mut project = row.context("read project row")?;
        project.developer_ids = developer_ids(conn, &project.id)?;
        projects.push(project);
    }
    Ok(projects)
}

fn developer_ids(conn: &Connection, project_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare(
            "SELECT user_id FROM project_developers WHERE project_id = ?1 \
             ORDER BY added_at_us, user_id",
        )
        .context("prepare developer_ids")?;
    let rows = stmt
        .query_map(params![project_id], |row| row.get::<_, String>(0))
        .context("execute developer_ids")?;

    let mut ids = Vec::new();
    for row in rows {
        ids.push(row.context("read developer id")?);
    }
    Ok(ids)
}

// ---------------------------------------------------------------------------
// Bugs
// ---------------------------------------------------------------------------

/// Fetch one bug with its comment thread, oldest comment first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_bug(conn: &Connection, bug_id: &str) -> Result<Option<Bug>> {
    let sql = format!("SELECT {BUG_COLUMNS} FROM bugs b WHERE b.bug_id = ?1");
    let summary = conn
        .query_row(&sql, params![bug_id], row_to_summary)
        .optional()
        .with_context(|| format!("get_bug for '{bug_id}'"))?;

    let Some(summary) = summary else {
        return Ok(None);
    };
    let comments = get_comments(conn, bug_id)?;

    Ok(Some(Bug {
        id: summary.id,
        title: summary.title,
        description: summary.description,
        priority: summary.priority,
        status: summary.status,
        reporter_id: summary.reporter_id,
        assignee_id: summary.assignee_id,
        project_id: summary.project_id,
        comments,
        created_at: summary.created_at,
        updated_at: summary.updated_at,
    }))
}

/// Every bug in a project as list rows, newest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_project_bugs(conn: &Connection, project_id: &str) -> Result<Vec<BugSummary>> {
    let sql = format!(
        "SELECT {BUG_COLUMNS} FROM bugs b WHERE b.project_id = ?1 \
         ORDER BY b.created_at_us DESC, b.bug_id ASC"
    );
    collect_summaries(conn, &sql, project_id)
}

/// Bugs assigned to `user_id`, most recently updated first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_assigned_bugs(
    conn: &Connection,
    user_id: &str,
    scope: AssignedScope,
) -> Result<Vec<BugSummary>> {
    let status_clause = match scope {
        AssignedScope::Open => " AND b.status <> 'CLOSED'",
        AssignedScope::All => "",
    };
    let sql = format!(
        "SELECT {BUG_COLUMNS} FROM bugs b WHERE b.assignee_id = ?1{status_clause} \
         ORDER BY b.updated_at_us DESC, b.bug_id ASC"
    );
    collect_summaries(conn, &sql, user_id)
}

/// Comments on a bug, oldest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_comments(conn: &Connection, bug_id: &str) -> Result<Vec<Comment>> {
    let mut stmt = conn
        .prepare(
            "SELECT comment_id, bug_id, author_id, body, created_at_us \
             FROM comments WHERE bug_id = ?1 \
             ORDER BY created_at_us ASC, rowid ASC",
        )
        .context("prepare get_comments")?;
    let rows = stmt
        .query_map(params![bug_id], |row| {
            Ok(Comment {
                id: row.get(0)?,
                bug_id: row.get(1)?,
                author_id: row.get(2)?,
                body: row.get(3)?,
                created_at: from_us(row.get(4)?, 4)?,
            })
        })
        .context("execute get_comments")?;

    let mut comments = Vec::new();
    for row in rows {
        comments.push(row.context("read comment row")?);
    }
    Ok(comments)
}

fn collect_summaries(conn: &Connection, sql: &str, key: &str) -> Result<Vec<BugSummary>> {
    let mut stmt = conn
        .prepare(sql)
        .with_context(|| format!("prepare bug list query: {sql}"))?;
    let rows = stmt
        .query_map(params![key], row_to_summary)
        .context("execute bug list query")?;

    let mut bugs = Vec::new();
    for row in rows {
        bugs.push(row.context("read bug row")?);
    }
    Ok(bugs)
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        image: row.get(2)?,
    })
}

fn row_to_project(row: &rusqlite::Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        owner_id: row.get(2)?,
        developer_ids: Vec::new(),
        created_at: from_us(row.get(3)?, 3)?,
        updated_at: from_us(row.get(4)?, 4)?,
    })
}

fn row_to_summary(row: &rusqlite::Row<'_>) -> rusqlite::Result<BugSummary> {
    let comment_count: i64 = row.get(8)?;
    Ok(BugSummary {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        priority: parse_column(row, 3)?,
        status: parse_column(row, 4)?,
        reporter_id: row.get(5)?,
        assignee_id: row.get(6)?,
        project_id: row.get(7)?,
        comment_count: usize::try_from(comment_count)
            .map_err(|_| rusqlite::Error::IntegralValueOutOfRange(8, comment_count))?,
        created_at: from_us(row.get(9)?, 9)?,
        updated_at: from_us(row.get(10)?, 10)?,
    })
}

fn parse_column<T>(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>().map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(error))
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

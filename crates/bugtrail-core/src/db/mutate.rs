//! `SQLite` write helpers.
//!
//! Each function issues the statements for one logical write and returns
//! the number of rows it touched; callers wrap them in a transaction and
//! treat `0` as "no such row". Every bug write also refreshes the parent
//! project's `updated_at_us`.

use anyhow::{Context, Result};
use rusqlite::{Connection, params};

use super::to_us;
use crate::model::{Bug, Comment, Priority, Project, Status, User};

/// Insert a user row.
///
/// # Errors
///
/// Returns an error on constraint violation (duplicate id) or I/O failure.
pub fn insert_user(conn: &Connection, user: &User, now_us: i64) -> Result<usize> {
    conn.execute(
        "INSERT INTO users (user_id, name, image, created_at_us) VALUES (?1, ?2, ?3, ?4)",
        params![user.id, user.name, user.image, now_us],
    )
    .with_context(|| format!("insert user '{}'", user.id))
}

/// Insert a project and its initial developer roster.
///
/// # Errors
///
/// Returns an error if the owner or a developer does not exist.
pub fn insert_project(conn: &Connection, project: &Project, now_us: i64) -> Result<usize> {
    let inserted = conn
        .execute(
            "INSERT INTO projects (project_id, name, owner_id, created_at_us, updated_at_us)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                project.id,
                project.name,
                project.owner_id,
                to_us(project.created_at),
                to_us(project.updated_at)
            ],
        )
        .with_context(|| format!("insert project '{}'", project.id))?;

    for developer in &project.developer_ids {
        insert_developer(conn, &project.id, developer, now_us)?;
    }
    Ok(inserted)
}

/// Add `user_id` to a project roster. Returns `0` when already present.
///
/// # Errors
///
/// Returns an error if the project or user does not exist.
pub fn insert_developer(conn: &Connection, project_id: &str, user_id: &str, now_us: i64) -> Result<usize> {
    conn.execute(
        "INSERT OR IGNORE INTO project_developers (project_id, user_id, added_at_us)
         VALUES (?1, ?2, ?3)",
        params![project_id, user_id, now_us],
    )
    .with_context(|| format!("add developer '{user_id}' to '{project_id}'"))
}

/// Delete a project; bugs, comments and roster rows cascade.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub fn delete_project(conn: &Connection, project_id: &str) -> Result<usize> {
    conn.execute("DELETE FROM projects WHERE project_id = ?1", params![project_id])
        .with_context(|| format!("delete project '{project_id}'"))
}

/// Insert a bug row and refresh its project.
///
/// # Errors
///
/// Returns an error on constraint violation or I/O failure.
pub fn insert_bug(conn: &Connection, bug: &Bug) -> Result<usize> {
    let inserted = conn
        .execute(
            "INSERT INTO bugs (bug_id, project_id, title, description, priority, status,
                               reporter_id, assignee_id, created_at_us, updated_at_us)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                bug.id,
                bug.project_id,
                bug.title,
                bug.description,
                bug.priority.as_str(),
                bug.status.as_str(),
                bug.reporter_id,
                bug.assignee_id,
                to_us(bug.created_at),
                to_us(bug.updated_at)
            ],
        )
        .with_context(|| format!("insert bug '{}'", bug.id))?;
    touch_project_of_bug(conn, &bug.id, to_us(bug.updated_at))?;
    Ok(inserted)
}

/// Set a bug's status. `UNASSIGNED` also clears the assignee.
///
/// # Errors
///
/// Returns an error if the update fails, including when the row would
/// break the assignee/status CHECK.
pub fn set_bug_status(conn: &Connection, bug_id: &str, status: Status, now_us: i64) -> Result<usize> {
    let changed = conn
        .execute(
            "UPDATE bugs
             SET status = ?2,
                 assignee_id = CASE WHEN ?2 = 'UNASSIGNED' THEN NULL ELSE assignee_id END,
                 updated_at_us = ?3
             WHERE bug_id = ?1",
            params![bug_id, status.as_str(), now_us],
        )
        .with_context(|| format!("set status of '{bug_id}' to {status}"))?;
    touch_project_of_bug(conn, bug_id, now_us)?;
    Ok(changed)
}

/// Set a bug's priority.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn set_bug_priority(
    conn: &Connection,
    bug_id: &str,
    priority: Priority,
    now_us: i64,
) -> Result<usize> {
    let changed = conn
        .execute(
            "UPDATE bugs SET priority = ?2, updated_at_us = ?3 WHERE bug_id = ?1",
            params![bug_id, priority.as_str(), now_us],
        )
        .with_context(|| format!("set priority of '{bug_id}' to {priority}"))?;
    touch_project_of_bug(conn, bug_id, now_us)?;
    Ok(changed)
}

/// Set assignee and status together in one statement.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn set_bug_assignment(
    conn: &Connection,
    bug_id: &str,
    assignee: Option<&str>,
    status: Status,
    now_us: i64,
) -> Result<usize> {
    let changed = conn
        .execute(
            "UPDATE bugs SET assignee_id = ?2, status = ?3, updated_at_us = ?4 WHERE bug_id = ?1",
            params![bug_id, assignee, status.as_str(), now_us],
        )
        .with_context(|| format!("set assignment of '{bug_id}'"))?;
    touch_project_of_bug(conn, bug_id, now_us)?;
    Ok(changed)
}

/// Append a comment and refresh the bug and its project.
///
/// # Errors
///
/// Returns an error if the bug or author does not exist.
pub fn insert_comment(conn: &Connection, comment: &Comment) -> Result<usize> {
    let now_us = to_us(comment.created_at);
    let inserted = conn
        .execute(
            "INSERT INTO comments (comment_id, bug_id, author_id, body, created_at_us)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![comment.id, comment.bug_id, comment.author_id, comment.body, now_us],
        )
        .with_context(|| format!("insert comment on '{}'", comment.bug_id))?;
    conn.execute(
        "UPDATE bugs SET updated_at_us = ?2 WHERE bug_id = ?1",
        params![comment.bug_id, now_us],
    )
    .with_context(|| format!("touch bug '{}'", comment.bug_id))?;
    touch_project_of_bug(conn, &comment.bug_id, now_us)?;
    Ok(inserted)
}

fn touch_project_of_bug(conn: &Connection, bug_id: &str, now_us: i64) -> Result<usize> {
    conn.execute(
        "UPDATE projects SET updated_at_us = MAX(updated_at_us, ?2)
         WHERE project_id = (SELECT project_id FROM bugs WHERE bug_id = ?1)",
        params![bug_id, now_us],
    )
    .with_context(|| format!("touch project of '{bug_id}'"))
}

//! SQLite schema for the tracker database.
//!
//! - `users`, `projects` and `bugs` hold one row per record
//! - `project_developers` is the developer roster edge table
//! - `comments` is append-only
//! - `tracker_meta` records the schema version
//!
//! Deleting a project cascades to its roster, its bugs and their comments.
//! The `bugs` table enforces the assignee/status coupling with a CHECK, so
//! a write that would break it is refused by SQLite as well.

/// Migration v1: tables and metadata.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS users (
    user_id TEXT PRIMARY KEY CHECK (length(trim(user_id)) > 0),
    name TEXT NOT NULL,
    image TEXT,
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS projects (
    project_id TEXT PRIMARY KEY,
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    owner_id TEXT NOT NULL REFERENCES users(user_id),
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL,
    CHECK (project_id LIKE 'prj-%')
);

CREATE TABLE IF NOT EXISTS project_developers (
    project_id TEXT NOT NULL REFERENCES projects(project_id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES users(user_id),
    added_at_us INTEGER NOT NULL,
    PRIMARY KEY (project_id, user_id)
);

CREATE TABLE IF NOT EXISTS bugs (
    bug_id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL REFERENCES projects(project_id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    priority TEXT NOT NULL CHECK (priority IN ('CRITICAL', 'HIGH', 'MEDIUM', 'LOW')),
    status TEXT NOT NULL
        CHECK (status IN ('UNASSIGNED', 'TODO', 'INPROGRESS', 'TESTING', 'CLOSED')),
    reporter_id TEXT NOT NULL REFERENCES users(user_id),
    assignee_id TEXT REFERENCES users(user_id),
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL,
    CHECK (bug_id LIKE 'bug-%'),
    CHECK ((assignee_id IS NULL) = (status = 'UNASSIGNED'))
);

CREATE TABLE IF NOT EXISTS comments (
    comment_id TEXT PRIMARY KEY,
    bug_id TEXT NOT NULL REFERENCES bugs(bug_id) ON DELETE CASCADE,
    author_id TEXT NOT NULL REFERENCES users(user_id),
    body TEXT NOT NULL CHECK (length(trim(body)) > 0),
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS tracker_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL,
    created_at_us INTEGER NOT NULL DEFAULT 0
);

INSERT OR IGNORE INTO tracker_meta (id, schema_version, created_at_us)
VALUES (1, 1, CAST((julianday('now') - 2440587.5) * 86400000000 AS INTEGER));
";

/// Migration v2: read-path indexes.
pub const MIGRATION_V2_SQL: &str = r"
CREATE INDEX IF NOT EXISTS idx_projects_owner_updated
    ON projects(owner_id, updated_at_us DESC);

CREATE INDEX IF NOT EXISTS idx_project_developers_user
    ON project_developers(user_id, project_id);

CREATE INDEX IF NOT EXISTS idx_bugs_project_created
    ON bugs(project_id, created_at_us DESC);

CREATE INDEX IF NOT EXISTS idx_bugs_assignee_status
    ON bugs(assignee_id, status);

CREATE INDEX IF NOT EXISTS idx_comments_bug_created
    ON comments(bug_id, created_at_us ASC);
";

/// Indexes every migrated database must carry.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_projects_owner_updated",
    "idx_project_developers_user",
    "idx_bugs_project_created",
    "idx_bugs_assignee_status",
    "idx_comments_bug_created",
];

#[cfg(test)]
mod tests {
    use crate::db::migrations;
    use rusqlite::{Connection, params};

    fn seeded_conn() -> rusqlite::Result<Connection> {
        let mut conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::migrate(&mut conn)?;
        conn.execute_batch(
            "INSERT INTO users (user_id, name, created_at_us) VALUES ('owner', 'Owner', 1);
             INSERT INTO users (user_id, name, created_at_us) VALUES ('dev', 'Dev', 1);
             INSERT INTO projects (project_id, name, owner_id, created_at_us, updated_at_us)
                 VALUES ('prj-1', 'Website', 'owner', 1, 1);
             INSERT INTO project_developers (project_id, user_id, added_at_us)
                 VALUES ('prj-1', 'dev', 1);",
        )?;
        Ok(conn)
    }

    fn insert_bug(
        conn: &Connection,
        id: &str,
        status: &str,
        assignee: Option<&str>,
    ) -> rusqlite::Result<usize> {
        conn.execute(
            "INSERT INTO bugs (bug_id, project_id, title, priority, status, reporter_id,
                               assignee_id, created_at_us, updated_at_us)
             VALUES (?1, 'prj-1', 'Broken link', 'LOW', ?2, 'dev', ?3, 1, 1)",
            params![id, status, assignee],
        )
    }

    #[test]
    fn coupling_check_rejects_inconsistent_rows() -> rusqlite::Result<()> {
        let conn = seeded_conn()?;
        insert_bug(&conn, "bug-ok1", "UNASSIGNED", None)?;
        insert_bug(&conn, "bug-ok2", "TESTING", Some("dev"))?;
        assert!(insert_bug(&conn, "bug-bad1", "TODO", None).is_err());
        assert!(insert_bug(&conn, "bug-bad2", "UNASSIGNED", Some("dev")).is_err());
        Ok(())
    }

    #[test]
    fn unknown_enum_values_are_rejected() -> rusqlite::Result<()> {
        let conn = seeded_conn()?;
        assert!(insert_bug(&conn, "bug-bad", "DONE", Some("dev")).is_err());
        Ok(())
    }

    #[test]
    fn project_delete_cascades_to_bugs_and_comments() -> rusqlite::Result<()> {
        let conn = seeded_conn()?;
        insert_bug(&conn, "bug-1", "TODO", Some("dev"))?;
        conn.execute(
            "INSERT INTO comments (comment_id, bug_id, author_id, body, created_at_us)
             VALUES ('cmt-1', 'bug-1', 'owner', 'on it', 2)",
            [],
        )?;

        conn.execute("DELETE FROM projects WHERE project_id = 'prj-1'", [])?;

        for table in ["bugs", "comments", "project_developers"] {
            let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?;
            assert_eq!(n, 0, "{table} should be empty");
        }
        let users: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?;
        assert_eq!(users, 2);
        Ok(())
    }

    #[test]
    fn blank_comment_bodies_are_rejected() -> rusqlite::Result<()> {
        let conn = seeded_conn()?;
        insert_bug(&conn, "bug-1", "TODO", Some("dev"))?;
        let res = conn.execute(
            "INSERT INTO comments (comment_id, bug_id, author_id, body, created_at_us)
             VALUES ('cmt-1', 'bug-1', 'owner', '   ', 2)",
            [],
        );
        assert!(res.is_err());
        Ok(())
    }
}

//! SQLite tracker database utilities.
//!
//! Runtime pragmas:
//! - `journal_mode = WAL` so readers never block the single writer
//! - `busy_timeout` from `storage.write_timeout_ms`
//! - `foreign_keys = ON` so project deletes cascade

pub mod migrations;
pub mod mutate;
pub mod query;
pub mod schema;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::{path::Path, time::Duration};

/// Open (or create) the tracker database, apply runtime pragmas, and
/// migrate the schema to the latest version.
///
/// # Errors
///
/// Returns an error if opening/configuring/migrating the database fails.
pub fn open_db(path: &Path, busy_timeout: Duration) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create tracker db directory {}", parent.display()))?;
    }

    let mut conn = Connection::open(path)
        .with_context(|| format!("open tracker database {}", path.display()))?;

    configure_connection(&conn, busy_timeout).context("configure sqlite pragmas")?;
    let _journal_mode: String = conn
        .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
        .context("enable WAL")?;
    migrate_checked(&mut conn)?;

    Ok(conn)
}

/// In-memory database with the full schema, for tests and dry runs.
///
/// # Errors
///
/// Returns an error if configuring or migrating fails.
pub fn open_in_memory(busy_timeout: Duration) -> Result<Connection> {
    let mut conn = Connection::open_in_memory().context("open in-memory database")?;
    configure_connection(&conn, busy_timeout).context("configure sqlite pragmas")?;
    migrate_checked(&mut conn)?;
    Ok(conn)
}

fn migrate_checked(conn: &mut Connection) -> Result<()> {
    migrations::migrate(conn).context("apply tracker migrations")?;
    let missing = migrations::missing_indexes(conn).context("inspect tracker indexes")?;
    if !missing.is_empty() {
        anyhow::bail!("tracker schema is missing indexes: {}", missing.join(", "));
    }
    Ok(())
}

fn configure_connection(conn: &Connection, busy_timeout: Duration) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.busy_timeout(busy_timeout)?;
    Ok(())
}

/// Microseconds since the Unix epoch, the on-disk timestamp unit.
#[must_use]
pub fn to_us(at: DateTime<Utc>) -> i64 {
    at.timestamp_micros()
}

/// Inverse of [`to_us`]; `column` is reported on out-of-range values.
///
/// # Errors
///
/// Returns an error if `us` is outside chrono's representable range.
pub fn from_us(us: i64, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_micros(us)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(column, us))
}

#[cfg(test)]
mod tests {
    use super::{from_us, open_db, to_us};
    use crate::db::migrations;
    use chrono::Utc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn temp_db_path() -> (TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join(".bugtrail").join("bugtrail.db");
        (dir, path)
    }

    #[test]
    fn open_db_sets_wal_busy_timeout_and_fk() {
        let (_dir, path) = temp_db_path();
        let conn = open_db(&path, Duration::from_millis(750)).expect("open tracker db");

        let journal_mode: String = conn
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .expect("query journal_mode");
        assert_eq!(journal_mode.to_ascii_lowercase(), "wal");

        let busy_timeout_ms: u64 = conn
            .pragma_query_value(None, "busy_timeout", |row| row.get(0))
            .expect("query busy_timeout");
        assert_eq!(busy_timeout_ms, 750);

        let foreign_keys: i64 = conn
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .expect("query foreign_keys");
        assert_eq!(foreign_keys, 1);
    }

    #[test]
    fn open_db_runs_migrations() {
        let (_dir, path) = temp_db_path();
        let conn = open_db(&path, Duration::from_secs(1)).expect("open tracker db");

        let version = migrations::current_schema_version(&conn).expect("schema version query");
        assert_eq!(version, migrations::LATEST_SCHEMA_VERSION);

        let meta_version: i64 = conn
            .query_row("SELECT schema_version FROM tracker_meta WHERE id = 1", [], |row| {
                row.get(0)
            })
            .expect("tracker_meta schema version");
        assert_eq!(meta_version, i64::from(migrations::LATEST_SCHEMA_VERSION));
    }

    #[test]
    fn timestamps_keep_microseconds() {
        let now = Utc::now();
        let back = from_us(to_us(now), 0).expect("in range");
        assert_eq!(to_us(back), to_us(now));
        assert!(from_us(i64::MAX, 3).is_err());
    }
}

//! Versioned schema for the tracker database.
//!
//! `PRAGMA user_version` is the source of truth; `tracker_meta.schema_version`
//! mirrors it for `bt init` reporting.

use super::schema;
use rusqlite::{Connection, OptionalExtension, types::Type};

/// Latest schema version understood by this binary.
pub const LATEST_SCHEMA_VERSION: u32 = 2;

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "users, projects, bugs and comments",
        sql: schema::MIGRATION_V1_SQL,
    },
    Migration {
        version: 2,
        name: "list, roster and assignment indexes",
        sql: schema::MIGRATION_V2_SQL,
    },
];

/// Schema version recorded in `PRAGMA user_version`.
///
/// # Errors
///
/// Returns an error if the pragma cannot be read or is negative.
pub fn current_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    let raw: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    u32::try_from(raw)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(0, Type::Integer, Box::new(err)))
}

/// Bring the database up to [`LATEST_SCHEMA_VERSION`], one transaction per
/// step. Steps at or below the recorded version are skipped.
///
/// # Errors
///
/// Returns an error if any step fails; earlier steps stay committed.
pub fn migrate(conn: &mut Connection) -> rusqlite::Result<u32> {
    let start = current_schema_version(conn)?;
    let mut current = start;

    for step in MIGRATIONS.iter().filter(|m| m.version > start) {
        let tx = conn.transaction()?;
        tx.execute_batch(step.sql)?;
        tx.pragma_update(None, "user_version", i64::from(step.version))?;
        tx.execute(
            "UPDATE tracker_meta SET schema_version = ?1 WHERE id = 1",
            [i64::from(step.version)],
        )?;
        tx.commit()?;
        tracing::debug!(version = step.version, step = step.name, "migrated tracker schema");
        current = step.version;
    }

    Ok(current)
}

/// Indexes from [`schema::REQUIRED_INDEXES`] that the database lacks.
///
/// # Errors
///
/// Returns an error if `sqlite_master` cannot be queried.
pub fn missing_indexes(conn: &Connection) -> rusqlite::Result<Vec<&'static str>> {
    let mut stmt = conn.prepare("SELECT 1 FROM sqlite_master WHERE type = 'index' AND name = ?1")?;
    let mut missing = Vec::new();
    for index in schema::REQUIRED_INDEXES {
        if stmt.query_row([*index], |_| Ok(())).optional()?.is_none() {
            missing.push(*index);
        }
    }
    Ok(missing)
}

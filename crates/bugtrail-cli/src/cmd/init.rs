use crate::output::{OutputMode, render};
use anyhow::{Context as _, Result};
use bugtrail_core::SqliteStore;
use bugtrail_core::config::{self, TrackerConfig};
use clap::Args;
use serde::Serialize;
use std::path::Path;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Rewrite the default config even if `.bugtrail/` already exists.
    /// The database and its contents are kept.
    #[arg(long)]
    pub force: bool,
}

const GITIGNORE: &str = "bugtrail.db\nbugtrail.db-wal\nbugtrail.db-shm\n";

#[derive(Debug, Serialize)]
struct InitOutput {
    ok: bool,
    db: String,
    config: String,
    schema_version: u32,
}

/// Execute `bt init`. Creates:
///
/// ```text
/// .bugtrail/
///   bugtrail.db     (SQLite, migrated to the latest schema)
///   config.toml     (default tracker config)
///   .gitignore      (database files)
/// ```
///
/// # Errors
///
/// Returns an error if `.bugtrail/` already exists and `--force` is not set,
/// or if any filesystem or database operation fails.
pub fn run_init(args: &InitArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let dir = config::tracker_dir(project_root);

    if dir.exists() && !args.force {
        anyhow::bail!(".bugtrail/ already exists. Use `bt init --force` to reinitialize.");
    }

    let config_path = config::write_tracker_config(project_root, &TrackerConfig::default())?;

    let gitignore_path = dir.join(".gitignore");
    std::fs::write(&gitignore_path, GITIGNORE)
        .with_context(|| format!("Failed to write .gitignore: {}", gitignore_path.display()))?;

    let db_path = config::db_path(project_root);
    let store = SqliteStore::open(&db_path, &TrackerConfig::default().storage)?;
    let schema_version = bugtrail_core::db::migrations::current_schema_version(store.connection())?;

    let result = InitOutput {
        ok: true,
        db: db_path.display().to_string(),
        config: config_path.display().to_string(),
        schema_version,
    };

    render(output, &result, |r, w| {
        writeln!(w, "✓ Initialized .bugtrail/ (schema v{})", r.schema_version)?;
        writeln!(w)?;
        writeln!(w, "  Database: {}", r.db)?;
        writeln!(w, "  Config:   {}", r.config)?;
        writeln!(w)?;
        writeln!(w, "Next steps:")?;
        writeln!(w, "  Register yourself and pick an acting user:")?;
        writeln!(w, "    bt user add alice --name \"Alice Doe\"")?;
        writeln!(w, "    export BUGTRAIL_USER=alice")?;
        writeln!(w)?;
        writeln!(w, "  Create your first project:")?;
        writeln!(w, "    bt project create \"My project\"")
    })
}

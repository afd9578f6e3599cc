pub mod migrations;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;

/// Register the SQL functions the library queries rely on.
///
/// `casefold(text)` lower-cases with full Unicode rules, unlike SQLite's
/// built-in `lower()` which only folds ASCII. NULL in, NULL out.
pub fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "casefold",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value: Option<String> = ctx.get(0)?;
            Ok(value.map(|v| v.to_lowercase()))
        },
    )
}

/// Open (or create) the shelf database at the given path, with SQL functions
/// registered and schema initialized.
pub fn open_database(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    let conn = Connection::open(path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;

    // Enable WAL mode for better concurrent read performance
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;

    prepare(&conn)?;

    tracing::info!(path = %path.display(), "database initialized");
    Ok(conn)
}

/// Open a fully initialized in-memory database.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    prepare(&conn)?;
    Ok(conn)
}

fn prepare(conn: &Connection) -> Result<()> {
    register_functions(conn).context("failed to register SQL functions")?;
    schema::init_schema(conn).context("failed to initialize schema")?;
    migrations::run_migrations(conn).context("failed to run migrations")?;
    Ok(())
}

/// Result of [`check_database_health`].
#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub integrity_ok: bool,
    pub schema_version: u32,
    pub reader_count: u64,
    pub publication_count: u64,
    pub deleted_publication_count: u64,
    pub tag_count: u64,
    pub activity_count: u64,
}

/// Run an integrity check and collect row counts.
pub fn check_database_health(conn: &Connection) -> Result<HealthReport> {
    let integrity: String = conn
        .query_row("PRAGMA integrity_check", [], |row| row.get(0))
        .context("integrity check failed to run")?;
    let schema_version = migrations::get_schema_version(conn)?;

    let count = |sql: &str| -> Result<u64> {
        let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
        Ok(n as u64)
    };

    Ok(HealthReport {
        integrity_ok: integrity == "ok",
        schema_version,
        reader_count: count("SELECT COUNT(*) FROM readers")?,
        publication_count: count("SELECT COUNT(*) FROM publications WHERE deleted IS NULL")?,
        deleted_publication_count: count(
            "SELECT COUNT(*) FROM publications WHERE deleted IS NOT NULL",
        )?,
        tag_count: count("SELECT COUNT(*) FROM tags WHERE deleted IS NULL")?,
        activity_count: count("SELECT COUNT(*) FROM activity_log")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn casefold_lowercases_unicode() {
        let conn = open_in_memory().unwrap();
        let folded: String = conn
            .query_row("SELECT casefold('ÉCOLE Ünd Straße')", [], |row| row.get(0))
            .unwrap();
        assert_eq!(folded, "école ünd straße");
    }

    #[test]
    fn casefold_passes_null_through() {
        let conn = open_in_memory().unwrap();
        let folded: Option<String> = conn
            .query_row("SELECT casefold(NULL)", [], |row| row.get(0))
            .unwrap();
        assert!(folded.is_none());
    }

    #[test]
    fn health_report_on_fresh_db() {
        let conn = open_in_memory().unwrap();
        let report = check_database_health(&conn).unwrap();
        assert!(report.integrity_ok);
        assert_eq!(report.schema_version, migrations::CURRENT_SCHEMA_VERSION);
        assert_eq!(report.publication_count, 0);
    }
}

//! SQL DDL for all shelf tables.
//!
//! Defines `readers`, `publications`, `attributions`, `tags`,
//! `publication_tags` (the tag membership junction), `activity_log`, and
//! `schema_meta`. All DDL uses `IF NOT EXISTS` for idempotent initialization.

use rusqlite::Connection;

/// All schema DDL statements for shelf's core tables.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS readers (
    id TEXT PRIMARY KEY,
    auth_id TEXT NOT NULL UNIQUE,
    name TEXT,
    published TEXT NOT NULL,
    updated TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS publications (
    id TEXT PRIMARY KEY,
    reader_id TEXT NOT NULL REFERENCES readers(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    type TEXT NOT NULL,
    abstract TEXT,
    description TEXT,
    metadata TEXT,
    date_published TEXT,
    status TEXT,
    encoding_format TEXT,
    resources TEXT,
    links TEXT,
    published TEXT NOT NULL,
    updated TEXT NOT NULL,
    deleted TEXT
);

CREATE INDEX IF NOT EXISTS idx_publications_reader ON publications(reader_id, deleted);
CREATE INDEX IF NOT EXISTS idx_publications_updated ON publications(updated);

CREATE TABLE IF NOT EXISTS attributions (
    id TEXT PRIMARY KEY,
    publication_id TEXT NOT NULL REFERENCES publications(id) ON DELETE CASCADE,
    reader_id TEXT NOT NULL,
    role TEXT NOT NULL,
    name TEXT NOT NULL,
    normalized_name TEXT NOT NULL,
    published TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_attributions_publication ON attributions(publication_id);

CREATE TABLE IF NOT EXISTS tags (
    id TEXT PRIMARY KEY,
    reader_id TEXT NOT NULL REFERENCES readers(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    type TEXT NOT NULL,
    published TEXT NOT NULL,
    updated TEXT NOT NULL,
    deleted TEXT
);

CREATE INDEX IF NOT EXISTS idx_tags_reader ON tags(reader_id);

CREATE TABLE IF NOT EXISTS publication_tags (
    publication_id TEXT NOT NULL REFERENCES publications(id) ON DELETE CASCADE,
    tag_id TEXT NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    PRIMARY KEY (publication_id, tag_id)
);

CREATE INDEX IF NOT EXISTS idx_publication_tags_tag ON publication_tags(tag_id);

-- Activity log
CREATE TABLE IF NOT EXISTS activity_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    reader_id TEXT NOT NULL,
    type TEXT NOT NULL CHECK(type IN ('Create','Update','Delete','Add','Remove')),
    object_id TEXT NOT NULL,
    target_id TEXT,
    published TEXT NOT NULL
);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    // Set initial schema version if not already present
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}

//! Database schema and migrations.

use rusqlite::Connection;
use tracing::info;

use crate::error::Result;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 3;

/// Run all pending migrations.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;

    if current_version < SCHEMA_VERSION {
        info!(
            "Running migrations from version {} to {}",
            current_version, SCHEMA_VERSION
        );

        if current_version < 1 {
            migrate_v1(conn)?;
        }

        if current_version < 2 {
            migrate_v2(conn)?;
        }

        if current_version < 3 {
            migrate_v3(conn)?;
        }

        set_schema_version(conn, SCHEMA_VERSION)?;
        info!("Migrations complete");
    }

    Ok(())
}

/// Get the current schema version.
fn get_schema_version(conn: &Connection) -> Result<i32> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        [],
    )?;

    let version: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .ok();

    Ok(version.unwrap_or(0))
}

/// Set the schema version.
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

/// Migration to version 1: corrections and citation outcomes.
fn migrate_v1(conn: &Connection) -> Result<()> {
    info!("Applying migration v1: misclassifications and citation outcomes");

    // Message text is stored as hash + preview only
    conn.execute(
        "CREATE TABLE IF NOT EXISTS misclassifications (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            app_id TEXT NOT NULL,
            conversation_id TEXT NOT NULL,
            text_hash TEXT NOT NULL,
            preview TEXT NOT NULL,
            original_category TEXT NOT NULL,
            corrected_category TEXT NOT NULL,
            outcome TEXT NOT NULL,
            run_id TEXT,
            tags TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_misclassifications_app
         ON misclassifications (app_id, created_at)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_misclassifications_text_hash
         ON misclassifications (text_hash)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS citation_outcomes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            memory_id TEXT NOT NULL,
            run_id TEXT NOT NULL,
            app_id TEXT NOT NULL,
            outcome TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE (memory_id, run_id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_citation_outcomes_run ON citation_outcomes (run_id)",
        [],
    )?;

    Ok(())
}

/// Migration to version 2: per-category decision volume.
fn migrate_v2(conn: &Connection) -> Result<()> {
    info!("Applying migration v2: category volume");

    conn.execute(
        "CREATE TABLE IF NOT EXISTS category_volume (
            app_id TEXT NOT NULL,
            category TEXT NOT NULL,
            count INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (app_id, category)
        )",
        [],
    )?;

    Ok(())
}

/// Migration to version 3: pipeline stage on corrections.
fn migrate_v3(conn: &Connection) -> Result<()> {
    info!("Applying migration v3: misclassification stage");

    conn.execute(
        "ALTER TABLE misclassifications ADD COLUMN stage TEXT NOT NULL DEFAULT 'classify'",
        [],
    )?;

    Ok(())
}

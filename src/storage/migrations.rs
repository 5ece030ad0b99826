/// Database migration management
///
/// This module handles creating and updating the SQLite database schema.
/// It ensures the database has all the required tables and indexes.

use rusqlite::{Connection, OptionalExtension};
use crate::storage::StorageError;

/// Current database schema version
///
/// Increment this when you add new migrations
const CURRENT_VERSION: i32 = 1;

/// Initialize the database schema
///
/// This creates all required tables and indexes if they don't exist.
/// It also sets up the version tracking for future migrations.
pub fn initialize_database(conn: &Connection) -> Result<(), StorageError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        [],
    )?;

    let current_version = get_current_version(conn)?;

    if current_version < CURRENT_VERSION {
        run_migrations(conn, current_version)?;
        set_version(conn, CURRENT_VERSION)?;
    } else if current_version > CURRENT_VERSION {
        return Err(StorageError::Migration(format!(
            "Database schema version {} is newer than supported version {}",
            current_version, CURRENT_VERSION
        )));
    }

    Ok(())
}

/// Get the current database schema version
fn get_current_version(conn: &Connection) -> Result<i32, StorageError> {
    let version = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get::<_, i32>(0)
        })
        .optional()?;

    // No version row yet means a fresh database
    Ok(version.unwrap_or(0))
}

/// Set the database schema version
fn set_version(conn: &Connection, version: i32) -> Result<(), StorageError> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

/// Run database migrations from the current version to the latest
fn run_migrations(conn: &Connection, from_version: i32) -> Result<(), StorageError> {
    if from_version < 1 {
        migration_v1(conn)?;
    }

    Ok(())
}

/// Migration to version 1: lessons and skill snapshots
fn migration_v1(conn: &Connection) -> Result<(), StorageError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS lessons (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            language TEXT NOT NULL,
            level INTEGER NOT NULL,
            context TEXT NOT NULL DEFAULT '',
            target_sentence TEXT NOT NULL DEFAULT '',
            correct_translation TEXT NOT NULL DEFAULT '',
            source_title TEXT,
            source_author TEXT,
            required_vocabulary INTEGER NOT NULL DEFAULT 0,
            required_grammar INTEGER NOT NULL DEFAULT 0,
            required_reading INTEGER NOT NULL DEFAULT 0,
            required_writing INTEGER NOT NULL DEFAULT 0,
            vocabulary_gain INTEGER NOT NULL DEFAULT 0,
            grammar_gain INTEGER NOT NULL DEFAULT 0,
            reading_gain INTEGER NOT NULL DEFAULT 0,
            writing_gain INTEGER NOT NULL DEFAULT 0,
            xp_reward INTEGER NOT NULL DEFAULT 0,
            created_by TEXT NOT NULL,
            created_at TEXT NOT NULL,
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            sort_order INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    // One row per learner, replaced as a whole on every completion.
    // completed_lessons holds a JSON array of lesson ids.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS skill_snapshots (
            learner_id TEXT PRIMARY KEY,
            vocabulary INTEGER NOT NULL DEFAULT 0 CHECK (vocabulary BETWEEN 0 AND 100),
            grammar INTEGER NOT NULL DEFAULT 0 CHECK (grammar BETWEEN 0 AND 100),
            reading INTEGER NOT NULL DEFAULT 0 CHECK (reading BETWEEN 0 AND 100),
            writing INTEGER NOT NULL DEFAULT 0 CHECK (writing BETWEEN 0 AND 100),
            total_xp INTEGER NOT NULL DEFAULT 0 CHECK (total_xp >= 0),
            streak INTEGER NOT NULL DEFAULT 0 CHECK (streak >= 0),
            last_practice_date TEXT,
            completed_lessons TEXT NOT NULL DEFAULT '[]',
            revision INTEGER NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    create_indexes_v1(conn)?;

    tracing::info!("Applied migration v1: Created initial database schema");
    Ok(())
}

/// Create database indexes for version 1
fn create_indexes_v1(conn: &Connection) -> Result<(), StorageError> {
    // Catalog listing filters on is_active and sorts by sort_order
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_lessons_active_order
         ON lessons (is_active, sort_order)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_lessons_order
         ON lessons (sort_order)",
        [],
    )?;

    tracing::info!("Created database indexes for v1");
    Ok(())
}

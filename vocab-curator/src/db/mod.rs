//! Database access for vocab-curator
//!
//! One SQLite file holds the curated tables themselves plus the service's
//! own `review_queue` and `corrections_log` tables.

pub mod log;
pub mod records;
pub mod reviews;

use anyhow::Result;
use sqlx::SqlitePool;
use std::path::Path;

pub use log::{CorrectionLog, LoggedCorrection};
pub use records::SqliteRecordStore;
pub use reviews::{ReviewItem, ReviewQueueEscalator, ReviewStatus};

/// Initialize database connection pool
///
/// Creates the file (and parent directory) if needed, then the service
/// tables.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Create the service tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS review_queue (
            id TEXT PRIMARY KEY,
            table_name TEXT NOT NULL,
            column_name TEXT NOT NULL,
            row_key INTEGER NOT NULL,
            original_value TEXT NOT NULL,
            candidates TEXT NOT NULL,
            suggested_values TEXT NOT NULL,
            selected_value TEXT NOT NULL,
            confidence REAL NOT NULL,
            reason TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT 'pending',
            resolved_value TEXT,
            created_at TEXT NOT NULL,
            resolved_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS corrections_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            table_name TEXT NOT NULL,
            row_index INTEGER NOT NULL,
            column_name TEXT NOT NULL,
            original_value TEXT NOT NULL,
            suggested_values TEXT NOT NULL,
            selected_value TEXT NOT NULL,
            reason TEXT NOT NULL,
            disposition TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (review_queue, corrections_log)");

    Ok(())
}

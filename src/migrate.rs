//! Database schema migrations.
//!
//! Every statement is idempotent, so `visionaid init` and server startup
//! can both run them.
//!
//! | Table | Rows |
//! |-------|------|
//! | `users` | at most one (`id = 1`) |
//! | `scan_logs` | append-only scan summaries |
//! | `emergency_logs` | append-only SOS events |

use anyhow::Result;
use sqlx::SqlitePool;

use visionaid_core::store::seed_user;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

/// Open the configured database, apply the schema, seed the default
/// profile, and close the pool.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;

    let store = SqliteStore::new(pool);
    seed_user(&store).await?;
    store.pool().close().await;
    Ok(())
}

/// Apply the schema to an open pool.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            name TEXT NOT NULL,
            address TEXT,
            emergency_contact TEXT NOT NULL,
            alternate_contact TEXT,
            language TEXT NOT NULL DEFAULT 'en',
            preferences_json TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scan_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            type TEXT NOT NULL CHECK (type IN ('object', 'text', 'currency')),
            result TEXT NOT NULL,
            confidence INTEGER,
            timestamp INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS emergency_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            location_lat TEXT,
            location_lng TEXT,
            status TEXT NOT NULL DEFAULT 'triggered',
            timestamp INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Timestamps are unix milliseconds.
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_scan_logs_timestamp ON scan_logs(timestamp DESC)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_emergency_logs_timestamp ON emergency_logs(timestamp DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

//! Version-tracked schema migrations for the libSQL backend.
//!
//! Each migration has a version number and SQL. `run_migrations()` checks
//! the current version and applies only the new ones sequentially.

use libsql::Connection;

use crate::error::StoreError;

/// A single migration step.
struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

/// All migrations in order. Add new versions to the end.
static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: r#"
        CREATE TABLE IF NOT EXISTS feedback (
            id TEXT PRIMARY KEY,
            organization_id TEXT NOT NULL,
            feedback_text TEXT NOT NULL,
            source TEXT NOT NULL,
            customer_segment TEXT NOT NULL,
            customer_name TEXT,
            customer_email TEXT,
            status TEXT NOT NULL DEFAULT 'New',
            category TEXT,
            urgency TEXT,
            sentiment TEXT,
            impact_score INTEGER,
            key_themes TEXT,
            priority_score INTEGER,
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_feedback_org ON feedback(organization_id);
        CREATE INDEX IF NOT EXISTS idx_feedback_priority
            ON feedback(organization_id, priority_score DESC);

        CREATE TABLE IF NOT EXISTS integration_settings (
            id TEXT PRIMARY KEY,
            organization_id TEXT NOT NULL,
            integration_type TEXT NOT NULL,
            credentials TEXT NOT NULL,
            routing TEXT,
            is_active INTEGER NOT NULL DEFAULT 0,
            last_synced_at TEXT,
            settings TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (organization_id, integration_type)
        );
        CREATE INDEX IF NOT EXISTS idx_settings_org
            ON integration_settings(organization_id);

        CREATE TABLE IF NOT EXISTS sync_history (
            id TEXT PRIMARY KEY,
            organization_id TEXT NOT NULL,
            integration_type TEXT NOT NULL,
            trigger_kind TEXT NOT NULL,
            items_synced INTEGER NOT NULL,
            status TEXT NOT NULL,
            error_details TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_sync_history_org
            ON sync_history(organization_id, created_at DESC);
    "#,
}];

/// Run all pending migrations against the given connection.
///
/// Creates the `_migrations` tracking table if it doesn't exist.
pub async fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        (),
    )
    .await
    .map_err(|e| StoreError::Migration(format!("Failed to create _migrations table: {e}")))?;

    let current_version = get_current_version(conn).await?;

    for migration in MIGRATIONS {
        if migration.version > current_version {
            tracing::info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            conn.execute_batch(migration.sql).await.map_err(|e| {
                StoreError::Migration(format!(
                    "Migration V{} ({}) failed: {e}",
                    migration.version, migration.name
                ))
            })?;
            conn.execute(
                "INSERT INTO _migrations (version, name) VALUES (?1, ?2)",
                libsql::params![migration.version, migration.name],
            )
            .await
            .map_err(|e| {
                StoreError::Migration(format!(
                    "Failed to record migration V{}: {e}",
                    migration.version
                ))
            })?;
        }
    }

    Ok(())
}

/// Get the highest applied migration version, or 0 if none.
async fn get_current_version(conn: &Connection) -> Result<i64, StoreError> {
    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM _migrations", ())
        .await
        .map_err(|e| StoreError::Migration(format!("Failed to query migration version: {e}")))?;

    let row = rows
        .next()
        .await
        .map_err(|e| StoreError::Migration(format!("Failed to read migration version: {e}")))?
        .ok_or_else(|| StoreError::Migration("Empty migration version query".into()))?;

    row.get(0)
        .map_err(|e| StoreError::Migration(format!("Invalid migration version: {e}")))
}

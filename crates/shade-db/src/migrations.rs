//! # Schema Migrations
//!
//! The ledger schema ships inside the binary. Opening a [`crate::Database`]
//! brings the file up to date before any repository touches it.
//!
//! ## Versions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  migrations/sqlite/                                                     │
//! │  └── 001_initial_schema.sql                                             │
//! │        catalog:   products → variants → colors                          │
//! │        sales:     sales → sale_items, payment_history                   │
//! │        returns:   returns → return_items                                │
//! │        stock:     stock_in_history                                      │
//! │        replication: change_feed                                         │
//! │                                                                         │
//! │  _sqlx_migrations   one row per applied version (sqlx bookkeeping)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! New versions are appended as `NNN_description.sql`; applied files are
//! never edited because sqlx stores their checksums.

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Tables every ledger database must have once migrated.
pub const LEDGER_TABLES: &[&str] = &[
    "products",
    "variants",
    "colors",
    "sales",
    "sale_items",
    "payment_history",
    "returns",
    "return_items",
    "stock_in_history",
    "change_feed",
];

/// Where a database file stands against the embedded schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationStatus {
    /// Versions embedded in this build.
    pub available: usize,
    /// Versions recorded as successfully applied.
    pub applied: usize,
    /// Highest applied version, `None` on a fresh file.
    pub latest_version: Option<i64>,
}

impl MigrationStatus {
    /// Number of embedded versions not yet applied.
    pub fn pending(&self) -> usize {
        self.available.saturating_sub(self.applied)
    }

    /// The file is on the newest embedded schema.
    pub fn is_current(&self) -> bool {
        self.pending() == 0
    }
}

/// Applies pending versions and reports the resulting status.
///
/// Each version runs in its own transaction; re-running is a no-op.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<MigrationStatus> {
    let before = migration_status(pool).await?;
    if before.is_current() {
        debug!(version = ?before.latest_version, "Ledger schema is current");
        return Ok(before);
    }

    info!(pending = before.pending(), from = ?before.latest_version, "Upgrading ledger schema");
    MIGRATOR.run(pool).await?;

    let after = migration_status(pool).await?;
    info!(version = ?after.latest_version, "Ledger schema upgraded");
    Ok(after)
}

/// Reads the applied versions without changing anything.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<MigrationStatus> {
    let available = MIGRATOR.migrations.len();

    if !table_exists(pool, "_sqlx_migrations").await? {
        return Ok(MigrationStatus {
            available,
            applied: 0,
            latest_version: None,
        });
    }

    let (applied, latest_version): (i64, Option<i64>) = sqlx::query_as(
        "SELECT COUNT(*), MAX(version) FROM _sqlx_migrations WHERE success = 1",
    )
    .fetch_one(pool)
    .await?;

    Ok(MigrationStatus {
        available,
        applied: usize::try_from(applied).unwrap_or(0),
        latest_version,
    })
}

/// Ledger tables absent from the file, in [`LEDGER_TABLES`] order.
pub async fn missing_tables(pool: &SqlitePool) -> DbResult<Vec<&'static str>> {
    let mut missing = Vec::new();
    for table in LEDGER_TABLES {
        if !table_exists(pool, table).await? {
            missing.push(*table);
        }
    }
    Ok(missing)
}

async fn table_exists(pool: &SqlitePool, name: &str) -> DbResult<bool> {
    let found: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1")
            .bind(name)
            .fetch_one(pool)
            .await?;
    Ok(found > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn bare_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_fresh_file_reports_everything_pending() {
        let pool = bare_pool().await;

        let status = migration_status(&pool).await.unwrap();
        assert_eq!(status.applied, 0);
        assert_eq!(status.latest_version, None);
        assert!(!status.is_current());
        assert_eq!(missing_tables(&pool).await.unwrap(), LEDGER_TABLES.to_vec());
    }

    #[tokio::test]
    async fn test_run_is_idempotent() {
        let pool = bare_pool().await;

        let first = run_migrations(&pool).await.unwrap();
        assert!(first.is_current());
        assert_eq!(first.latest_version, Some(1));
        assert!(missing_tables(&pool).await.unwrap().is_empty());

        let second = run_migrations(&pool).await.unwrap();
        assert_eq!(first, second);
    }
}

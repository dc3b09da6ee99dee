//! # Ledger Database Handle
//!
//! [`Database`] owns the SQLite pool and the [`LedgerPolicy`], and hands out
//! repositories that share both.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  db.payments().record_payment(sale_id, payment)                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  pool.begin()            one connection, BEGIN                          │
//! │       │                                                                 │
//! │       ├── read sale row                                                 │
//! │       ├── shade_core::ledger::apply_payment (pure)                      │
//! │       ├── UPDATE sales / INSERT payment_history                         │
//! │       └── INSERT change_feed                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  commit()                or drop on `?` → ROLLBACK                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! SQLite admits one writer at a time. A second writer waits up to
//! `busy_timeout` for the lock instead of failing with `SQLITE_BUSY`;
//! readers keep going under WAL.

use serde::Serialize;
use shade_core::LedgerPolicy;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{DbError, DbResult};
use crate::migrations::{self, MigrationStatus};
use crate::repository::catalog::CatalogRepository;
use crate::repository::change_feed::ChangeFeedRepository;
use crate::repository::payment::PaymentRepository;
use crate::repository::returns::ReturnRepository;
use crate::repository::sale::SaleRepository;
use crate::repository::stock_in::StockInRepository;

const IN_MEMORY: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// How to open the ledger file.
///
/// Usually built from [`crate::LedgerConfig::db_config`]; tests use
/// [`DbConfig::in_memory`].
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_path: PathBuf,
    /// A single shop rarely needs more than a handful.
    pub max_connections: u32,
    pub min_connections: u32,
    /// Wait for a free pooled connection.
    pub connect_timeout: Duration,
    /// Wait for SQLite's write lock.
    pub busy_timeout: Duration,
    /// `None` keeps idle connections open.
    pub idle_timeout: Option<Duration>,
    pub run_migrations: bool,
    /// Allowances handed to every repository.
    pub policy: LedgerPolicy,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
            idle_timeout: Some(Duration::from_secs(600)),
            run_migrations: true,
            policy: LedgerPolicy::default(),
        }
    }

    /// A private database that lives as long as the pool.
    ///
    /// Held on one connection that is never recycled: SQLite drops an
    /// in-memory database with its last connection.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: None,
            ..DbConfig::new(IN_MEMORY)
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    pub fn policy(mut self, policy: LedgerPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path == Path::new(IN_MEMORY)
    }

    /// SQLite settings shared by every pooled connection.
    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let options = if self.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(&self.database_path)
                .create_if_missing(true)
        };

        Ok(options
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // Off by default in SQLite; the schema's cascades depend on it
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout))
    }
}

// =============================================================================
// Database
// =============================================================================

/// Ledger database handle. Clones share the pool.
///
/// ```rust,ignore
/// let db = Database::new(DbConfig::new("./ledger.db")).await?;
/// let sale = db.sales().create_sale(new_sale).await?;
/// db.payments().record_payment(&sale.sale.id, payment).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    policy: LedgerPolicy,
}

/// Result of [`Database::health_check`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub migrations: MigrationStatus,
    pub missing_tables: Vec<&'static str>,
    /// Change feed rows no consumer has picked up yet.
    pub pending_changes: i64,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.migrations.is_current() && self.missing_tables.is_empty()
    }
}

impl Database {
    /// Opens the pool and, unless disabled, migrates the schema.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            max_connections = config.max_connections,
            "Opening ledger database"
        );

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(config.idle_timeout);
        if config.is_in_memory() {
            pool_options = pool_options.max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(config.connect_options()?)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        let db = Database {
            pool,
            policy: config.policy,
        };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Applies any schema versions this build knows and the file lacks.
    pub async fn run_migrations(&self) -> DbResult<MigrationStatus> {
        migrations::run_migrations(&self.pool).await
    }

    /// Raw pool access for queries no repository covers.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn policy(&self) -> &LedgerPolicy {
        &self.policy
    }

    /// Products, variants and colors.
    pub fn catalog(&self) -> CatalogRepository {
        CatalogRepository::new(self.pool.clone(), self.policy.clone())
    }

    pub fn sales(&self) -> SaleRepository {
        SaleRepository::new(self.pool.clone(), self.policy.clone())
    }

    pub fn payments(&self) -> PaymentRepository {
        PaymentRepository::new(self.pool.clone(), self.policy.clone())
    }

    pub fn returns(&self) -> ReturnRepository {
        ReturnRepository::new(self.pool.clone(), self.policy.clone())
    }

    pub fn stock_in(&self) -> StockInRepository {
        StockInRepository::new(self.pool.clone(), self.policy.clone())
    }

    pub fn change_feed(&self) -> ChangeFeedRepository {
        ChangeFeedRepository::new(self.pool.clone())
    }

    /// Waits for checked-out connections, then closes the pool.
    pub async fn close(&self) {
        info!("Closing ledger database");
        self.pool.close().await;
    }

    /// Schema version, table presence and change feed backlog.
    ///
    /// ## Errors
    /// Any failure to reach the file surfaces as the query error.
    pub async fn health_check(&self) -> DbResult<HealthReport> {
        let migrations = migrations::migration_status(&self.pool).await?;
        let missing_tables = migrations::missing_tables(&self.pool).await?;
        let pending_changes = if missing_tables.contains(&"change_feed") {
            0
        } else {
            self.change_feed().count_pending().await?
        };

        let report = HealthReport {
            migrations,
            missing_tables,
            pending_changes,
        };
        if !report.is_healthy() {
            warn!(
                pending_migrations = report.migrations.pending(),
                missing = ?report.missing_tables,
                "Ledger database is not on the current schema"
            );
        }
        Ok(report)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

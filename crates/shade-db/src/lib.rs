//! # shade-db: Ledger Storage for the Shade POS
//!
//! This crate stores the paint store's ledger in SQLite through sqlx.
//! Every operation that touches more than one row runs in one transaction.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Shade POS Data Flow                              │
//! │                                                                         │
//! │  Caller (counter app, HTTP layer, seed binary)                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     shade-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ CatalogRepo   │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ SaleRepo      │    │ 001_initial  │  │   │
//! │  │   │ LedgerPolicy  │    │ PaymentRepo   │    │  _schema.sql │  │   │
//! │  │   │               │    │ ReturnRepo    │    │              │  │   │
//! │  │   │               │    │ StockInRepo   │    │              │  │   │
//! │  │   │               │    │ ChangeFeed    │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │           ▲                    │                               │   │
//! │  │           │                    ▼                               │   │
//! │  │   LedgerConfig          shade-core (pure rules)                │   │
//! │  │   (shade.toml + env)                                           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - `shade.toml` and environment overrides
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shade_db::{Database, LedgerConfig};
//!
//! let config = LedgerConfig::load(None)?;
//! let db = Database::new(config.db_config()).await?;
//!
//! let sale = db.sales().create_sale(new_sale).await?;
//! db.payments().record_payment(&sale.sale.id, payment).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{DatabaseSettings, LedgerConfig};
pub use error::{DbError, DbResult};
pub use migrations::MigrationStatus;
pub use pool::{Database, DbConfig, HealthReport};

// Repository re-exports for convenience
pub use repository::catalog::CatalogRepository;
pub use repository::change_feed::ChangeFeedRepository;
pub use repository::payment::PaymentRepository;
pub use repository::returns::ReturnRepository;
pub use repository::sale::SaleRepository;
pub use repository::stock_in::StockInRepository;

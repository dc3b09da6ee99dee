//! # Repository Module
//!
//! Database repository implementations for the ledger.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Caller                                                                │
//! │       │                                                                 │
//! │       │  db.payments().record_payment(&sale_id, payment)               │
//! │       ▼                                                                 │
//! │  PaymentRepository                                                     │
//! │  ├── begin transaction                                                 │
//! │  ├── read current rows          (helpers on &mut SqliteConnection)     │
//! │  ├── ask shade-core for the new values                                 │
//! │  ├── write rows + change feed                                          │
//! │  └── commit                                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Helpers never take the pool: inside a transaction every statement     │
//! │  must run on the transaction's own connection.                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CatalogRepository`](catalog::CatalogRepository) - Products, variants, colors, stock overwrite
//! - [`SaleRepository`](sale::SaleRepository) - Sales, sale items, customer ledger
//! - [`PaymentRepository`](payment::PaymentRepository) - Payment history
//! - [`ReturnRepository`](returns::ReturnRepository) - Returns and quick returns
//! - [`StockInRepository`](stock_in::StockInRepository) - Stock-in history
//! - [`ChangeFeedRepository`](change_feed::ChangeFeedRepository) - Replication feed

pub mod catalog;
pub mod change_feed;
pub mod payment;
pub mod returns;
pub mod sale;
pub mod stock_in;

use uuid::Uuid;

/// Generates a new entity ID.
pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

//! # shade-core: Pure Ledger Logic for Shade POS
//!
//! This crate holds the rules of the paint store ledger as pure functions
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Shade POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            Callers (web UI, HTTP API, admin tools)              │   │
//! │  │    Catalog ──► Bill ──► Payments ──► Returns ──► Stock-in       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               shade-db (Database Layer)                         │   │
//! │  │     repositories, one SQLite transaction per operation          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ asks "what are the new values?"        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ shade-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌────────┐ ┌──────────┐ │   │
//! │  │   │  types  │ │  money  │ │  ledger  │ │ policy │ │validation│ │   │
//! │  │   │  Sale   │ │  Money  │ │ totals   │ │ flags  │ │  rules   │ │   │
//! │  │   │  Color  │ │         │ │ payments │ │ window │ │          │ │   │
//! │  │   └─────────┘ └─────────┘ └──────────┘ └────────┘ └──────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Ledger entities (Product, Variant, Color, Sale, Return, ...)
//! - [`requests`] - Operation inputs
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`ledger`] - Totals, payment deltas, stock checks, return edit window
//! - [`policy`] - Negative stock / overpayment switches
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Design Principles
//!
//! 1. **Derived fields are derived**: subtotals, totals, refunds and payment
//!    status always come from this crate, never from the caller
//! 2. **No I/O**: time is passed in as `now`, storage lives in shade-db
//! 3. **Integer Money**: all monetary values are minor units (i64)
//! 4. **Explicit Errors**: all errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use shade_core::ledger::{price_line, sale_totals};
//! use shade_core::{Money, PaymentStatus};
//!
//! let rate: Money = "100.00".parse().unwrap();
//! let subtotal = price_line(5, rate).unwrap();
//!
//! let (total, status) = sale_totals(&[subtotal], "200".parse().unwrap()).unwrap();
//! assert_eq!(total.to_string(), "500.00");
//! assert_eq!(status, PaymentStatus::Partial);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod money;
pub mod policy;
pub mod requests;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use ledger::EditWindow;
pub use money::Money;
pub use policy::LedgerPolicy;
pub use requests::*;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity on one sale, return or stock-in line.
///
/// Catches typing slips (10000 instead of 10) while leaving room for
/// contractor orders of several hundred tins.
pub const MAX_ITEM_QUANTITY: i64 = 9_999;

/// Largest rate, deposit, balance or payment accepted, in cents
/// (one billion rupees).
pub const MAX_AMOUNT_CENTS: i64 = 100_000_000_000;

/// Largest stock level a color may hold, in either direction.
pub const MAX_STOCK_LEVEL: i64 = 1_000_000_000;

/// Maximum length of catalog and customer text fields.
pub const MAX_TEXT_LENGTH: usize = 200;

/// Hours after creation during which a return may be changed.
pub const DEFAULT_RETURN_EDIT_WINDOW_HOURS: i64 = 12;

/// Payment method recorded when the caller gives none.
pub const DEFAULT_PAYMENT_METHOD: &str = "cash";

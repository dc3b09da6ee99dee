//! # Error Types
//!
//! Domain-specific error types for shade-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  shade-core errors (this file)                                         │
//! │  ├── CoreError        - Ledger rule violations                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  shade-db errors (separate crate)                                      │
//! │  └── DbError          - NotFound + storage failures, wraps CoreError   │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → caller (HTTP layer)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (ids, amounts)
//! 3. Errors are enum variants, never String
//! 4. Nothing here is retried: every failure is deterministic

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Ledger rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Input failed validation.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The request contradicts the current ledger state in a way that
    /// clamping cannot resolve.
    ///
    /// ## When This Occurs
    /// - Editing or deleting a sale item through a sale it does not belong to
    /// - Adding line items to a manual balance
    /// - Returning a sale item that belongs to another sale
    #[error("Inconsistent ledger state: {reason}")]
    InconsistentState { reason: String },

    /// Stock would go below zero while the policy forbids negative stock.
    ///
    /// ## User Workflow
    /// ```text
    /// Sell 5 tins of color C (stock: 3)
    ///      │
    ///      ▼
    /// allow_negative_stock = false
    ///      │
    ///      ▼
    /// InsufficientStock { color_id: C, available: 3, requested: 5 }
    /// ```
    #[error("Insufficient stock for color {color_id}: available {available}, requested {requested}")]
    InsufficientStock {
        color_id: String,
        available: i64,
        requested: i64,
    },

    /// Payment would exceed the outstanding balance while the policy forbids it.
    #[error("Payment of {attempted} exceeds outstanding balance {outstanding} on sale {sale_id}")]
    Overpayment {
        sale_id: String,
        outstanding: Money,
        attempted: Money,
    },

    /// The return is older than the edit window.
    #[error("Return {return_id} can no longer be changed (edit window is {window_hours} hours)")]
    EditWindowExpired { return_id: String, window_hours: i64 },
}

impl CoreError {
    /// Creates an InconsistentState error.
    pub fn inconsistent(reason: impl Into<String>) -> Self {
        CoreError::InconsistentState {
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised by the core itself so the ledger stays consistent no matter
/// which caller sends the request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., malformed amount, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

//! # Validation Module
//!
//! Input validation for ledger requests.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (web UI / HTTP handler)                               │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Ledger core                                                  │
//! │  └── THIS MODULE: same rules for every caller                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use shade_core::validation::{validate_quantity, validate_required_text};
//!
//! let name = validate_required_text("  Sky Blue ", "color_name").unwrap();
//! assert_eq!(name, "Sky Blue");
//!
//! assert!(validate_quantity(0).is_err());
//! ```

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::money::Money;
use crate::{MAX_AMOUNT_CENTS, MAX_ITEM_QUANTITY, MAX_STOCK_LEVEL, MAX_TEXT_LENGTH};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required text field and returns it trimmed.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most MAX_TEXT_LENGTH (200) characters
///
/// ## Example
/// ```rust
/// use shade_core::validation::validate_required_text;
///
/// assert!(validate_required_text("Weathershield", "product_name").is_ok());
/// assert!(validate_required_text("   ", "product_name").is_err());
/// assert!(validate_required_text(&"A".repeat(201), "company").is_err());
/// ```
pub fn validate_required_text(value: &str, field: &str) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > MAX_TEXT_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_TEXT_LENGTH,
        });
    }

    Ok(value.to_string())
}

/// Normalizes optional free text: trimmed, empty becomes `None`.
pub fn normalize_optional_text(value: Option<&str>, field: &str) -> ValidationResult<Option<String>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) if text.chars().count() > 1000 => Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 1000,
        }),
        Some(text) => Ok(Some(text.to_string())),
    }
}

/// Validates a search query.
///
/// ## Rules
/// - Can be empty (returns all/default results)
/// - Maximum 100 characters
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

/// Parses a `YYYY-MM-DD` calendar date.
///
/// ## Example
/// ```rust
/// use shade_core::validation::parse_date;
///
/// assert!(parse_date("2024-03-15", "stock_in_date").is_ok());
/// assert!(parse_date("15/03/2024", "stock_in_date").is_err());
/// ```
pub fn parse_date(value: &str, field: &str) -> ValidationResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "expected a date in YYYY-MM-DD format".to_string(),
        }
    })
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line or stock-in quantity.
///
/// ## Rules
/// - At least 1
/// - Must not exceed MAX_ITEM_QUANTITY
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Bill: Add Line                                                         │
/// │                                                                         │
/// │  User enters quantity: 5 tins                                          │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(5) ← THIS FUNCTION                                  │
/// │       │                                                                 │
/// │       ├── qty < 1? → Error: "quantity must be positive"                │
/// │       │                                                                 │
/// │       ├── qty > max? → Error: "quantity must be between ..."           │
/// │       │                                                                 │
/// │       └── OK → stock decremented, line priced                          │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a unit rate. Zero is allowed (free tins, samples).
///
/// ## Example
/// ```rust
/// use shade_core::{validation::validate_rate, Money};
///
/// assert!(validate_rate(Money::from_cents(125050)).is_ok());
/// assert!(validate_rate(Money::zero()).is_ok());
/// assert!(validate_rate(Money::from_cents(-100)).is_err());
/// ```
pub fn validate_rate(rate: Money) -> ValidationResult<()> {
    if rate.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: "rate".to_string(),
        });
    }

    validate_amount_cap(rate, "rate")
}

/// Validates a payment amount.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_AMOUNT_CENTS
pub fn validate_payment_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "payment amount".to_string(),
        });
    }

    validate_amount_cap(amount, "payment amount")
}

/// Validates a manual balance amount (> 0, capped).
pub fn validate_balance_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "total_amount".to_string(),
        });
    }

    validate_amount_cap(amount, "total_amount")
}

/// Rejects amounts above MAX_AMOUNT_CENTS.
///
/// ```rust
/// use shade_core::{validation::validate_amount_cap, Money, MAX_AMOUNT_CENTS};
///
/// assert!(validate_amount_cap(Money::from_cents(MAX_AMOUNT_CENTS), "amount_paid").is_ok());
/// assert!(validate_amount_cap(Money::from_cents(MAX_AMOUNT_CENTS + 1), "amount_paid").is_err());
/// ```
pub fn validate_amount_cap(amount: Money, field: &str) -> ValidationResult<()> {
    if amount.cents() > MAX_AMOUNT_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT_CENTS,
        });
    }

    Ok(())
}

/// Validates a directly written stock level.
///
/// ## Rules
/// - Negative only when the policy allows it
/// - Magnitude at most MAX_STOCK_LEVEL
pub fn validate_stock_level(level: i64, allow_negative: bool) -> ValidationResult<()> {
    if level < 0 && !allow_negative {
        return Err(ValidationError::MustNotBeNegative {
            field: "stock_quantity".to_string(),
        });
    }
    if !(-MAX_STOCK_LEVEL..=MAX_STOCK_LEVEL).contains(&level) {
        return Err(ValidationError::OutOfRange {
            field: "stock_quantity".to_string(),
            min: if allow_negative { -MAX_STOCK_LEVEL } else { 0 },
            max: MAX_STOCK_LEVEL,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

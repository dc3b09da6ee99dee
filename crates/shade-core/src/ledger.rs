//! # Ledger Rules
//!
//! Pure functions that keep stock and money fields consistent.
//! The database layer reads the current rows, asks these functions what the
//! new values are, and writes the answer back inside one transaction.
//!
//! ## Where Each Rule Applies
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Operation            Rule(s)                                           │
//! │  ───────────────────  ──────────────────────────────────────────────   │
//! │  create sale          price_line → sale_totals → check_stock            │
//! │  add / edit item      price_line → item_stock_delta → sale_totals       │
//! │  delete item          sale_totals (zero total → paid)                   │
//! │  record payment       apply_payment                                     │
//! │  edit payment         edit_payment                                      │
//! │  delete payment       remove_payment                                    │
//! │  create return        price_line → check_return_quantity                │
//! │  edit / delete return can_edit_return                                   │
//! │  stock-in             stock_in_levels                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example: Counter Sale
//! ```rust
//! use shade_core::ledger::{apply_payment, price_line, sale_totals};
//! use shade_core::{LedgerPolicy, Money, PaymentStatus};
//!
//! let rate = Money::from_major(100);
//! let subtotal = price_line(5, rate).unwrap();
//! let (total, status) = sale_totals(&[subtotal], Money::zero()).unwrap();
//! assert_eq!(total, Money::from_major(500));
//! assert_eq!(status, PaymentStatus::Unpaid);
//!
//! let applied = apply_payment("s-1", total, Money::zero(), Money::from_major(200), &LedgerPolicy::default()).unwrap();
//! assert_eq!(applied.previous_balance, Money::from_major(500));
//! assert_eq!(applied.new_balance, Money::from_major(300));
//! assert_eq!(applied.status, PaymentStatus::Partial);
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::policy::LedgerPolicy;
use crate::types::PaymentStatus;
use crate::validation::{validate_payment_amount, validate_quantity, validate_rate};

// =============================================================================
// Pricing
// =============================================================================

/// Computes `quantity × rate` for one line.
///
/// Quantity and rate are validated here so no caller can persist a line the
/// ledger did not price itself.
pub fn price_line(quantity: i64, rate: Money) -> CoreResult<Money> {
    validate_quantity(quantity)?;
    validate_rate(rate)?;

    rate.checked_multiply_quantity(quantity)
        .ok_or_else(|| out_of_range("subtotal"))
}

/// Sums line subtotals, failing on overflow.
pub fn sum_lines(subtotals: &[Money]) -> CoreResult<Money> {
    subtotals
        .iter()
        .try_fold(Money::zero(), |acc, s| acc.checked_add(*s))
        .ok_or_else(|| out_of_range("total_amount"))
}

/// Arithmetic left the i64 range.
fn out_of_range(field: &str) -> CoreError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min: i64::MIN,
        max: i64::MAX,
    }
    .into()
}

/// Total and status of a sale from its remaining lines.
///
/// An empty sale has a zero total and is therefore `Paid`.
pub fn sale_totals(subtotals: &[Money], amount_paid: Money) -> CoreResult<(Money, PaymentStatus)> {
    let total = sum_lines(subtotals)?;
    Ok((total, PaymentStatus::derive(total, amount_paid)))
}

// =============================================================================
// Stock
// =============================================================================

/// Stock change when a line's quantity goes from `old_quantity` to
/// `new_quantity`. Positive means units go back on the shelf.
///
/// ```rust
/// use shade_core::ledger::item_stock_delta;
///
/// assert_eq!(item_stock_delta(5, 3), 2);   // sold fewer, restock 2
/// assert_eq!(item_stock_delta(3, 5), -2);  // sold more, take 2
/// ```
#[inline]
pub fn item_stock_delta(old_quantity: i64, new_quantity: i64) -> i64 {
    old_quantity - new_quantity
}

/// Result of taking units off the shelf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockDraw {
    pub new_stock: i64,
    /// Stock went (or stayed) below zero under a permissive policy.
    pub oversold: bool,
}

/// Checks that `requested` units can leave a color holding `available`.
pub fn check_stock(
    color_id: &str,
    available: i64,
    requested: i64,
    policy: &LedgerPolicy,
) -> CoreResult<StockDraw> {
    let new_stock = available
        .checked_sub(requested)
        .ok_or_else(|| out_of_range("stock_quantity"))?;
    if new_stock < 0 && requested > 0 && !policy.allow_negative_stock {
        return Err(CoreError::InsufficientStock {
            color_id: color_id.to_string(),
            available,
            requested,
        });
    }
    Ok(StockDraw {
        new_stock,
        oversold: new_stock < 0 && requested > 0,
    })
}

/// `(previous_stock, new_stock)` for a stock-in of `quantity` units.
pub fn stock_in_levels(current_stock: i64, quantity: i64) -> CoreResult<(i64, i64)> {
    validate_quantity(quantity)?;
    let new_stock = current_stock
        .checked_add(quantity)
        .ok_or_else(|| out_of_range("stock_quantity"))?;
    Ok((current_stock, new_stock))
}

// =============================================================================
// Payments
// =============================================================================

/// Effect of recording one payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentApplication {
    pub previous_balance: Money,
    pub new_amount_paid: Money,
    pub new_balance: Money,
    pub status: PaymentStatus,
    /// The payment took the balance below zero.
    pub overpaid: bool,
}

/// Applies a new payment to a sale.
///
/// ## Rules
/// - `amount > 0`
/// - `previous_balance = total - paid`
/// - `new_amount_paid = paid + amount`, `new_balance = total - new_amount_paid`
/// - `amount > previous_balance` fails only under a strict policy
pub fn apply_payment(
    sale_id: &str,
    total: Money,
    paid: Money,
    amount: Money,
    policy: &LedgerPolicy,
) -> CoreResult<PaymentApplication> {
    validate_payment_amount(amount)?;

    let previous_balance = total
        .checked_sub(paid)
        .ok_or_else(|| out_of_range("balance"))?;
    let overpaid = amount > previous_balance;
    if overpaid && !policy.allow_overpayment {
        return Err(CoreError::Overpayment {
            sale_id: sale_id.to_string(),
            outstanding: previous_balance,
            attempted: amount,
        });
    }

    let new_amount_paid = paid
        .checked_add(amount)
        .ok_or_else(|| out_of_range("amount_paid"))?;
    let new_balance = total
        .checked_sub(new_amount_paid)
        .ok_or_else(|| out_of_range("balance"))?;
    Ok(PaymentApplication {
        previous_balance,
        new_amount_paid,
        new_balance,
        status: PaymentStatus::derive(total, new_amount_paid),
        overpaid,
    })
}

/// Applies a signed delta to `amount_paid`, flooring the result at zero.
/// The sum saturates rather than wrapping.
///
/// ```rust
/// use shade_core::ledger::adjust_amount_paid;
/// use shade_core::Money;
///
/// assert_eq!(adjust_amount_paid(Money::from_cents(500), Money::from_cents(-200)), Money::from_cents(300));
/// assert_eq!(adjust_amount_paid(Money::from_cents(100), Money::from_cents(-200)), Money::zero());
/// ```
#[inline]
pub fn adjust_amount_paid(amount_paid: Money, delta: Money) -> Money {
    amount_paid.saturating_add(delta).floor_at_zero()
}

/// Effect of editing a recorded payment's amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentEdit {
    pub amount_paid: Money,
    pub status: PaymentStatus,
    /// New value for the edited row's `new_balance`.
    pub row_new_balance: Money,
}

/// Re-applies a payment whose amount changed from `old_amount` to
/// `new_amount`. Only the delta touches the sale.
pub fn edit_payment(
    total: Money,
    amount_paid: Money,
    old_amount: Money,
    new_amount: Money,
    row_previous_balance: Money,
) -> CoreResult<PaymentEdit> {
    validate_payment_amount(new_amount)?;

    let delta = new_amount
        .checked_sub(old_amount)
        .ok_or_else(|| out_of_range("payment amount"))?;
    let amount_paid = adjust_amount_paid(amount_paid, delta);
    let row_new_balance = row_previous_balance
        .checked_sub(new_amount)
        .ok_or_else(|| out_of_range("balance"))?;
    Ok(PaymentEdit {
        amount_paid,
        status: PaymentStatus::derive(total, amount_paid),
        row_new_balance,
    })
}

/// `(amount_paid, status)` after a payment of `amount` is deleted.
pub fn remove_payment(total: Money, amount_paid: Money, amount: Money) -> (Money, PaymentStatus) {
    let amount_paid = adjust_amount_paid(amount_paid, -amount);
    (amount_paid, PaymentStatus::derive(total, amount_paid))
}

// =============================================================================
// Returns
// =============================================================================

/// Whether a return can still be changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct EditWindow {
    pub allowed: bool,
    /// Whole hours left, rounded up. Zero once the window has closed.
    pub hours_remaining: i64,
}

/// Edit window check for a return created at `created_at`.
///
/// ```rust
/// use chrono::{Duration, Utc};
/// use shade_core::ledger::can_edit_return;
///
/// let created = Utc::now();
/// let window = can_edit_return(created, created + Duration::minutes(90), 12);
/// assert!(window.allowed);
/// assert_eq!(window.hours_remaining, 11);
///
/// let window = can_edit_return(created, created + Duration::hours(13), 12);
/// assert!(!window.allowed);
/// ```
pub fn can_edit_return(created_at: DateTime<Utc>, now: DateTime<Utc>, window_hours: i64) -> EditWindow {
    let deadline = created_at + Duration::hours(window_hours);
    let remaining = deadline - now;

    if remaining <= Duration::zero() {
        return EditWindow {
            allowed: false,
            hours_remaining: 0,
        };
    }

    let seconds = remaining.num_seconds().max(1);
    EditWindow {
        allowed: true,
        hours_remaining: (seconds + 3599) / 3600,
    }
}

/// Fails with `EditWindowExpired` outside the window.
pub fn ensure_return_editable(
    return_id: &str,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
    window_hours: i64,
) -> CoreResult<EditWindow> {
    let window = can_edit_return(created_at, now, window_hours);
    if !window.allowed {
        return Err(CoreError::EditWindowExpired {
            return_id: return_id.to_string(),
            window_hours,
        });
    }
    Ok(window)
}

/// Checks a return line against what is left to return on its sale item.
pub fn check_return_quantity(sold: i64, already_returned: i64, requested: i64) -> CoreResult<()> {
    let returnable = (sold - already_returned).max(0);
    if requested > returnable {
        return Err(ValidationError::OutOfRange {
            field: "return quantity".to_string(),
            min: 1,
            max: returnable,
        }
        .into());
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn m(cents: i64) -> Money {
        Money::from_cents(cents)
    }

    #[test]
    fn test_price_line() {
        assert_eq!(price_line(5, m(10000)).unwrap(), m(50000));
        assert_eq!(price_line(3, Money::zero()).unwrap(), Money::zero());
        assert!(price_line(0, m(100)).is_err());
        assert!(price_line(1, m(-1)).is_err());
    }

    #[test]
    fn test_empty_sale_is_paid() {
        let (total, status) = sale_totals(&[], m(50000)).unwrap();
        assert_eq!(total, Money::zero());
        assert_eq!(status, PaymentStatus::Paid);
    }

    #[test]
    fn test_sale_totals_sum_lines() {
        let (total, status) = sale_totals(&[m(50000), m(12050)], m(100)).unwrap();
        assert_eq!(total, m(62050));
        assert_eq!(status, PaymentStatus::Partial);
    }

    #[test]
    fn test_sum_overflow_is_rejected() {
        assert!(sum_lines(&[m(i64::MAX), m(1)]).is_err());
    }

    #[test]
    fn test_check_stock_policy() {
        let lenient = LedgerPolicy::default();
        let strict = LedgerPolicy::strict();

        let draw = check_stock("c", 3, 5, &lenient).unwrap();
        assert_eq!(draw.new_stock, -2);
        assert!(draw.oversold);

        assert!(matches!(
            check_stock("c", 3, 5, &strict),
            Err(CoreError::InsufficientStock {
                available: 3,
                requested: 5,
                ..
            })
        ));

        let draw = check_stock("c", 5, 5, &strict).unwrap();
        assert_eq!(draw.new_stock, 0);
        assert!(!draw.oversold);

        // Restocking an already negative color is always fine.
        assert!(check_stock("c", -4, -2, &strict).is_ok());
    }

    #[test]
    fn test_stock_arithmetic_never_wraps() {
        let lenient = LedgerPolicy::default();
        assert!(matches!(
            check_stock("c", i64::MAX, -1, &lenient),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
        assert!(matches!(
            check_stock("c", i64::MIN, 1, &lenient),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
        assert!(matches!(
            stock_in_levels(i64::MAX, 1),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
    }

    #[test]
    fn test_stock_in_levels() {
        assert_eq!(stock_in_levels(10, 5).unwrap(), (10, 15));
        assert_eq!(stock_in_levels(-3, 5).unwrap(), (-3, 2));
        assert!(stock_in_levels(10, 0).is_err());
    }

    #[test]
    fn test_worked_payment_sequence() {
        let policy = LedgerPolicy::default();
        let total = m(50000);

        let first = apply_payment("s", total, Money::zero(), m(20000), &policy).unwrap();
        assert_eq!(first.previous_balance, m(50000));
        assert_eq!(first.new_balance, m(30000));
        assert_eq!(first.status, PaymentStatus::Partial);

        let second = apply_payment("s", total, first.new_amount_paid, m(30000), &policy).unwrap();
        assert_eq!(second.new_amount_paid, total);
        assert_eq!(second.new_balance, Money::zero());
        assert_eq!(second.status, PaymentStatus::Paid);
        assert!(!second.overpaid);
    }

    #[test]
    fn test_overpayment_policy() {
        let lenient = apply_payment("s", m(100), Money::zero(), m(150), &LedgerPolicy::default()).unwrap();
        assert!(lenient.overpaid);
        assert_eq!(lenient.new_balance, m(-50));
        assert_eq!(lenient.status, PaymentStatus::Paid);

        assert!(matches!(
            apply_payment("s", m(100), Money::zero(), m(150), &LedgerPolicy::strict()),
            Err(CoreError::Overpayment { .. })
        ));
    }

    #[test]
    fn test_payment_must_be_positive() {
        let err = apply_payment("s", m(100), Money::zero(), Money::zero(), &LedgerPolicy::default())
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::MustBePositive { .. })));
    }

    #[test]
    fn test_payment_amounts_never_wrap() {
        let policy = LedgerPolicy::default();

        let err = apply_payment("s", m(100), m(100), m(i64::MAX), &policy).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::OutOfRange { .. })));

        // A stored amount_paid near the limit still cannot wrap.
        let err = apply_payment("s", m(100), m(i64::MAX - 10), m(100), &policy).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::OutOfRange { .. })));

        assert_eq!(adjust_amount_paid(m(i64::MAX - 1), m(10)), m(i64::MAX));
    }

    #[test]
    fn test_edit_payment_applies_delta() {
        // total 500, paid 500 (200 deposit + 300 payment), payment edited 300 → 100
        let edit = edit_payment(m(50000), m(50000), m(30000), m(10000), m(30000)).unwrap();
        assert_eq!(edit.amount_paid, m(30000));
        assert_eq!(edit.status, PaymentStatus::Partial);
        assert_eq!(edit.row_new_balance, m(20000));
    }

    #[test]
    fn test_edit_payment_floors_at_zero() {
        // Sale paid field was corrected down by hand; shrinking the payment cannot go negative.
        let edit = edit_payment(m(50000), m(5000), m(30000), m(1000), m(50000)).unwrap();
        assert_eq!(edit.amount_paid, Money::zero());
        assert_eq!(edit.status, PaymentStatus::Unpaid);
    }

    #[test]
    fn test_remove_payment() {
        assert_eq!(
            remove_payment(m(50000), m(50000), m(30000)),
            (m(20000), PaymentStatus::Partial)
        );
        assert_eq!(
            remove_payment(m(50000), m(100), m(30000)),
            (Money::zero(), PaymentStatus::Unpaid)
        );
    }

    #[test]
    fn test_edit_window() {
        let created = Utc::now();

        let fresh = can_edit_return(created, created, 12);
        assert!(fresh.allowed);
        assert_eq!(fresh.hours_remaining, 12);

        let late = can_edit_return(created, created + Duration::minutes(11 * 60 + 59), 12);
        assert!(late.allowed);
        assert_eq!(late.hours_remaining, 1);

        let almost = created + Duration::hours(12) - Duration::seconds(20);
        let last_seconds = can_edit_return(created, almost, 12);
        assert!(last_seconds.allowed);
        assert_eq!(last_seconds.hours_remaining, 1);

        let closed = can_edit_return(created, created + Duration::hours(12), 12);
        assert!(!closed.allowed);
        assert_eq!(closed.hours_remaining, 0);

        assert!(matches!(
            ensure_return_editable("r", created, created + Duration::days(1), 12),
            Err(CoreError::EditWindowExpired { window_hours: 12, .. })
        ));
    }

    #[test]
    fn test_return_quantity_limit() {
        assert!(check_return_quantity(5, 0, 5).is_ok());
        assert!(check_return_quantity(5, 3, 2).is_ok());
        assert!(check_return_quantity(5, 3, 3).is_err());
        assert!(check_return_quantity(5, 7, 1).is_err());
    }
}

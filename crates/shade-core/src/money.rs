//! # Money Module
//!
//! Provides the `Money` type for every monetary field in the ledger.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A customer ledger that drifts by a paisa per payment never            │
//! │  reconciles: "paid" bills show 0.01 outstanding forever.                │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units                                      │
//! │    "1250.50" ──parse──► 125050 ──format──► "1250.50"                   │
//! │    Exact in both directions, exact under + and −                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Boundary Format
//! Money crosses every serde boundary as an exact decimal string with two
//! fractional digits (`"500.00"`, `"-12.30"`). Inputs may omit trailing
//! fractional digits (`"500"`, `"500.5"`) but never carry more than two.
//!
//! ## Usage
//! ```rust
//! use shade_core::money::Money;
//!
//! let rate: Money = "1250.50".parse().unwrap();
//! assert_eq!(rate.cents(), 125050);
//!
//! let subtotal = rate.checked_multiply_quantity(4).unwrap();
//! assert_eq!(subtotal.to_string(), "5002.00");
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

use crate::error::ValidationError;

/// Minor units per major unit (two decimal places).
const MINOR_PER_MAJOR: i64 = 100;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (paisa / cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: balances may go negative on overpayment
/// - **Single field tuple struct**: zero-cost over i64, stored as SQLite INTEGER
/// - **Serde as string**: callers never see a float
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ## Example
    /// ```rust
    /// use shade_core::money::Money;
    ///
    /// let rate = Money::from_cents(1099);
    /// assert_eq!(rate.to_string(), "10.99");
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from whole units.
    #[inline]
    pub const fn from_major(major: i64) -> Self {
        Money(major * MINOR_PER_MAJOR)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-unit portion (truncated toward zero).
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / MINOR_PER_MAJOR
    }

    /// Returns the fractional portion as 0-99 (absolute value).
    #[inline]
    pub const fn minor_part(&self) -> i64 {
        (self.0 % MINOR_PER_MAJOR).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Floors the value at zero.
    ///
    /// Used when a payment edit or deletion would push `amount_paid` below 0.
    #[inline]
    pub fn floor_at_zero(self) -> Self {
        Money(self.0.max(0))
    }

    /// Multiplies a unit rate by a quantity, or `None` on overflow.
    ///
    /// ## Example
    /// ```rust
    /// use shade_core::money::Money;
    ///
    /// let rate = Money::from_cents(299);
    /// assert_eq!(rate.checked_multiply_quantity(3), Some(Money::from_cents(897)));
    /// assert_eq!(Money::from_cents(i64::MAX).checked_multiply_quantity(2), None);
    /// ```
    #[inline]
    pub fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        self.0.checked_mul(qty).map(Money)
    }

    /// Checked addition.
    #[inline]
    pub fn checked_add(&self, other: Money) -> Option<Self> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Checked subtraction.
    #[inline]
    pub fn checked_sub(&self, other: Money) -> Option<Self> {
        self.0.checked_sub(other.0).map(Money)
    }

    /// Addition clamped to the i64 range.
    #[inline]
    pub fn saturating_add(self, other: Money) -> Self {
        Money(self.0.saturating_add(other.0))
    }

    /// Parses an exact decimal string, reporting problems against `field`.
    pub fn parse_field(input: &str, field: &str) -> Result<Self, ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Required {
                field: field.to_string(),
            });
        }

        let (negative, unsigned) = match trimmed.as_bytes()[0] {
            b'-' => (true, &trimmed[1..]),
            b'+' => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };

        let (whole, frac) = match unsigned.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (unsigned, ""),
        };

        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("expected a decimal number such as 1250.50"));
        }
        if !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("expected a decimal number such as 1250.50"));
        }
        if frac.len() > 2 {
            return Err(invalid("at most two decimal places are allowed"));
        }

        let overflow = || ValidationError::OutOfRange {
            field: field.to_string(),
            min: i64::MIN / MINOR_PER_MAJOR,
            max: i64::MAX / MINOR_PER_MAJOR,
        };

        let whole: i64 = whole.parse().map_err(|_| overflow())?;
        let frac: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| overflow())? * 10,
            _ => frac.parse().map_err(|_| overflow())?,
        };

        let magnitude = whole
            .checked_mul(MINOR_PER_MAJOR)
            .and_then(|w| w.checked_add(frac))
            .ok_or_else(overflow)?;

        Ok(Money(if negative { -magnitude } else { magnitude }))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Exact decimal rendering, two fractional digits, no currency symbol.
///
/// This is the wire format; currency symbols belong to the presentation layer.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor_part())
    }
}

impl FromStr for Money {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::parse_field(s, "amount")
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

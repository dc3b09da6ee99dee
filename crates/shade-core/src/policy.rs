//! # Ledger Policy
//!
//! Switches for the accepted gaps of the store's day-to-day workflow.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Flag                       Default   When false                        │
//! │  ─────────────────────────  ───────   ───────────────────────────────  │
//! │  allow_negative_stock       true      InsufficientStock on oversell     │
//! │  allow_overpayment          true      Overpayment above balance         │
//! │  return_edit_window_hours   12        (always enforced)                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Counter staff routinely sell paint that arrived but was never stocked in,
//! so both allowances default to on.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::DEFAULT_RETURN_EDIT_WINDOW_HOURS;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerPolicy {
    pub allow_negative_stock: bool,
    pub allow_overpayment: bool,
    pub return_edit_window_hours: i64,
}

impl Default for LedgerPolicy {
    fn default() -> Self {
        Self {
            allow_negative_stock: true,
            allow_overpayment: true,
            return_edit_window_hours: DEFAULT_RETURN_EDIT_WINDOW_HOURS,
        }
    }
}

impl LedgerPolicy {
    /// Policy that rejects oversells and overpayments.
    pub fn strict() -> Self {
        Self {
            allow_negative_stock: false,
            allow_overpayment: false,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(0..=24 * 365).contains(&self.return_edit_window_hours) {
            return Err(ValidationError::OutOfRange {
                field: "return_edit_window_hours".to_string(),
                min: 0,
                max: 24 * 365,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_allow_gaps() {
        let policy = LedgerPolicy::default();
        assert!(policy.allow_negative_stock);
        assert!(policy.allow_overpayment);
        assert_eq!(policy.return_edit_window_hours, 12);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let policy: LedgerPolicy = serde_json::from_str(r#"{"allow_overpayment":false}"#).unwrap();
        assert!(policy.allow_negative_stock);
        assert!(!policy.allow_overpayment);
    }

    #[test]
    fn test_window_bounds() {
        let mut policy = LedgerPolicy::strict();
        policy.return_edit_window_hours = -1;
        assert!(policy.validate().is_err());
    }
}

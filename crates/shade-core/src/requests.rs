//! # Request Types
//!
//! Inputs accepted by ledger operations.
//!
//! Requests carry only what a caller is allowed to decide. Derived fields
//! (`subtotal`, `total_amount`, `total_refund`, `payment_status`) never
//! appear here: the ledger computes them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{PaymentStatus, ReturnStatus, ReturnType};
use crate::validation::{validate_amount_cap, validate_quantity, validate_rate, ValidationResult};

fn default_true() -> bool {
    true
}

// =============================================================================
// Catalog
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewProduct {
    pub company: String,
    pub product_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductUpdate {
    pub company: Option<String>,
    pub product_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewVariant {
    pub product_id: String,
    pub packing_size: String,
    #[ts(type = "string")]
    pub rate: Money,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct VariantUpdate {
    pub packing_size: Option<String>,
    #[ts(type = "string | null")]
    pub rate: Option<Money>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewColor {
    pub variant_id: String,
    pub color_name: String,
    pub color_code: String,
    /// Opening stock. Later increases should go through stock-in.
    #[serde(default)]
    pub stock_quantity: i64,
    #[ts(type = "string | null")]
    #[serde(default)]
    pub rate_override: Option<Money>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ColorUpdate {
    pub color_name: Option<String>,
    pub color_code: Option<String>,
    #[ts(type = "string | null")]
    pub rate_override: Option<Money>,
    /// Drops the override so the color falls back to the variant rate.
    #[serde(default)]
    pub clear_rate_override: bool,
}

// =============================================================================
// Sales
// =============================================================================

/// One line of a new sale. The subtotal is computed, never supplied.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewSaleItem {
    pub color_id: String,
    pub quantity: i64,
    #[ts(type = "string")]
    pub rate: Money,
}

impl NewSaleItem {
    pub fn validate(&self) -> ValidationResult<()> {
        if self.color_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "color_id".to_string(),
            });
        }
        validate_quantity(self.quantity)?;
        validate_rate(self.rate)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewSale {
    pub customer_name: String,
    pub customer_phone: String,
    /// Deposit taken at the counter. Not recorded as a payment row.
    #[ts(type = "string")]
    #[serde(default)]
    pub amount_paid: Money,
    #[ts(as = "Option<String>")]
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
    pub items: Vec<NewSaleItem>,
}

impl NewSale {
    /// Checks everything that does not need the database.
    pub fn validate(&self) -> ValidationResult<()> {
        if self.items.is_empty() {
            return Err(ValidationError::Required {
                field: "items".to_string(),
            });
        }
        if self.amount_paid.is_negative() {
            return Err(ValidationError::MustNotBeNegative {
                field: "amount_paid".to_string(),
            });
        }
        validate_amount_cap(self.amount_paid, "amount_paid")?;
        self.items.iter().try_for_each(NewSaleItem::validate)
    }
}

/// A balance entered by hand ("cash loan"), with no items.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewManualBalance {
    pub customer_name: String,
    pub customer_phone: String,
    #[ts(type = "string")]
    pub total_amount: Money,
    #[ts(as = "Option<String>")]
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleItemUpdate {
    pub quantity: i64,
    #[ts(type = "string")]
    pub rate: Money,
}

/// Metadata update. `due_date` replaces the stored value (`None` clears it);
/// `notes` is only written when present.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DueDateUpdate {
    #[ts(as = "Option<String>")]
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleFilter {
    pub customer_phone: Option<String>,
    pub payment_status: Option<PaymentStatus>,
    /// Only sales whose total exceeds what was paid.
    #[serde(default)]
    pub outstanding_only: bool,
    pub limit: Option<i64>,
}

// =============================================================================
// Payments
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewPayment {
    #[ts(type = "string")]
    pub amount: Money,
    /// Defaults to `"cash"`.
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PaymentUpdate {
    #[ts(type = "string | null")]
    pub amount: Option<Money>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
}

// =============================================================================
// Returns
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewReturnItem {
    pub color_id: String,
    #[serde(default)]
    pub sale_item_id: Option<String>,
    pub quantity: i64,
    #[ts(type = "string")]
    pub rate: Money,
    /// Put the returned units back on the shelf.
    #[serde(default = "default_true")]
    pub stock_restored: bool,
}

impl NewReturnItem {
    pub fn validate(&self) -> ValidationResult<()> {
        if self.color_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "color_id".to_string(),
            });
        }
        validate_quantity(self.quantity)?;
        validate_rate(self.rate)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewReturn {
    #[serde(default)]
    pub sale_id: Option<String>,
    pub customer_name: String,
    pub customer_phone: String,
    pub return_type: ReturnType,
    #[serde(default)]
    pub reason: Option<String>,
    pub items: Vec<NewReturnItem>,
}

impl NewReturn {
    pub fn validate(&self) -> ValidationResult<()> {
        if self.items.is_empty() {
            return Err(ValidationError::Required {
                field: "items".to_string(),
            });
        }
        self.items.iter().try_for_each(NewReturnItem::validate)
    }
}

/// A single-line return without a traceable bill.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct QuickReturn {
    pub customer_name: String,
    pub customer_phone: String,
    pub color_id: String,
    pub quantity: i64,
    #[ts(type = "string")]
    pub rate: Money,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default = "default_true")]
    pub restore_stock: bool,
}

impl From<QuickReturn> for NewReturn {
    fn from(quick: QuickReturn) -> Self {
        NewReturn {
            sale_id: None,
            customer_name: quick.customer_name,
            customer_phone: quick.customer_phone,
            return_type: ReturnType::Item,
            reason: quick.reason,
            items: vec![NewReturnItem {
                color_id: quick.color_id,
                sale_item_id: None,
                quantity: quick.quantity,
                rate: quick.rate,
                stock_restored: quick.restore_stock,
            }],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ReturnUpdate {
    pub reason: Option<String>,
    pub status: Option<ReturnStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ReturnFilter {
    pub sale_id: Option<String>,
    pub customer_phone: Option<String>,
    pub limit: Option<i64>,
}

// =============================================================================
// Stock-in
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewStockIn {
    pub color_id: String,
    pub quantity: i64,
    #[serde(default)]
    pub notes: Option<String>,
    /// `YYYY-MM-DD`; today when absent.
    #[serde(default)]
    pub stock_in_date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StockInUpdate {
    pub quantity: Option<i64>,
    pub notes: Option<String>,
    pub stock_in_date: Option<String>,
}

/// History search. Every field narrows the result; all are optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StockInFilter {
    #[ts(as = "Option<String>")]
    pub from: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub to: Option<NaiveDate>,
    pub company: Option<String>,
    pub product_name: Option<String>,
    /// Matches color code or color name.
    pub color_query: Option<String>,
    pub limit: Option<i64>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: i64, rate: i64) -> NewSaleItem {
        NewSaleItem {
            color_id: "c-1".to_string(),
            quantity,
            rate: Money::from_cents(rate),
        }
    }

    #[test]
    fn test_sale_needs_items() {
        let sale = NewSale {
            customer_name: "Ahmed".to_string(),
            customer_phone: "0300".to_string(),
            amount_paid: Money::zero(),
            due_date: None,
            notes: None,
            items: vec![],
        };
        assert!(matches!(
            sale.validate(),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_sale_item_rules() {
        assert!(item(1, 0).validate().is_ok());
        assert!(item(0, 100).validate().is_err());
        assert!(item(2, -1).validate().is_err());
    }

    #[test]
    fn test_quick_return_becomes_item_return() {
        let quick = QuickReturn {
            customer_name: "Bilal".to_string(),
            customer_phone: "0321".to_string(),
            color_id: "c-9".to_string(),
            quantity: 2,
            rate: Money::from_cents(1500),
            reason: None,
            restore_stock: true,
        };
        let ret: NewReturn = quick.into();
        assert_eq!(ret.return_type, ReturnType::Item);
        assert!(ret.sale_id.is_none());
        assert_eq!(ret.items.len(), 1);
        assert!(ret.items[0].stock_restored);
    }

    #[test]
    fn test_request_defaults_from_json() {
        let payment: NewPayment = serde_json::from_str(r#"{"amount":"200.00"}"#).unwrap();
        assert_eq!(payment.amount, Money::from_cents(20000));
        assert!(payment.payment_method.is_none());

        let line: NewReturnItem =
            serde_json::from_str(r#"{"colorId":"c","quantity":1,"rate":"10"}"#).unwrap();
        assert!(line.stock_restored);
    }
}

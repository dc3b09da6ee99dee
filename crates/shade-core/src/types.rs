//! # Domain Types
//!
//! Ledger entities shared by the store and its callers.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Catalog                          Transactions                          │
//! │  ───────                          ────────────                          │
//! │  Product                          Sale ──────┬──► SaleItem ──► Color    │
//! │    └──► Variant (rate)                       └──► PaymentHistory        │
//! │           └──► Color (stock)                                            │
//! │                  ▲                Return ───────► ReturnItem ──► Color  │
//! │                  │                  └ (optional) Sale                   │
//! │                  └──────────────── StockInHistory                       │
//! │                                                                         │
//! │  Color.stock_quantity is the single mutable source of truth for        │
//! │  on-hand inventory.                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Serialization
//! - Field names are camelCase on the wire (`totalAmount`, `stockQuantity`)
//! - [`Money`] fields serialize as exact decimal strings
//! - Timestamps serialize as ISO-8601, calendar dates as `YYYY-MM-DD`

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Catalog
// =============================================================================

/// A paint product line from one company (e.g., "Weathershield" by a brand).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub company: String,
    pub product_name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A packing size of a product with its default unit rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Variant {
    pub id: String,
    pub product_id: String,
    /// e.g. "1L", "4L", "Gallon", "Drum".
    pub packing_size: String,
    /// Default unit price for every color of this variant.
    #[ts(type = "string")]
    pub rate: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A color (shade) of a variant. Holds the on-hand stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Color {
    pub id: String,
    pub variant_id: String,
    pub color_name: String,
    pub color_code: String,
    /// On-hand units. May be negative when the policy allows overselling.
    pub stock_quantity: i64,
    /// Per-color price that wins over the variant rate.
    #[ts(type = "string | null")]
    pub rate_override: Option<Money>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Color {
    /// Unit price for this color: its override, else the variant's rate.
    pub fn effective_rate(&self, variant: &Variant) -> Money {
        self.rate_override.unwrap_or(variant.rate)
    }
}

// =============================================================================
// Payment Status
// =============================================================================

/// Payment state of a sale, always derived from `(total_amount, amount_paid)`.
///
/// ## Transitions
/// ```text
///   unpaid ──pay──► partial ──pay──► paid
///     ▲               │  ▲             │
///     └──edit/delete──┘  └─edit/delete─┘   (item deletion can also move it)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PaymentStatus {
    Unpaid,
    Partial,
    Paid,
}

impl PaymentStatus {
    /// Derives the status from the sale total and the amount paid.
    ///
    /// ## Rules
    /// - `paid >= total` → `Paid` (a zero total is therefore `Paid`)
    /// - `0 < paid < total` → `Partial`
    /// - otherwise → `Unpaid`
    ///
    /// ## Example
    /// ```rust
    /// use shade_core::{Money, PaymentStatus};
    ///
    /// let total = Money::from_cents(50000);
    /// assert_eq!(PaymentStatus::derive(total, Money::zero()), PaymentStatus::Unpaid);
    /// assert_eq!(PaymentStatus::derive(total, Money::from_cents(20000)), PaymentStatus::Partial);
    /// assert_eq!(PaymentStatus::derive(total, total), PaymentStatus::Paid);
    /// assert_eq!(PaymentStatus::derive(Money::zero(), Money::zero()), PaymentStatus::Paid);
    /// ```
    pub fn derive(total: Money, paid: Money) -> Self {
        if paid >= total {
            PaymentStatus::Paid
        } else if paid.is_positive() {
            PaymentStatus::Partial
        } else {
            PaymentStatus::Unpaid
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Paid => "paid",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Sale
// =============================================================================

/// One customer bill, or one manually entered balance with no items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub customer_name: String,
    pub customer_phone: String,
    /// Sum of item subtotals, or the entered amount for a manual balance.
    #[ts(type = "string")]
    pub total_amount: Money,
    #[ts(type = "string")]
    pub amount_paid: Money,
    pub payment_status: PaymentStatus,
    #[ts(as = "Option<String>")]
    pub due_date: Option<NaiveDate>,
    pub is_manual_balance: bool,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Sale {
    /// Outstanding amount. Negative when the customer overpaid.
    #[inline]
    pub fn balance(&self) -> Money {
        self.total_amount - self.amount_paid
    }
}

/// A line of a sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub color_id: String,
    pub quantity: i64,
    #[ts(type = "string")]
    pub rate: Money,
    /// Always `quantity × rate`, computed by the ledger.
    #[ts(type = "string")]
    pub subtotal: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A payment received against a sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PaymentHistory {
    pub id: String,
    pub sale_id: String,
    pub customer_phone: String,
    #[ts(type = "string")]
    pub amount: Money,
    /// Outstanding balance before this payment.
    #[ts(type = "string")]
    pub previous_balance: Money,
    /// Outstanding balance after this payment.
    #[ts(type = "string")]
    pub new_balance: Money,
    pub payment_method: String,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A sale with its lines and payments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleDetail {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
    pub payments: Vec<PaymentHistory>,
}

// =============================================================================
// Returns
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ReturnType {
    /// Some lines of a bill.
    Item,
    /// The whole bill.
    FullBill,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ReturnStatus {
    #[default]
    Completed,
    Cancelled,
}

/// A refund record. Independent of the sale's own money fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Return {
    pub id: String,
    /// `None` for quick returns without a traceable bill.
    pub sale_id: Option<String>,
    pub customer_name: String,
    pub customer_phone: String,
    pub return_type: ReturnType,
    #[ts(type = "string")]
    pub total_refund: Money,
    pub reason: Option<String>,
    pub status: ReturnStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ReturnItem {
    pub id: String,
    pub return_id: String,
    pub color_id: String,
    pub sale_item_id: Option<String>,
    pub quantity: i64,
    #[ts(type = "string")]
    pub rate: Money,
    #[ts(type = "string")]
    pub subtotal: Money,
    /// Whether the returned units went back on the shelf.
    pub stock_restored: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ReturnDetail {
    #[serde(rename = "return")]
    pub record: Return,
    pub items: Vec<ReturnItem>,
}

// =============================================================================
// Stock-in History
// =============================================================================

/// One inventory increase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StockInHistory {
    pub id: String,
    pub color_id: String,
    pub quantity: i64,
    pub previous_stock: i64,
    pub new_stock: i64,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub stock_in_date: NaiveDate,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A stock-in row joined with its catalog names, for history screens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StockInDetail {
    pub id: String,
    pub color_id: String,
    pub quantity: i64,
    pub previous_stock: i64,
    pub new_stock: i64,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub stock_in_date: NaiveDate,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    pub color_name: String,
    pub color_code: String,
    pub packing_size: String,
    pub product_name: String,
    pub company: String,
}

// =============================================================================
// Customer Ledger
// =============================================================================

/// Aggregated position of one customer across all their sales.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CustomerBalance {
    pub customer_phone: String,
    pub customer_name: String,
    pub sale_count: i64,
    #[ts(type = "string")]
    pub total_amount: Money,
    #[ts(type = "string")]
    pub amount_paid: Money,
    #[ts(type = "string")]
    pub outstanding: Money,
}

/// Everything recorded for one customer phone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CustomerStatement {
    pub customer_phone: String,
    pub sales: Vec<Sale>,
    pub payments: Vec<PaymentHistory>,
    pub returns: Vec<Return>,
    #[ts(type = "string")]
    pub total_billed: Money,
    #[ts(type = "string")]
    pub total_paid: Money,
    #[ts(type = "string")]
    pub total_refunded: Money,
    /// `total_billed - total_paid`.
    #[ts(type = "string")]
    pub outstanding: Money,
}

// =============================================================================
// Change Feed
// =============================================================================

/// Kind of ledger entity a change refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ChangeEntity {
    Product,
    Variant,
    Color,
    Sale,
    SaleItem,
    Payment,
    Return,
    StockIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ChangeOperation {
    Created,
    Updated,
    Deleted,
}

/// An entry of the change feed, written in the same transaction as the
/// mutation it describes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ChangeRecord {
    pub id: String,
    /// Commit order; strictly increasing.
    pub seq: i64,
    pub entity_type: ChangeEntity,
    pub entity_id: String,
    pub operation: ChangeOperation,
    /// JSON snapshot of the entity after the change (or before a deletion).
    pub payload: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub consumed_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Unit Tests
// =============================================================================

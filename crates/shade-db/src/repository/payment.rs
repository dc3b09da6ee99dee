//! # Payment Repository
//!
//! Payments received against sales, and the history rows that record them.
//!
//! ## Balance Arithmetic
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Sale total 500.00, deposit 0.00                                       │
//! │                                                                         │
//! │  record_payment(200.00)                                                │
//! │    previous_balance = 500.00 - 0.00   = 500.00                         │
//! │    amount_paid      = 0.00 + 200.00   = 200.00   → Partial             │
//! │    new_balance      = 500.00 - 200.00 = 300.00                         │
//! │                                                                         │
//! │  update_payment(200.00 → 250.00)                                       │
//! │    amount_paid += 50.00                          → 250.00, Partial     │
//! │    row.new_balance = row.previous_balance - 250.00 = 250.00            │
//! │                                                                         │
//! │  delete_payment()                                                      │
//! │    amount_paid -= 250.00 (never below zero)      → 0.00, Unpaid        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Later rows keep the balances they were written with; editing or deleting
//! an earlier payment does not rewrite them.

use chrono::Utc;
use shade_core::ledger::{adjust_amount_paid, apply_payment, edit_payment, remove_payment};
use shade_core::validation::{normalize_optional_text, validate_payment_amount, validate_required_text};
use shade_core::{
    ChangeEntity, ChangeOperation, CoreError, LedgerPolicy, NewPayment, PaymentHistory,
    PaymentUpdate, Sale, DEFAULT_PAYMENT_METHOD,
};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::change_feed::append_change;
use crate::repository::new_id;
use crate::repository::sale::{fetch_sale, write_payment_state};

pub(crate) const PAYMENT_COLUMNS: &str = "id, sale_id, customer_phone, amount, previous_balance, \
     new_balance, payment_method, notes, created_at";

// =============================================================================
// Connection Helpers
// =============================================================================

async fn fetch_payment(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<PaymentHistory>> {
    let sql = format!("SELECT {} FROM payment_history WHERE id = ?1", PAYMENT_COLUMNS);
    let payment = sqlx::query_as::<_, PaymentHistory>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(payment)
}

pub(crate) async fn fetch_payments_for_sale(
    conn: &mut SqliteConnection,
    sale_id: &str,
) -> DbResult<Vec<PaymentHistory>> {
    let sql = format!(
        "SELECT {} FROM payment_history WHERE sale_id = ?1 ORDER BY created_at, rowid",
        PAYMENT_COLUMNS
    );
    let payments = sqlx::query_as::<_, PaymentHistory>(&sql)
        .bind(sale_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(payments)
}

/// Trimmed method name, `"cash"` when blank.
fn payment_method(method: Option<&str>) -> DbResult<String> {
    Ok(normalize_optional_text(method, "payment_method")?
        .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string()))
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for payment database operations.
///
/// ## Usage
/// ```rust,ignore
/// let row = db.payments().record_payment(&sale_id, NewPayment {
///     amount: "200.00".parse()?,
///     payment_method: None,
///     notes: None,
/// }).await?;
/// assert_eq!(row.previous_balance, "500.00".parse()?);
/// ```
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
    policy: LedgerPolicy,
}

impl PaymentRepository {
    /// Creates a new PaymentRepository.
    pub fn new(pool: SqlitePool, policy: LedgerPolicy) -> Self {
        PaymentRepository { pool, policy }
    }

    /// Records a payment against a sale.
    ///
    /// ## Errors
    /// * `Validation` - amount is zero or negative
    /// * `NotFound` - unknown sale
    /// * `Overpayment` - amount exceeds the balance under a strict policy
    pub async fn record_payment(&self, sale_id: &str, req: NewPayment) -> DbResult<PaymentHistory> {
        validate_payment_amount(req.amount)?;
        let method = payment_method(req.payment_method.as_deref())?;
        let notes = normalize_optional_text(req.notes.as_deref(), "notes")?;

        let mut tx = self.pool.begin().await?;
        let sale = fetch_sale(&mut tx, sale_id).await?;

        let applied = apply_payment(
            &sale.id,
            sale.total_amount,
            sale.amount_paid,
            req.amount,
            &self.policy,
        )?;
        if applied.overpaid {
            warn!(
                sale_id = %sale.id,
                outstanding = %applied.previous_balance,
                amount = %req.amount,
                "Payment exceeds outstanding balance"
            );
        }

        let sale = Sale {
            amount_paid: applied.new_amount_paid,
            payment_status: applied.status,
            ..sale
        };
        write_payment_state(&mut tx, &sale).await?;

        let payment = PaymentHistory {
            id: new_id(),
            sale_id: sale.id.clone(),
            customer_phone: sale.customer_phone.clone(),
            amount: req.amount,
            previous_balance: applied.previous_balance,
            new_balance: applied.new_balance,
            payment_method: method,
            notes,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO payment_history (
                id, sale_id, customer_phone, amount, previous_balance,
                new_balance, payment_method, notes, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.sale_id)
        .bind(&payment.customer_phone)
        .bind(payment.amount)
        .bind(payment.previous_balance)
        .bind(payment.new_balance)
        .bind(&payment.payment_method)
        .bind(&payment.notes)
        .bind(payment.created_at)
        .execute(&mut *tx)
        .await?;

        append_change(&mut tx, ChangeEntity::Payment, &payment.id, ChangeOperation::Created, &payment)
            .await?;
        tx.commit().await?;

        info!(
            sale_id = %sale.id,
            amount = %payment.amount,
            new_balance = %payment.new_balance,
            status = %sale.payment_status,
            "Payment recorded"
        );
        Ok(payment)
    }

    /// Edits a recorded payment.
    ///
    /// An amount change moves the sale's `amount_paid` by the difference
    /// (never below zero) and rewrites this row's `new_balance` as
    /// `previous_balance - amount`.
    pub async fn update_payment(&self, id: &str, update: PaymentUpdate) -> DbResult<PaymentHistory> {
        if let Some(amount) = update.amount {
            validate_payment_amount(amount)?;
        }

        let mut tx = self.pool.begin().await?;
        let mut payment = fetch_payment(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Payment", id))?;

        if let Some(amount) = update.amount.filter(|a| *a != payment.amount) {
            let sale = fetch_sale(&mut tx, &payment.sale_id).await?;
            let edit = edit_payment(
                sale.total_amount,
                sale.amount_paid,
                payment.amount,
                amount,
                payment.previous_balance,
            )?;

            if amount > payment.amount && edit.amount_paid > sale.total_amount {
                // Balance before this payment was taken
                let outstanding =
                    sale.total_amount - adjust_amount_paid(sale.amount_paid, -payment.amount);
                if !self.policy.allow_overpayment {
                    return Err(CoreError::Overpayment {
                        sale_id: sale.id,
                        outstanding,
                        attempted: amount,
                    }
                    .into());
                }
                warn!(
                    sale_id = %sale.id,
                    payment_id = %id,
                    outstanding = %outstanding,
                    amount = %amount,
                    "Edited payment exceeds outstanding balance"
                );
            }

            debug!(
                payment_id = %id,
                old_amount = %payment.amount,
                new_amount = %amount,
                "Re-applying edited payment"
            );

            let sale = Sale {
                amount_paid: edit.amount_paid,
                payment_status: edit.status,
                ..sale
            };
            write_payment_state(&mut tx, &sale).await?;

            payment.amount = amount;
            payment.new_balance = edit.row_new_balance;
        }

        if let Some(method) = update.payment_method.as_deref() {
            payment.payment_method = payment_method(Some(method))?;
        }
        if update.notes.is_some() {
            payment.notes = normalize_optional_text(update.notes.as_deref(), "notes")?;
        }

        sqlx::query(
            r#"
            UPDATE payment_history
            SET amount = ?2, new_balance = ?3, payment_method = ?4, notes = ?5
            WHERE id = ?1
            "#,
        )
        .bind(&payment.id)
        .bind(payment.amount)
        .bind(payment.new_balance)
        .bind(&payment.payment_method)
        .bind(&payment.notes)
        .execute(&mut *tx)
        .await?;

        append_change(&mut tx, ChangeEntity::Payment, &payment.id, ChangeOperation::Updated, &payment)
            .await?;
        tx.commit().await?;

        info!(payment_id = %id, amount = %payment.amount, "Payment updated");
        Ok(payment)
    }

    /// Deletes a payment and takes its amount back off the sale.
    ///
    /// ## Returns
    /// `false` when no such payment exists.
    pub async fn delete_payment(&self, id: &str) -> DbResult<bool> {
        let mut tx = self.pool.begin().await?;
        let Some(payment) = fetch_payment(&mut tx, id).await? else {
            debug!(payment_id = %id, "Payment to delete not found");
            return Ok(false);
        };

        let sale = fetch_sale(&mut tx, &payment.sale_id).await?;
        let (amount_paid, payment_status) =
            remove_payment(sale.total_amount, sale.amount_paid, payment.amount);
        let sale = Sale {
            amount_paid,
            payment_status,
            ..sale
        };
        write_payment_state(&mut tx, &sale).await?;

        sqlx::query("DELETE FROM payment_history WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        append_change(&mut tx, ChangeEntity::Payment, id, ChangeOperation::Deleted, &payment).await?;
        tx.commit().await?;

        info!(
            payment_id = %id,
            sale_id = %sale.id,
            amount = %payment.amount,
            status = %sale.payment_status,
            "Payment deleted"
        );
        Ok(true)
    }

    /// Payments of one sale, oldest first.
    pub async fn list_payments(&self, sale_id: &str) -> DbResult<Vec<PaymentHistory>> {
        let mut conn = self.pool.acquire().await?;
        fetch_payments_for_sale(&mut conn, sale_id).await
    }

    /// Payments of every sale of one customer phone, oldest first.
    pub async fn list_payments_for_customer(&self, phone: &str) -> DbResult<Vec<PaymentHistory>> {
        let phone = validate_required_text(phone, "customer_phone")?;
        let sql = format!(
            "SELECT {} FROM payment_history WHERE customer_phone = ?1 ORDER BY created_at, rowid",
            PAYMENT_COLUMNS
        );
        let payments = sqlx::query_as::<_, PaymentHistory>(&sql)
            .bind(phone)
            .fetch_all(&self.pool)
            .await?;
        Ok(payments)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

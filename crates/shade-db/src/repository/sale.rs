//! # Sale Repository
//!
//! Database operations for sales, sale items and the customer ledger.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. CREATE                                                             │
//! │     └── create_sale()            header + items, stock taken           │
//! │     └── create_manual_balance()  amount only, no items, no stock       │
//! │                                                                         │
//! │  2. EDIT ITEMS (bill corrections)                                      │
//! │     └── add_sale_item()      stock -qty                                │
//! │     └── update_sale_item()   stock += old_qty - new_qty                │
//! │     └── delete_sale_item()   stock +qty                                │
//! │     └── each one re-derives total_amount and payment_status            │
//! │                                                                         │
//! │  3. PAY                                                                │
//! │     └── PaymentRepository::record_payment()                            │
//! │                                                                         │
//! │  4. (OPTIONAL) DELETE                                                  │
//! │     └── delete_sale()   stock restored, items + payments removed       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every step above is one transaction: a failing line (unknown color,
//! insufficient stock under a strict policy) leaves nothing behind.

use chrono::Utc;
use shade_core::ledger::{item_stock_delta, price_line, sale_totals};
use shade_core::validation::{
    normalize_optional_text, validate_balance_amount, validate_quantity, validate_rate,
    validate_required_text,
};
use shade_core::{
    ChangeEntity, ChangeOperation, CoreError, CustomerBalance, CustomerStatement, DueDateUpdate,
    LedgerPolicy, Money, NewManualBalance, NewSale, NewSaleItem, PaymentHistory, PaymentStatus, Return,
    ReturnStatus, Sale, SaleDetail, SaleFilter, SaleItem, SaleItemUpdate,
};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::catalog::adjust_stock;
use crate::repository::change_feed::append_change;
use crate::repository::new_id;
use crate::repository::payment::{fetch_payments_for_sale, PAYMENT_COLUMNS};
use crate::repository::returns::RETURN_COLUMNS;

pub(crate) const SALE_COLUMNS: &str = "id, customer_name, customer_phone, total_amount, \
     amount_paid, payment_status, due_date, is_manual_balance, notes, created_at";
const ITEM_COLUMNS: &str = "id, sale_id, color_id, quantity, rate, subtotal, created_at";

// =============================================================================
// Connection Helpers
// =============================================================================

pub(crate) async fn fetch_sale(conn: &mut SqliteConnection, id: &str) -> DbResult<Sale> {
    let sql = format!("SELECT {} FROM sales WHERE id = ?1", SALE_COLUMNS);
    sqlx::query_as::<_, Sale>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Sale", id))
}

pub(crate) async fn fetch_sale_item(conn: &mut SqliteConnection, id: &str) -> DbResult<SaleItem> {
    let sql = format!("SELECT {} FROM sale_items WHERE id = ?1", ITEM_COLUMNS);
    sqlx::query_as::<_, SaleItem>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("SaleItem", id))
}

async fn fetch_items(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Vec<SaleItem>> {
    let sql = format!(
        "SELECT {} FROM sale_items WHERE sale_id = ?1 ORDER BY created_at, rowid",
        ITEM_COLUMNS
    );
    let items = sqlx::query_as::<_, SaleItem>(&sql)
        .bind(sale_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(items)
}

async fn load_detail(conn: &mut SqliteConnection, sale: Sale) -> DbResult<SaleDetail> {
    let items = fetch_items(conn, &sale.id).await?;
    let payments = fetch_payments_for_sale(conn, &sale.id).await?;
    Ok(SaleDetail {
        sale,
        items,
        payments,
    })
}

/// Re-derives `total_amount` and `payment_status` from the sale's items,
/// keeping `amount_paid` as stored.
pub(crate) async fn recompute_sale(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Sale> {
    let sale = fetch_sale(conn, sale_id).await?;

    let subtotals =
        sqlx::query_scalar::<_, Money>("SELECT subtotal FROM sale_items WHERE sale_id = ?1")
            .bind(sale_id)
            .fetch_all(&mut *conn)
            .await?;
    let (total_amount, payment_status) = sale_totals(&subtotals, sale.amount_paid)?;

    debug!(
        sale_id = %sale_id,
        total = %total_amount,
        status = %payment_status,
        "Recomputed sale totals"
    );

    sqlx::query("UPDATE sales SET total_amount = ?2, payment_status = ?3 WHERE id = ?1")
        .bind(sale_id)
        .bind(total_amount)
        .bind(payment_status)
        .execute(&mut *conn)
        .await?;

    let sale = Sale {
        total_amount,
        payment_status,
        ..sale
    };
    append_change(conn, ChangeEntity::Sale, &sale.id, ChangeOperation::Updated, &sale).await?;

    Ok(sale)
}

/// Writes `amount_paid` and `payment_status` of a sale.
pub(crate) async fn write_payment_state(
    conn: &mut SqliteConnection,
    sale: &Sale,
) -> DbResult<()> {
    sqlx::query("UPDATE sales SET amount_paid = ?2, payment_status = ?3 WHERE id = ?1")
        .bind(&sale.id)
        .bind(sale.amount_paid)
        .bind(sale.payment_status)
        .execute(&mut *conn)
        .await?;

    append_change(conn, ChangeEntity::Sale, &sale.id, ChangeOperation::Updated, sale).await
}

async fn insert_sale(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sales (
            id, customer_name, customer_phone, total_amount, amount_paid,
            payment_status, due_date, is_manual_balance, notes, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.customer_name)
    .bind(&sale.customer_phone)
    .bind(sale.total_amount)
    .bind(sale.amount_paid)
    .bind(sale.payment_status)
    .bind(sale.due_date)
    .bind(sale.is_manual_balance)
    .bind(&sale.notes)
    .bind(sale.created_at)
    .execute(&mut *conn)
    .await?;

    append_change(conn, ChangeEntity::Sale, &sale.id, ChangeOperation::Created, sale).await
}

/// Takes the item's units off the shelf and inserts the line.
async fn insert_item(
    conn: &mut SqliteConnection,
    item: &SaleItem,
    policy: &LedgerPolicy,
) -> DbResult<()> {
    adjust_stock(conn, &item.color_id, -item.quantity, policy).await?;

    sqlx::query(
        r#"
        INSERT INTO sale_items (id, sale_id, color_id, quantity, rate, subtotal, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&item.id)
    .bind(&item.sale_id)
    .bind(&item.color_id)
    .bind(item.quantity)
    .bind(item.rate)
    .bind(item.subtotal)
    .bind(item.created_at)
    .execute(&mut *conn)
    .await?;

    append_change(conn, ChangeEntity::SaleItem, &item.id, ChangeOperation::Created, item).await
}

/// Loads an item of `sale`, rejecting manual balances and items of other
/// sales.
async fn owned_item(conn: &mut SqliteConnection, sale: &Sale, item_id: &str) -> DbResult<SaleItem> {
    if sale.is_manual_balance {
        return Err(DbError::inconsistent(format!(
            "sale {} is a manual balance and has no items",
            sale.id
        )));
    }

    let item = fetch_sale_item(conn, item_id).await?;
    if item.sale_id != sale.id {
        return Err(DbError::inconsistent(format!(
            "item {} belongs to sale {}, not {}",
            item.id, item.sale_id, sale.id
        )));
    }
    Ok(item)
}

fn new_line(sale_id: &str, item: &NewSaleItem) -> DbResult<SaleItem> {
    Ok(SaleItem {
        id: new_id(),
        sale_id: sale_id.to_string(),
        color_id: item.color_id.trim().to_string(),
        quantity: item.quantity,
        rate: item.rate,
        subtotal: price_line(item.quantity, item.rate)?,
        created_at: Utc::now(),
    })
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for sale database operations.
///
/// ## Usage
/// ```rust,ignore
/// let detail = db.sales().create_sale(NewSale { .. }).await?;
/// db.sales().add_sale_item(&detail.sale.id, NewSaleItem { .. }).await?;
/// let owed = db.sales().customer_balances().await?;
/// ```
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
    policy: LedgerPolicy,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool, policy: LedgerPolicy) -> Self {
        SaleRepository { pool, policy }
    }

    /// Creates a sale with its items.
    ///
    /// ## What This Does
    /// 1. Prices every line (`quantity × rate`) and sums the total
    /// 2. Derives the payment status from the deposit (`amount_paid`)
    /// 3. Inserts the sale, then each line, taking its stock
    ///
    /// The deposit is stored on the sale only; no payment history row is
    /// written for it.
    ///
    /// ## Errors
    /// * `Validation` - no items, bad quantity/rate, negative deposit
    /// * `NotFound` - a line references an unknown color
    /// * `InsufficientStock` / `Overpayment` - only under a strict policy
    pub async fn create_sale(&self, req: NewSale) -> DbResult<SaleDetail> {
        req.validate()?;
        let customer_name = validate_required_text(&req.customer_name, "customer_name")?;
        let customer_phone = validate_required_text(&req.customer_phone, "customer_phone")?;
        let notes = normalize_optional_text(req.notes.as_deref(), "notes")?;

        let sale_id = new_id();
        let items = req
            .items
            .iter()
            .map(|item| new_line(&sale_id, item))
            .collect::<DbResult<Vec<_>>>()?;
        let subtotals: Vec<Money> = items.iter().map(|item| item.subtotal).collect();
        let (total_amount, payment_status) = sale_totals(&subtotals, req.amount_paid)?;

        if req.amount_paid > total_amount {
            if !self.policy.allow_overpayment {
                return Err(CoreError::Overpayment {
                    sale_id,
                    outstanding: total_amount,
                    attempted: req.amount_paid,
                }
                .into());
            }
            warn!(
                sale_id = %sale_id,
                total = %total_amount,
                deposit = %req.amount_paid,
                "Deposit exceeds sale total"
            );
        }

        let sale = Sale {
            id: sale_id,
            customer_name,
            customer_phone,
            total_amount,
            amount_paid: req.amount_paid,
            payment_status,
            due_date: req.due_date,
            is_manual_balance: false,
            notes,
            created_at: Utc::now(),
        };

        debug!(sale_id = %sale.id, lines = items.len(), "Creating sale");

        let mut tx = self.pool.begin().await?;
        insert_sale(&mut tx, &sale).await?;
        for item in &items {
            insert_item(&mut tx, item, &self.policy).await?;
        }
        tx.commit().await?;

        info!(
            sale_id = %sale.id,
            customer_phone = %sale.customer_phone,
            total = %sale.total_amount,
            status = %sale.payment_status,
            "Sale created"
        );

        Ok(SaleDetail {
            sale,
            items,
            payments: Vec::new(),
        })
    }

    /// Records an amount owed with no items ("cash loan").
    pub async fn create_manual_balance(&self, req: NewManualBalance) -> DbResult<Sale> {
        validate_balance_amount(req.total_amount)?;

        let sale = Sale {
            id: new_id(),
            customer_name: validate_required_text(&req.customer_name, "customer_name")?,
            customer_phone: validate_required_text(&req.customer_phone, "customer_phone")?,
            total_amount: req.total_amount,
            amount_paid: Money::zero(),
            payment_status: PaymentStatus::Unpaid,
            due_date: req.due_date,
            is_manual_balance: true,
            notes: normalize_optional_text(req.notes.as_deref(), "notes")?,
            created_at: Utc::now(),
        };

        let mut tx = self.pool.begin().await?;
        insert_sale(&mut tx, &sale).await?;
        tx.commit().await?;

        info!(
            sale_id = %sale.id,
            customer_phone = %sale.customer_phone,
            total = %sale.total_amount,
            "Manual balance created"
        );
        Ok(sale)
    }

    /// Gets a sale with its items and payments.
    pub async fn get_sale(&self, id: &str) -> DbResult<SaleDetail> {
        let mut conn = self.pool.acquire().await?;
        let sale = fetch_sale(&mut conn, id).await?;
        load_detail(&mut conn, sale).await
    }

    /// Sales matching `filter`, newest first.
    pub async fn list_sales(&self, filter: SaleFilter) -> DbResult<Vec<Sale>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM sales WHERE 1 = 1", SALE_COLUMNS));

        if let Some(phone) = filter.customer_phone.as_deref().map(str::trim) {
            qb.push(" AND customer_phone = ").push_bind(phone.to_string());
        }
        if let Some(status) = filter.payment_status {
            qb.push(" AND payment_status = ").push_bind(status);
        }
        if filter.outstanding_only {
            qb.push(" AND total_amount > amount_paid");
        }

        qb.push(" ORDER BY created_at DESC, rowid DESC");
        if let Some(limit) = filter.limit {
            qb.push(" LIMIT ").push_bind(limit.max(0));
        }

        let sales = qb.build_query_as::<Sale>().fetch_all(&self.pool).await?;
        Ok(sales)
    }

    /// Adds a line to an existing sale.
    pub async fn add_sale_item(&self, sale_id: &str, req: NewSaleItem) -> DbResult<SaleDetail> {
        req.validate()?;

        let mut tx = self.pool.begin().await?;
        let sale = fetch_sale(&mut tx, sale_id).await?;
        if sale.is_manual_balance {
            return Err(DbError::inconsistent(format!(
                "sale {} is a manual balance and cannot take items",
                sale.id
            )));
        }

        let item = new_line(&sale.id, &req)?;
        insert_item(&mut tx, &item, &self.policy).await?;
        let sale = recompute_sale(&mut tx, &sale.id).await?;
        let detail = load_detail(&mut tx, sale).await?;
        tx.commit().await?;

        info!(
            sale_id = %sale_id,
            item_id = %item.id,
            total = %detail.sale.total_amount,
            "Sale item added"
        );
        Ok(detail)
    }

    /// Changes the quantity and rate of a line.
    ///
    /// The color's stock moves by `old_quantity - new_quantity`.
    pub async fn update_sale_item(
        &self,
        sale_id: &str,
        item_id: &str,
        update: SaleItemUpdate,
    ) -> DbResult<SaleDetail> {
        validate_quantity(update.quantity)?;
        validate_rate(update.rate)?;

        let mut tx = self.pool.begin().await?;
        let sale = fetch_sale(&mut tx, sale_id).await?;
        let item = owned_item(&mut tx, &sale, item_id).await?;

        let delta = item_stock_delta(item.quantity, update.quantity);
        adjust_stock(&mut tx, &item.color_id, delta, &self.policy).await?;

        let item = SaleItem {
            quantity: update.quantity,
            rate: update.rate,
            subtotal: price_line(update.quantity, update.rate)?,
            ..item
        };

        sqlx::query("UPDATE sale_items SET quantity = ?2, rate = ?3, subtotal = ?4 WHERE id = ?1")
            .bind(&item.id)
            .bind(item.quantity)
            .bind(item.rate)
            .bind(item.subtotal)
            .execute(&mut *tx)
            .await?;
        append_change(&mut tx, ChangeEntity::SaleItem, &item.id, ChangeOperation::Updated, &item)
            .await?;

        let sale = recompute_sale(&mut tx, &sale.id).await?;
        let detail = load_detail(&mut tx, sale).await?;
        tx.commit().await?;

        info!(
            sale_id = %sale_id,
            item_id = %item_id,
            stock_delta = delta,
            total = %detail.sale.total_amount,
            "Sale item updated"
        );
        Ok(detail)
    }

    /// Removes a line and puts its units back on the shelf.
    pub async fn delete_sale_item(&self, sale_id: &str, item_id: &str) -> DbResult<SaleDetail> {
        let mut tx = self.pool.begin().await?;
        let sale = fetch_sale(&mut tx, sale_id).await?;
        let item = owned_item(&mut tx, &sale, item_id).await?;

        adjust_stock(&mut tx, &item.color_id, item.quantity, &self.policy).await?;

        sqlx::query("DELETE FROM sale_items WHERE id = ?1")
            .bind(&item.id)
            .execute(&mut *tx)
            .await?;
        append_change(&mut tx, ChangeEntity::SaleItem, &item.id, ChangeOperation::Deleted, &item)
            .await?;

        let sale = recompute_sale(&mut tx, &sale.id).await?;
        let detail = load_detail(&mut tx, sale).await?;
        tx.commit().await?;

        info!(
            sale_id = %sale_id,
            item_id = %item_id,
            restored = item.quantity,
            total = %detail.sale.total_amount,
            "Sale item deleted"
        );
        Ok(detail)
    }

    /// Deletes a sale with its items and payment history, restoring the
    /// stock of every item. Returns that referenced the sale keep their
    /// rows with the sale link cleared.
    pub async fn delete_sale(&self, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        let sale = fetch_sale(&mut tx, id).await?;
        let items = fetch_items(&mut tx, id).await?;
        let payments = fetch_payments_for_sale(&mut tx, id).await?;

        for item in &items {
            adjust_stock(&mut tx, &item.color_id, item.quantity, &self.policy).await?;
            append_change(&mut tx, ChangeEntity::SaleItem, &item.id, ChangeOperation::Deleted, item)
                .await?;
        }
        for payment in &payments {
            append_change(
                &mut tx,
                ChangeEntity::Payment,
                &payment.id,
                ChangeOperation::Deleted,
                payment,
            )
            .await?;
        }

        sqlx::query("DELETE FROM sale_items WHERE sale_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM payment_history WHERE sale_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM sales WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        append_change(&mut tx, ChangeEntity::Sale, id, ChangeOperation::Deleted, &sale).await?;
        tx.commit().await?;

        info!(
            sale_id = %id,
            items = items.len(),
            payments = payments.len(),
            "Sale deleted"
        );
        Ok(())
    }

    /// Sets the due date (`None` clears it) and, when given, the notes.
    pub async fn update_sale_due_date(&self, id: &str, update: DueDateUpdate) -> DbResult<Sale> {
        let notes = normalize_optional_text(update.notes.as_deref(), "notes")?;

        let mut tx = self.pool.begin().await?;
        let sale = fetch_sale(&mut tx, id).await?;

        let sale = Sale {
            due_date: update.due_date,
            notes: notes.or(sale.notes),
            ..sale
        };

        sqlx::query("UPDATE sales SET due_date = ?2, notes = ?3 WHERE id = ?1")
            .bind(&sale.id)
            .bind(sale.due_date)
            .bind(&sale.notes)
            .execute(&mut *tx)
            .await?;

        append_change(&mut tx, ChangeEntity::Sale, &sale.id, ChangeOperation::Updated, &sale).await?;
        tx.commit().await?;

        Ok(sale)
    }

    // =========================================================================
    // Customer Ledger
    // =========================================================================

    /// One row per customer phone with something still owed, largest first.
    pub async fn customer_balances(&self) -> DbResult<Vec<CustomerBalance>> {
        let balances = sqlx::query_as::<_, CustomerBalance>(
            r#"
            SELECT
                customer_phone,
                MAX(customer_name) AS customer_name,
                COUNT(*) AS sale_count,
                SUM(total_amount) AS total_amount,
                SUM(amount_paid) AS amount_paid,
                SUM(total_amount) - SUM(amount_paid) AS outstanding
            FROM sales
            GROUP BY customer_phone
            HAVING SUM(total_amount) - SUM(amount_paid) > 0
            ORDER BY outstanding DESC, customer_phone
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(customers = balances.len(), "Computed customer balances");
        Ok(balances)
    }

    /// Everything recorded against one phone number, oldest first.
    ///
    /// `total_refunded` counts completed returns only. Refunds do not
    /// reduce `outstanding`.
    pub async fn customer_statement(&self, phone: &str) -> DbResult<CustomerStatement> {
        let phone = validate_required_text(phone, "customer_phone")?;
        let mut conn = self.pool.acquire().await?;

        let sql = format!(
            "SELECT {} FROM sales WHERE customer_phone = ?1 ORDER BY created_at, rowid",
            SALE_COLUMNS
        );
        let sales = sqlx::query_as::<_, Sale>(&sql)
            .bind(&phone)
            .fetch_all(&mut *conn)
            .await?;

        let sql = format!(
            "SELECT {} FROM payment_history WHERE customer_phone = ?1 ORDER BY created_at, rowid",
            PAYMENT_COLUMNS
        );
        let payments = sqlx::query_as::<_, PaymentHistory>(&sql)
            .bind(&phone)
            .fetch_all(&mut *conn)
            .await?;

        let sql = format!(
            "SELECT {} FROM returns WHERE customer_phone = ?1 ORDER BY created_at, rowid",
            RETURN_COLUMNS
        );
        let returns = sqlx::query_as::<_, Return>(&sql)
            .bind(&phone)
            .fetch_all(&mut *conn)
            .await?;

        let total_billed: Money = sales.iter().map(|s| s.total_amount).sum();
        let total_paid: Money = sales.iter().map(|s| s.amount_paid).sum();
        let total_refunded: Money = returns
            .iter()
            .filter(|r| r.status == ReturnStatus::Completed)
            .map(|r| r.total_refund)
            .sum();

        Ok(CustomerStatement {
            customer_phone: phone,
            sales,
            payments,
            returns,
            total_billed,
            total_paid,
            total_refunded,
            outstanding: total_billed - total_paid,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use shade_core::{NewColor, NewProduct, NewVariant};

    async fn setup(policy: LedgerPolicy) -> (Database, String) {
        let db = Database::new(DbConfig::in_memory().policy(policy)).await.unwrap();
        let catalog = db.catalog();
        let product = catalog
            .create_product(NewProduct {
                company: "Nippon".to_string(),
                product_name: "Vinilex".to_string(),
            })
            .await
            .unwrap();
        let variant = catalog
            .create_variant(NewVariant {
                product_id: product.id,
                packing_size: "Gallon".to_string(),
                rate: Money::from_major(100),
            })
            .await
            .unwrap();
        let color = catalog
            .create_color(NewColor {
                variant_id: variant.id,
                color_name: "Ivory".to_string(),
                color_code: "IV-01".to_string(),
                stock_quantity: 50,
                rate_override: None,
            })
            .await
            .unwrap();
        (db, color.id)
    }

    fn line(color_id: &str, quantity: i64, rate: i64) -> NewSaleItem {
        NewSaleItem {
            color_id: color_id.to_string(),
            quantity,
            rate: Money::from_major(rate),
        }
    }

    fn sale(items: Vec<NewSaleItem>, paid: i64) -> NewSale {
        NewSale {
            customer_name: "Ali".to_string(),
            customer_phone: "0300-1234567".to_string(),
            amount_paid: Money::from_major(paid),
            due_date: None,
            notes: None,
            items,
        }
    }

    async fn stock(db: &Database, color_id: &str) -> i64 {
        db.catalog().get_color(color_id).await.unwrap().stock_quantity
    }

    #[tokio::test]
    async fn test_create_sale() {
        let (db, color) = setup(LedgerPolicy::default()).await;

        let detail = db.sales().create_sale(sale(vec![line(&color, 5, 100)], 200)).await.unwrap();

        assert_eq!(detail.sale.total_amount, Money::from_major(500));
        assert_eq!(detail.sale.payment_status, PaymentStatus::Partial);
        assert_eq!(detail.items[0].subtotal, Money::from_major(500));
        assert!(detail.payments.is_empty());
        assert_eq!(stock(&db, &color).await, 45);

        let loaded = db.sales().get_sale(&detail.sale.id).await.unwrap();
        assert_eq!(loaded, detail);
    }

    #[tokio::test]
    async fn test_unknown_color_rolls_back() {
        let (db, color) = setup(LedgerPolicy::default()).await;

        let err = db
            .sales()
            .create_sale(sale(vec![line(&color, 5, 100), line("missing", 1, 100)], 0))
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(stock(&db, &color).await, 50);
        assert!(db.sales().list_sales(SaleFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_sale_validation() {
        let (db, color) = setup(LedgerPolicy::default()).await;

        assert!(db.sales().create_sale(sale(vec![], 0)).await.unwrap_err().is_validation());
        assert!(db
            .sales()
            .create_sale(sale(vec![line(&color, 0, 100)], 0))
            .await
            .unwrap_err()
            .is_validation());
        assert!(db
            .sales()
            .create_sale(sale(vec![line(&color, 1, 100)], -1))
            .await
            .unwrap_err()
            .is_validation());

        let mut huge_deposit = sale(vec![line(&color, 1, 100)], 0);
        huge_deposit.amount_paid = Money::from_cents(i64::MAX);
        assert!(db.sales().create_sale(huge_deposit).await.unwrap_err().is_validation());
        assert!(db
            .sales()
            .create_manual_balance(NewManualBalance {
                customer_name: "Ali".to_string(),
                customer_phone: "0300-1234567".to_string(),
                total_amount: Money::from_cents(i64::MAX),
                due_date: None,
                notes: None,
            })
            .await
            .unwrap_err()
            .is_validation());
        assert_eq!(stock(&db, &color).await, 50);
    }

    #[tokio::test]
    async fn test_strict_policy_blocks_oversell() {
        let (db, color) = setup(LedgerPolicy::strict()).await;

        let err = db.sales().create_sale(sale(vec![line(&color, 51, 100)], 0)).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::InsufficientStock { available: 50, .. })));
        assert_eq!(stock(&db, &color).await, 50);

        let err = db.sales().create_sale(sale(vec![line(&color, 1, 100)], 150)).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Overpayment { .. })));
    }

    #[tokio::test]
    async fn test_permissive_policy_allows_oversell() {
        let (db, color) = setup(LedgerPolicy::default()).await;
        db.sales().create_sale(sale(vec![line(&color, 60, 100)], 0)).await.unwrap();
        assert_eq!(stock(&db, &color).await, -10);
    }

    #[tokio::test]
    async fn test_item_edits_move_stock_and_totals() {
        let (db, color) = setup(LedgerPolicy::default()).await;
        let repo = db.sales();
        let detail = repo.create_sale(sale(vec![line(&color, 5, 100)], 300)).await.unwrap();
        let sale_id = detail.sale.id.clone();

        let detail = repo.add_sale_item(&sale_id, line(&color, 2, 50)).await.unwrap();
        assert_eq!(detail.sale.total_amount, Money::from_major(600));
        assert_eq!(detail.sale.payment_status, PaymentStatus::Partial);
        assert_eq!(stock(&db, &color).await, 43);

        let first = detail.items[0].id.clone();
        let detail = repo
            .update_sale_item(
                &sale_id,
                &first,
                SaleItemUpdate {
                    quantity: 2,
                    rate: Money::from_major(100),
                },
            )
            .await
            .unwrap();
        assert_eq!(detail.sale.total_amount, Money::from_major(300));
        assert_eq!(detail.sale.payment_status, PaymentStatus::Paid);
        assert_eq!(stock(&db, &color).await, 46);

        let second = detail.items[1].id.clone();
        repo.delete_sale_item(&sale_id, &second).await.unwrap();
        let detail = repo.delete_sale_item(&sale_id, &first).await.unwrap();
        assert!(detail.items.is_empty());
        assert_eq!(detail.sale.total_amount, Money::zero());
        assert_eq!(detail.sale.payment_status, PaymentStatus::Paid);
        assert_eq!(stock(&db, &color).await, 50);
    }

    #[tokio::test]
    async fn test_item_of_other_sale_is_rejected() {
        let (db, color) = setup(LedgerPolicy::default()).await;
        let repo = db.sales();
        let a = repo.create_sale(sale(vec![line(&color, 1, 100)], 0)).await.unwrap();
        let b = repo.create_sale(sale(vec![line(&color, 1, 100)], 0)).await.unwrap();

        let err = repo.delete_sale_item(&a.sale.id, &b.items[0].id).await.unwrap_err();
        assert!(err.is_inconsistent_state());

        let err = repo.delete_sale_item(&a.sale.id, "missing").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(stock(&db, &color).await, 48);
    }

    #[tokio::test]
    async fn test_manual_balance() {
        let (db, color) = setup(LedgerPolicy::default()).await;
        let repo = db.sales();

        let balance = repo
            .create_manual_balance(NewManualBalance {
                customer_name: "Bilal".to_string(),
                customer_phone: "0311".to_string(),
                total_amount: Money::from_major(2000),
                due_date: None,
                notes: Some("cash loan".to_string()),
            })
            .await
            .unwrap();
        assert!(balance.is_manual_balance);
        assert_eq!(balance.payment_status, PaymentStatus::Unpaid);

        let err = repo.add_sale_item(&balance.id, line(&color, 1, 100)).await.unwrap_err();
        assert!(err.is_inconsistent_state());
        assert_eq!(stock(&db, &color).await, 50);

        let err = repo
            .create_manual_balance(NewManualBalance {
                customer_name: "Bilal".to_string(),
                customer_phone: "0311".to_string(),
                total_amount: Money::zero(),
                due_date: None,
                notes: None,
            })
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_delete_sale_restores_stock() {
        let (db, color) = setup(LedgerPolicy::default()).await;
        let detail = db
            .sales()
            .create_sale(sale(vec![line(&color, 5, 100), line(&color, 3, 100)], 0))
            .await
            .unwrap();
        db.payments()
            .record_payment(
                &detail.sale.id,
                shade_core::NewPayment {
                    amount: Money::from_major(100),
                    payment_method: None,
                    notes: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(stock(&db, &color).await, 42);

        db.sales().delete_sale(&detail.sale.id).await.unwrap();

        assert_eq!(stock(&db, &color).await, 50);
        assert!(db.sales().get_sale(&detail.sale.id).await.unwrap_err().is_not_found());
        assert!(db.payments().list_payments(&detail.sale.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_due_date_update() {
        let (db, color) = setup(LedgerPolicy::default()).await;
        let mut req = sale(vec![line(&color, 1, 100)], 0);
        req.notes = Some("deliver Friday".to_string());
        let detail = db.sales().create_sale(req).await.unwrap();

        let due = chrono::NaiveDate::from_ymd_opt(2024, 6, 30);
        let updated = db
            .sales()
            .update_sale_due_date(
                &detail.sale.id,
                DueDateUpdate {
                    due_date: due,
                    notes: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.due_date, due);
        assert_eq!(updated.notes.as_deref(), Some("deliver Friday"));
        assert_eq!(updated.total_amount, detail.sale.total_amount);

        let cleared = db
            .sales()
            .update_sale_due_date(&detail.sale.id, DueDateUpdate::default())
            .await
            .unwrap();
        assert_eq!(cleared.due_date, None);
    }

    #[tokio::test]
    async fn test_list_and_balances() {
        let (db, color) = setup(LedgerPolicy::default()).await;
        let repo = db.sales();
        repo.create_sale(sale(vec![line(&color, 5, 100)], 200)).await.unwrap();
        repo.create_sale(sale(vec![line(&color, 1, 100)], 100)).await.unwrap();
        let mut other = sale(vec![line(&color, 2, 100)], 0);
        other.customer_phone = "0333".to_string();
        repo.create_sale(other).await.unwrap();

        let outstanding = repo
            .list_sales(SaleFilter {
                outstanding_only: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(outstanding.len(), 2);

        let paid = repo
            .list_sales(SaleFilter {
                payment_status: Some(PaymentStatus::Paid),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(paid.len(), 1);

        let balances = repo.customer_balances().await.unwrap();
        assert_eq!(balances.len(), 2);
        assert_eq!(balances[0].customer_phone, "0300-1234567");
        assert_eq!(balances[0].sale_count, 2);
        assert_eq!(balances[0].outstanding, Money::from_major(300));
        assert_eq!(balances[1].outstanding, Money::from_major(200));

        let statement = repo.customer_statement("0300-1234567").await.unwrap();
        assert_eq!(statement.sales.len(), 2);
        assert_eq!(statement.total_billed, Money::from_major(600));
        assert_eq!(statement.total_paid, Money::from_major(300));
        assert_eq!(statement.outstanding, Money::from_major(300));
        assert_eq!(statement.total_refunded, Money::zero());
    }
}

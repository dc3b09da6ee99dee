//! # Return Repository
//!
//! Customer returns: whole bills, single lines, and quick returns with no
//! bill at all.
//!
//! ## Return Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    create_return()                                      │
//! │                                                                         │
//! │  Sale (optional) ──► sale exists?                        NotFound      │
//! │                                                                         │
//! │  For each line:                                                        │
//! │    sale_item_id given?                                                 │
//! │      ├── belongs to the sale, same color?          InconsistentState   │
//! │      └── returned so far + this line ≤ sold?        Validation         │
//! │    stock_restored?                                                     │
//! │      └── color.stock_quantity += quantity                              │
//! │                                                                         │
//! │  total_refund = Σ quantity × rate                                      │
//! │                                                                         │
//! │  The sale's own total, amount_paid and status are left as they are.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Edit Window
//! A return can be changed or deleted for `return_edit_window_hours` after
//! it was created (12 by default). Cancelling a completed return takes the
//! restored units back off the shelf; re-completing puts them back.

use chrono::{DateTime, Utc};
use shade_core::ledger::{can_edit_return, check_return_quantity, ensure_return_editable, price_line, sum_lines};
use shade_core::validation::{normalize_optional_text, validate_required_text};
use shade_core::{
    ChangeEntity, ChangeOperation, EditWindow, LedgerPolicy, NewReturn, QuickReturn, Return,
    ReturnDetail, ReturnFilter, ReturnItem, ReturnStatus, ReturnUpdate,
};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::catalog::{adjust_stock, fetch_color};
use crate::repository::change_feed::append_change;
use crate::repository::new_id;
use crate::repository::sale::{fetch_sale, fetch_sale_item};

pub(crate) const RETURN_COLUMNS: &str = "id, sale_id, customer_name, customer_phone, return_type, \
     total_refund, reason, status, created_at";
const RETURN_ITEM_COLUMNS: &str =
    "id, return_id, color_id, sale_item_id, quantity, rate, subtotal, stock_restored";

// =============================================================================
// Connection Helpers
// =============================================================================

async fn fetch_return(conn: &mut SqliteConnection, id: &str) -> DbResult<Return> {
    let sql = format!("SELECT {} FROM returns WHERE id = ?1", RETURN_COLUMNS);
    sqlx::query_as::<_, Return>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Return", id))
}

async fn fetch_return_items(conn: &mut SqliteConnection, return_id: &str) -> DbResult<Vec<ReturnItem>> {
    let sql = format!(
        "SELECT {} FROM return_items WHERE return_id = ?1 ORDER BY rowid",
        RETURN_ITEM_COLUMNS
    );
    let items = sqlx::query_as::<_, ReturnItem>(&sql)
        .bind(return_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(items)
}

/// Units of a sale item already taken back by completed returns.
async fn returned_quantity(conn: &mut SqliteConnection, sale_item_id: &str) -> DbResult<i64> {
    let returned: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(ri.quantity), 0)
        FROM return_items ri
        JOIN returns r ON r.id = ri.return_id
        WHERE ri.sale_item_id = ?1 AND r.status = 'completed'
        "#,
    )
    .bind(sale_item_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(returned)
}

/// Checks that the lines of a return can count against their sale items
/// again, given what other completed returns already took back.
async fn check_returnable(conn: &mut SqliteConnection, items: &[ReturnItem]) -> DbResult<()> {
    let mut requested: HashMap<&str, i64> = HashMap::new();
    for item in items {
        let Some(sale_item_id) = item.sale_item_id.as_deref() else {
            continue;
        };
        let sold = fetch_sale_item(conn, sale_item_id).await?;
        let earlier = requested.entry(sale_item_id).or_insert(0);
        let already = returned_quantity(conn, sale_item_id).await? + *earlier;
        check_return_quantity(sold.quantity, already, item.quantity)?;
        *earlier += item.quantity;
    }
    Ok(())
}

/// Moves the restored units of `items` by `sign × quantity`.
async fn shift_restored_stock(
    conn: &mut SqliteConnection,
    items: &[ReturnItem],
    sign: i64,
    policy: &LedgerPolicy,
) -> DbResult<()> {
    for item in items.iter().filter(|item| item.stock_restored) {
        adjust_stock(conn, &item.color_id, sign * item.quantity, policy).await?;
    }
    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for return database operations.
#[derive(Debug, Clone)]
pub struct ReturnRepository {
    pool: SqlitePool,
    policy: LedgerPolicy,
}

impl ReturnRepository {
    /// Creates a new ReturnRepository.
    pub fn new(pool: SqlitePool, policy: LedgerPolicy) -> Self {
        ReturnRepository { pool, policy }
    }

    /// Records a return with its lines.
    ///
    /// ## Errors
    /// * `Validation` - no lines, bad quantity/rate, or more units than
    ///   are left to return on a sale item
    /// * `NotFound` - unknown sale, sale item or color
    /// * `InconsistentState` - a sale item that is not part of the sale, or
    ///   whose color differs from the line's
    pub async fn create_return(&self, req: NewReturn) -> DbResult<ReturnDetail> {
        req.validate()?;
        let customer_name = validate_required_text(&req.customer_name, "customer_name")?;
        let customer_phone = validate_required_text(&req.customer_phone, "customer_phone")?;
        let reason = normalize_optional_text(req.reason.as_deref(), "reason")?;
        let sale_id = req
            .sale_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        let return_id = new_id();
        let items = req
            .items
            .iter()
            .map(|item| -> DbResult<ReturnItem> {
                Ok(ReturnItem {
                    id: new_id(),
                    return_id: return_id.clone(),
                    color_id: item.color_id.trim().to_string(),
                    sale_item_id: item.sale_item_id.clone(),
                    quantity: item.quantity,
                    rate: item.rate,
                    subtotal: price_line(item.quantity, item.rate)?,
                    stock_restored: item.stock_restored,
                })
            })
            .collect::<DbResult<Vec<_>>>()?;
        let subtotals: Vec<_> = items.iter().map(|item| item.subtotal).collect();
        let total_refund = sum_lines(&subtotals)?;

        let mut tx = self.pool.begin().await?;

        if let Some(sale_id) = sale_id.as_deref() {
            fetch_sale(&mut tx, sale_id).await?;
        }

        // Lines of this request count against each other too
        let mut requested: HashMap<String, i64> = HashMap::new();

        for item in &items {
            if let Some(sale_item_id) = item.sale_item_id.as_deref() {
                let Some(sale_id) = sale_id.as_deref() else {
                    return Err(DbError::inconsistent(format!(
                        "sale item {} given without a sale",
                        sale_item_id
                    )));
                };

                let sold = fetch_sale_item(&mut tx, sale_item_id).await?;
                if sold.sale_id != sale_id {
                    return Err(DbError::inconsistent(format!(
                        "sale item {} belongs to sale {}, not {}",
                        sold.id, sold.sale_id, sale_id
                    )));
                }
                if sold.color_id != item.color_id {
                    return Err(DbError::inconsistent(format!(
                        "sale item {} is color {}, not {}",
                        sold.id, sold.color_id, item.color_id
                    )));
                }

                let earlier = requested.entry(sold.id.clone()).or_insert(0);
                let already = returned_quantity(&mut tx, &sold.id).await? + *earlier;
                check_return_quantity(sold.quantity, already, item.quantity)?;
                *earlier += item.quantity;
            }

            if item.stock_restored {
                adjust_stock(&mut tx, &item.color_id, item.quantity, &self.policy).await?;
            } else {
                fetch_color(&mut tx, &item.color_id).await?;
            }
        }

        let record = Return {
            id: return_id,
            sale_id,
            customer_name,
            customer_phone,
            return_type: req.return_type,
            total_refund,
            reason,
            status: ReturnStatus::Completed,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO returns (
                id, sale_id, customer_name, customer_phone, return_type,
                total_refund, reason, status, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&record.id)
        .bind(&record.sale_id)
        .bind(&record.customer_name)
        .bind(&record.customer_phone)
        .bind(record.return_type)
        .bind(record.total_refund)
        .bind(&record.reason)
        .bind(record.status)
        .bind(record.created_at)
        .execute(&mut *tx)
        .await?;

        for item in &items {
            sqlx::query(
                r#"
                INSERT INTO return_items (
                    id, return_id, color_id, sale_item_id, quantity,
                    rate, subtotal, stock_restored
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(&item.id)
            .bind(&item.return_id)
            .bind(&item.color_id)
            .bind(&item.sale_item_id)
            .bind(item.quantity)
            .bind(item.rate)
            .bind(item.subtotal)
            .bind(item.stock_restored)
            .execute(&mut *tx)
            .await?;
        }

        let detail = ReturnDetail { record, items };
        append_change(
            &mut tx,
            ChangeEntity::Return,
            &detail.record.id,
            ChangeOperation::Created,
            &detail,
        )
        .await?;
        tx.commit().await?;

        info!(
            return_id = %detail.record.id,
            sale_id = ?detail.record.sale_id,
            lines = detail.items.len(),
            refund = %detail.record.total_refund,
            "Return created"
        );
        Ok(detail)
    }

    /// Records a single-line return with no bill.
    pub async fn create_quick_return(&self, req: QuickReturn) -> DbResult<ReturnDetail> {
        self.create_return(req.into()).await
    }

    pub async fn get_return(&self, id: &str) -> DbResult<ReturnDetail> {
        let mut conn = self.pool.acquire().await?;
        let record = fetch_return(&mut conn, id).await?;
        let items = fetch_return_items(&mut conn, id).await?;
        Ok(ReturnDetail { record, items })
    }

    /// Returns matching `filter`, newest first.
    pub async fn list_returns(&self, filter: ReturnFilter) -> DbResult<Vec<Return>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM returns WHERE 1 = 1", RETURN_COLUMNS));

        if let Some(sale_id) = filter.sale_id {
            qb.push(" AND sale_id = ").push_bind(sale_id);
        }
        if let Some(phone) = filter.customer_phone.as_deref().map(str::trim) {
            qb.push(" AND customer_phone = ").push_bind(phone.to_string());
        }

        qb.push(" ORDER BY created_at DESC, rowid DESC");
        if let Some(limit) = filter.limit {
            qb.push(" LIMIT ").push_bind(limit.max(0));
        }

        let returns = qb.build_query_as::<Return>().fetch_all(&self.pool).await?;
        Ok(returns)
    }

    /// Whether the return can still be edited at `now`.
    pub async fn edit_window(&self, id: &str, now: DateTime<Utc>) -> DbResult<EditWindow> {
        let mut conn = self.pool.acquire().await?;
        let record = fetch_return(&mut conn, id).await?;
        Ok(can_edit_return(
            record.created_at,
            now,
            self.policy.return_edit_window_hours,
        ))
    }

    /// Changes the reason or status of a return inside its edit window.
    pub async fn update_return(
        &self,
        id: &str,
        update: ReturnUpdate,
        now: DateTime<Utc>,
    ) -> DbResult<Return> {
        let mut tx = self.pool.begin().await?;
        let mut record = fetch_return(&mut tx, id).await?;
        ensure_return_editable(
            &record.id,
            record.created_at,
            now,
            self.policy.return_edit_window_hours,
        )?;

        if update.reason.is_some() {
            record.reason = normalize_optional_text(update.reason.as_deref(), "reason")?;
        }

        if let Some(status) = update.status.filter(|s| *s != record.status) {
            let items = fetch_return_items(&mut tx, id).await?;
            let sign = match status {
                ReturnStatus::Cancelled => -1,
                ReturnStatus::Completed => {
                    check_returnable(&mut tx, &items).await?;
                    1
                }
            };
            shift_restored_stock(&mut tx, &items, sign, &self.policy).await?;

            debug!(return_id = %id, from = ?record.status, to = ?status, "Return status changed");
            record.status = status;
        }

        sqlx::query("UPDATE returns SET reason = ?2, status = ?3 WHERE id = ?1")
            .bind(&record.id)
            .bind(&record.reason)
            .bind(record.status)
            .execute(&mut *tx)
            .await?;

        append_change(&mut tx, ChangeEntity::Return, &record.id, ChangeOperation::Updated, &record)
            .await?;
        tx.commit().await?;

        Ok(record)
    }

    /// Deletes a return inside its edit window, taking back the units it
    /// put on the shelf.
    pub async fn delete_return(&self, id: &str, now: DateTime<Utc>) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        let record = fetch_return(&mut tx, id).await?;
        ensure_return_editable(
            &record.id,
            record.created_at,
            now,
            self.policy.return_edit_window_hours,
        )?;

        if record.status == ReturnStatus::Completed {
            let items = fetch_return_items(&mut tx, id).await?;
            shift_restored_stock(&mut tx, &items, -1, &self.policy).await?;
        }

        sqlx::query("DELETE FROM returns WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        append_change(&mut tx, ChangeEntity::Return, id, ChangeOperation::Deleted, &record).await?;
        tx.commit().await?;

        info!(return_id = %id, "Return deleted");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Duration;
    use shade_core::{
        CoreError, Money, NewColor, NewProduct, NewReturnItem, NewSale, NewSaleItem, ReturnType,
        SaleDetail,
    };

    struct Fixture {
        db: Database,
        color: String,
        sale: SaleDetail,
    }

    async fn setup() -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = db.catalog();
        let product = catalog
            .create_product(NewProduct {
                company: "Jotun".to_string(),
                product_name: "Fenomastic".to_string(),
            })
            .await
            .unwrap();
        let variant = catalog
            .create_variant(shade_core::NewVariant {
                product_id: product.id,
                packing_size: "4L".to_string(),
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
        let sale = db
            .sales()
            .create_sale(NewSale {
                customer_name: "Sara".to_string(),
                customer_phone: "0345".to_string(),
                amount_paid: Money::zero(),
                due_date: None,
                notes: None,
                items: vec![NewSaleItem {
                    color_id: color.id.clone(),
                    quantity: 5,
                    rate: Money::from_major(100),
                }],
            })
            .await
            .unwrap();
        Fixture {
            db,
            color: color.id,
            sale,
        }
    }

    impl Fixture {
        fn line_return(&self, quantity: i64, restore: bool) -> NewReturn {
            NewReturn {
                sale_id: Some(self.sale.sale.id.clone()),
                customer_name: "Sara".to_string(),
                customer_phone: "0345".to_string(),
                return_type: ReturnType::Item,
                reason: Some("wrong shade".to_string()),
                items: vec![NewReturnItem {
                    color_id: self.color.clone(),
                    sale_item_id: Some(self.sale.items[0].id.clone()),
                    quantity,
                    rate: Money::from_major(100),
                    stock_restored: restore,
                }],
            }
        }

        async fn stock(&self) -> i64 {
            self.db.catalog().get_color(&self.color).await.unwrap().stock_quantity
        }
    }

    #[tokio::test]
    async fn test_return_restores_stock_only() {
        let fx = setup().await;
        assert_eq!(fx.stock().await, 45);

        let detail = fx.db.returns().create_return(fx.line_return(2, true)).await.unwrap();
        assert_eq!(detail.record.total_refund, Money::from_major(200));
        assert_eq!(detail.record.status, ReturnStatus::Completed);
        assert_eq!(fx.stock().await, 47);

        // The sale itself is untouched
        let sale = fx.db.sales().get_sale(&fx.sale.sale.id).await.unwrap().sale;
        assert_eq!(sale, fx.sale.sale);

        assert_eq!(fx.db.returns().get_return(&detail.record.id).await.unwrap(), detail);
    }

    #[tokio::test]
    async fn test_return_without_restock() {
        let fx = setup().await;
        fx.db.returns().create_return(fx.line_return(1, false)).await.unwrap();
        assert_eq!(fx.stock().await, 45);
    }

    #[tokio::test]
    async fn test_cumulative_quantity_is_capped() {
        let fx = setup().await;
        let repo = fx.db.returns();
        repo.create_return(fx.line_return(3, true)).await.unwrap();

        let err = repo.create_return(fx.line_return(3, true)).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(fx.stock().await, 48);

        // Two lines of one request count together
        let mut req = fx.line_return(1, true);
        req.items.push(req.items[0].clone());
        req.items.push(req.items[0].clone());
        assert!(repo.create_return(req).await.unwrap_err().is_validation());

        repo.create_return(fx.line_return(2, true)).await.unwrap();
        assert_eq!(fx.stock().await, 50);
    }

    #[tokio::test]
    async fn test_reference_checks() {
        let fx = setup().await;
        let repo = fx.db.returns();

        let mut req = fx.line_return(1, true);
        req.sale_id = Some("missing".to_string());
        assert!(repo.create_return(req).await.unwrap_err().is_not_found());

        let mut req = fx.line_return(1, true);
        req.sale_id = None;
        assert!(repo.create_return(req).await.unwrap_err().is_inconsistent_state());

        let other = fx
            .db
            .sales()
            .create_manual_balance(shade_core::NewManualBalance {
                customer_name: "Sara".to_string(),
                customer_phone: "0345".to_string(),
                total_amount: Money::from_major(10),
                due_date: None,
                notes: None,
            })
            .await
            .unwrap();
        let mut req = fx.line_return(1, true);
        req.sale_id = Some(other.id);
        assert!(repo.create_return(req).await.unwrap_err().is_inconsistent_state());

        assert_eq!(fx.stock().await, 45);
    }

    #[tokio::test]
    async fn test_quick_return() {
        let fx = setup().await;
        let detail = fx
            .db
            .returns()
            .create_quick_return(QuickReturn {
                customer_name: "Walk-in".to_string(),
                customer_phone: "0000".to_string(),
                color_id: fx.color.clone(),
                quantity: 4,
                rate: Money::from_major(90),
                reason: None,
                restore_stock: true,
            })
            .await
            .unwrap();

        assert_eq!(detail.record.sale_id, None);
        assert_eq!(detail.record.return_type, ReturnType::Item);
        assert_eq!(detail.record.total_refund, Money::from_major(360));
        assert_eq!(fx.stock().await, 49);

        let err = fx
            .db
            .returns()
            .create_quick_return(QuickReturn {
                customer_name: "Walk-in".to_string(),
                customer_phone: "0000".to_string(),
                color_id: "missing".to_string(),
                quantity: 1,
                rate: Money::from_major(90),
                reason: None,
                restore_stock: false,
            })
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_edit_window() {
        let fx = setup().await;
        let repo = fx.db.returns();
        let detail = repo.create_return(fx.line_return(2, true)).await.unwrap();
        let id = detail.record.id.clone();
        let created = detail.record.created_at;

        let window = repo.edit_window(&id, created + Duration::minutes(90)).await.unwrap();
        assert!(window.allowed);
        assert_eq!(window.hours_remaining, 11);

        let late = created + Duration::hours(13);
        assert!(!repo.edit_window(&id, late).await.unwrap().allowed);

        let err = repo
            .update_return(
                &id,
                ReturnUpdate {
                    reason: Some("changed mind".to_string()),
                    status: None,
                },
                late,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::EditWindowExpired { window_hours: 12, .. })));

        assert!(matches!(
            repo.delete_return(&id, late).await.unwrap_err(),
            DbError::Core(CoreError::EditWindowExpired { .. })
        ));
        assert_eq!(fx.stock().await, 47);
    }

    #[tokio::test]
    async fn test_cancel_and_delete_reverse_stock() {
        let fx = setup().await;
        let repo = fx.db.returns();
        let detail = repo.create_return(fx.line_return(2, true)).await.unwrap();
        let id = detail.record.id.clone();
        let now = detail.record.created_at;
        assert_eq!(fx.stock().await, 47);

        let cancelled = repo
            .update_return(
                &id,
                ReturnUpdate {
                    reason: None,
                    status: Some(ReturnStatus::Cancelled),
                },
                now,
            )
            .await
            .unwrap();
        assert_eq!(cancelled.status, ReturnStatus::Cancelled);
        assert_eq!(cancelled.reason.as_deref(), Some("wrong shade"));
        assert_eq!(fx.stock().await, 45);

        // Cancelled lines no longer count toward the returned quantity
        repo.create_return(fx.line_return(5, false)).await.unwrap();

        // Deleting a cancelled return leaves stock alone
        repo.delete_return(&id, now).await.unwrap();
        assert_eq!(fx.stock().await, 45);
        assert!(repo.get_return(&id).await.unwrap_err().is_not_found());

        let detail = repo
            .create_quick_return(QuickReturn {
                customer_name: "Walk-in".to_string(),
                customer_phone: "0000".to_string(),
                color_id: fx.color.clone(),
                quantity: 3,
                rate: Money::from_major(100),
                reason: None,
                restore_stock: true,
            })
            .await
            .unwrap();
        assert_eq!(fx.stock().await, 48);
        repo.delete_return(&detail.record.id, detail.record.created_at).await.unwrap();
        assert_eq!(fx.stock().await, 45);
    }

    #[tokio::test]
    async fn test_recompleting_respects_sold_quantity() {
        let fx = setup().await;
        let repo = fx.db.returns();
        let status = |status| ReturnUpdate {
            reason: None,
            status: Some(status),
        };

        let first = repo.create_return(fx.line_return(5, true)).await.unwrap().record;
        repo.update_return(&first.id, status(ReturnStatus::Cancelled), first.created_at)
            .await
            .unwrap();
        let second = repo.create_return(fx.line_return(5, true)).await.unwrap().record;
        assert_eq!(fx.stock().await, 50);

        // All 5 sold units are already back through the second return
        let err = repo
            .update_return(&first.id, status(ReturnStatus::Completed), first.created_at)
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(fx.stock().await, 50);
        let unchanged = repo.get_return(&first.id).await.unwrap().record;
        assert_eq!(unchanged.status, ReturnStatus::Cancelled);

        repo.update_return(&second.id, status(ReturnStatus::Cancelled), second.created_at)
            .await
            .unwrap();
        let restored = repo
            .update_return(&first.id, status(ReturnStatus::Completed), first.created_at)
            .await
            .unwrap();
        assert_eq!(restored.status, ReturnStatus::Completed);
        assert_eq!(fx.stock().await, 50);
    }

    #[tokio::test]
    async fn test_list_returns() {
        let fx = setup().await;
        let repo = fx.db.returns();
        repo.create_return(fx.line_return(1, true)).await.unwrap();
        repo.create_quick_return(QuickReturn {
            customer_name: "Walk-in".to_string(),
            customer_phone: "0000".to_string(),
            color_id: fx.color.clone(),
            quantity: 1,
            rate: Money::from_major(100),
            reason: None,
            restore_stock: true,
        })
        .await
        .unwrap();

        let by_sale = repo
            .list_returns(ReturnFilter {
                sale_id: Some(fx.sale.sale.id.clone()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_sale.len(), 1);

        let by_phone = repo
            .list_returns(ReturnFilter {
                customer_phone: Some("0000".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_phone.len(), 1);
        assert_eq!(by_phone[0].sale_id, None);

        assert_eq!(repo.list_returns(ReturnFilter::default()).await.unwrap().len(), 2);
    }
}

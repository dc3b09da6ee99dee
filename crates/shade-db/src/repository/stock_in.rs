//! # Stock-in Repository
//!
//! Inventory increases and their history.
//!
//! ## Stock-in Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    record_stock_in(color, 20)                           │
//! │                                                                         │
//! │  BEGIN                                                                 │
//! │   ├── read colors.stock_quantity          → 30  (previous_stock)       │
//! │   ├── UPDATE colors SET stock_quantity    = 50  (new_stock)            │
//! │   ├── INSERT stock_in_history (20, 30, 50, date)                       │
//! │   └── change feed: color updated, stock_in created                     │
//! │  COMMIT                                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Editing History
//! Changing the quantity of a past entry writes
//! `previous_stock + new_quantity` onto the color. Sales made after the
//! entry are not taken into account; when the color has moved since, the
//! difference is logged and the recorded level wins.

use chrono::Utc;
use shade_core::ledger::stock_in_levels;
use shade_core::validation::{normalize_optional_text, parse_date, validate_quantity, validate_search_query};
use shade_core::{
    ChangeEntity, ChangeOperation, LedgerPolicy, NewStockIn, StockInDetail, StockInFilter,
    StockInHistory, StockInUpdate,
};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::catalog::{adjust_stock, escape_like, fetch_color, set_stock};
use crate::repository::change_feed::append_change;
use crate::repository::new_id;

const STOCK_IN_COLUMNS: &str =
    "id, color_id, quantity, previous_stock, new_stock, notes, stock_in_date, created_at";

/// Repository for stock-in history.
#[derive(Debug, Clone)]
pub struct StockInRepository {
    pool: SqlitePool,
    policy: LedgerPolicy,
}

async fn fetch_stock_in(conn: &mut SqliteConnection, id: &str) -> DbResult<StockInHistory> {
    let sql = format!("SELECT {} FROM stock_in_history WHERE id = ?1", STOCK_IN_COLUMNS);
    sqlx::query_as::<_, StockInHistory>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("StockIn", id))
}

impl StockInRepository {
    /// Creates a new StockInRepository.
    pub fn new(pool: SqlitePool, policy: LedgerPolicy) -> Self {
        StockInRepository { pool, policy }
    }

    /// Adds `quantity` units to a color and records the entry.
    ///
    /// ## Arguments
    /// * `req.stock_in_date` - `YYYY-MM-DD`, today when absent
    ///
    /// ## Errors
    /// * `Validation` - quantity below 1 or a malformed date
    /// * `NotFound` - unknown color
    pub async fn record_stock_in(&self, req: NewStockIn) -> DbResult<StockInHistory> {
        validate_quantity(req.quantity)?;
        let stock_in_date = match req.stock_in_date.as_deref() {
            Some(date) => parse_date(date, "stock_in_date")?,
            None => Utc::now().date_naive(),
        };
        let notes = normalize_optional_text(req.notes.as_deref(), "notes")?;

        let mut tx = self.pool.begin().await?;

        let color = fetch_color(&mut tx, &req.color_id).await?;
        let (previous_stock, new_stock) = stock_in_levels(color.stock_quantity, req.quantity)?;
        set_stock(&mut tx, &color.id, new_stock).await?;

        let entry = StockInHistory {
            id: new_id(),
            color_id: color.id,
            quantity: req.quantity,
            previous_stock,
            new_stock,
            notes,
            stock_in_date,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO stock_in_history (
                id, color_id, quantity, previous_stock, new_stock,
                notes, stock_in_date, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.color_id)
        .bind(entry.quantity)
        .bind(entry.previous_stock)
        .bind(entry.new_stock)
        .bind(&entry.notes)
        .bind(entry.stock_in_date)
        .bind(entry.created_at)
        .execute(&mut *tx)
        .await?;

        append_change(&mut tx, ChangeEntity::StockIn, &entry.id, ChangeOperation::Created, &entry)
            .await?;
        tx.commit().await?;

        info!(
            color_id = %entry.color_id,
            quantity = entry.quantity,
            previous_stock,
            new_stock,
            "Stock-in recorded"
        );
        Ok(entry)
    }

    pub async fn get_stock_in(&self, id: &str) -> DbResult<StockInHistory> {
        let mut conn = self.pool.acquire().await?;
        fetch_stock_in(&mut conn, id).await
    }

    /// Stock-in history joined with catalog names, newest first.
    pub async fn list_stock_in(&self, filter: StockInFilter) -> DbResult<Vec<StockInDetail>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            r#"
            SELECT
                h.id, h.color_id, h.quantity, h.previous_stock, h.new_stock,
                h.notes, h.stock_in_date, h.created_at,
                c.color_name, c.color_code, v.packing_size, p.product_name, p.company
            FROM stock_in_history h
            JOIN colors c ON c.id = h.color_id
            JOIN variants v ON v.id = c.variant_id
            JOIN products p ON p.id = v.product_id
            WHERE 1 = 1
            "#,
        );

        if let Some(from) = filter.from {
            qb.push(" AND h.stock_in_date >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            qb.push(" AND h.stock_in_date <= ").push_bind(to);
        }
        if let Some(company) = filter.company.as_deref() {
            let company = validate_search_query(company)?;
            if !company.is_empty() {
                qb.push(" AND p.company = ").push_bind(company);
            }
        }
        if let Some(product) = filter.product_name.as_deref() {
            let product = validate_search_query(product)?;
            if !product.is_empty() {
                qb.push(" AND p.product_name = ").push_bind(product);
            }
        }
        if let Some(query) = filter.color_query.as_deref() {
            let query = validate_search_query(query)?;
            if !query.is_empty() {
                let pattern = format!("%{}%", escape_like(&query));
                qb.push(" AND (c.color_code LIKE ")
                    .push_bind(pattern.clone())
                    .push(" ESCAPE '\\' OR c.color_name LIKE ")
                    .push_bind(pattern)
                    .push(" ESCAPE '\\')");
            }
        }

        qb.push(" ORDER BY h.stock_in_date DESC, h.created_at DESC, h.rowid DESC");
        if let Some(limit) = filter.limit {
            qb.push(" LIMIT ").push_bind(limit.max(0));
        }

        let rows = qb.build_query_as::<StockInDetail>().fetch_all(&self.pool).await?;

        debug!(count = rows.len(), "Listed stock-in history");
        Ok(rows)
    }

    /// Edits a past entry.
    ///
    /// A quantity change rewrites `new_stock` as `previous_stock +
    /// quantity` and writes that level onto the color.
    pub async fn update_stock_in(&self, id: &str, update: StockInUpdate) -> DbResult<StockInHistory> {
        let mut tx = self.pool.begin().await?;
        let mut entry = fetch_stock_in(&mut tx, id).await?;

        if let Some(date) = update.stock_in_date.as_deref() {
            entry.stock_in_date = parse_date(date, "stock_in_date")?;
        }
        if update.notes.is_some() {
            entry.notes = normalize_optional_text(update.notes.as_deref(), "notes")?;
        }

        if let Some(quantity) = update.quantity.filter(|q| *q != entry.quantity) {
            let (_, new_stock) = stock_in_levels(entry.previous_stock, quantity)?;

            let color = fetch_color(&mut tx, &entry.color_id).await?;
            if color.stock_quantity != entry.new_stock {
                warn!(
                    stock_in_id = %id,
                    color_id = %entry.color_id,
                    current_stock = color.stock_quantity,
                    recorded_stock = entry.new_stock,
                    written_stock = new_stock,
                    "Color stock moved since this stock-in; overwriting with recorded level"
                );
            }
            set_stock(&mut tx, &entry.color_id, new_stock).await?;

            entry.quantity = quantity;
            entry.new_stock = new_stock;
        }

        sqlx::query(
            r#"
            UPDATE stock_in_history
            SET quantity = ?2, new_stock = ?3, notes = ?4, stock_in_date = ?5
            WHERE id = ?1
            "#,
        )
        .bind(&entry.id)
        .bind(entry.quantity)
        .bind(entry.new_stock)
        .bind(&entry.notes)
        .bind(entry.stock_in_date)
        .execute(&mut *tx)
        .await?;

        append_change(&mut tx, ChangeEntity::StockIn, &entry.id, ChangeOperation::Updated, &entry)
            .await?;
        tx.commit().await?;

        Ok(entry)
    }

    /// Deletes an entry and takes its quantity back off the color.
    pub async fn delete_stock_in(&self, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        let entry = fetch_stock_in(&mut tx, id).await?;

        adjust_stock(&mut tx, &entry.color_id, -entry.quantity, &self.policy).await?;

        sqlx::query("DELETE FROM stock_in_history WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        append_change(&mut tx, ChangeEntity::StockIn, id, ChangeOperation::Deleted, &entry).await?;
        tx.commit().await?;

        info!(stock_in_id = %id, color_id = %entry.color_id, quantity = entry.quantity, "Stock-in deleted");
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
    use chrono::NaiveDate;
    use shade_core::{Money, NewColor, NewProduct, NewVariant};

    async fn setup() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = db.catalog();
        let product = catalog
            .create_product(NewProduct {
                company: "Berger".to_string(),
                product_name: "Weathercoat".to_string(),
            })
            .await
            .unwrap();
        let variant = catalog
            .create_variant(NewVariant {
                product_id: product.id,
                packing_size: "1L".to_string(),
                rate: Money::from_major(1450),
            })
            .await
            .unwrap();
        let color = catalog
            .create_color(NewColor {
                variant_id: variant.id,
                color_name: "Ivory".to_string(),
                color_code: "IV-01".to_string(),
                stock_quantity: 30,
                rate_override: None,
            })
            .await
            .unwrap();
        (db, color.id)
    }

    fn stock_in(color_id: &str, quantity: i64, date: Option<&str>) -> NewStockIn {
        NewStockIn {
            color_id: color_id.to_string(),
            quantity,
            notes: None,
            stock_in_date: date.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_record_stock_in() {
        let (db, color_id) = setup().await;

        let entry = db
            .stock_in()
            .record_stock_in(stock_in(&color_id, 20, Some("2024-05-02")))
            .await
            .unwrap();

        assert_eq!(entry.previous_stock, 30);
        assert_eq!(entry.new_stock, 50);
        assert_eq!(entry.stock_in_date, NaiveDate::from_ymd_opt(2024, 5, 2).unwrap());
        assert_eq!(db.catalog().get_color(&color_id).await.unwrap().stock_quantity, 50);
        assert_eq!(db.stock_in().get_stock_in(&entry.id).await.unwrap(), entry);
    }

    #[tokio::test]
    async fn test_record_stock_in_rejects_bad_input() {
        let (db, color_id) = setup().await;
        let repo = db.stock_in();

        assert!(repo.record_stock_in(stock_in(&color_id, 0, None)).await.unwrap_err().is_validation());
        assert!(repo
            .record_stock_in(stock_in(&color_id, 5, Some("02/05/2024")))
            .await
            .unwrap_err()
            .is_validation());
        assert!(repo.record_stock_in(stock_in("missing", 5, None)).await.unwrap_err().is_not_found());

        // Nothing moved
        assert_eq!(db.catalog().get_color(&color_id).await.unwrap().stock_quantity, 30);
    }

    #[tokio::test]
    async fn test_list_filters() {
        let (db, color_id) = setup().await;
        let repo = db.stock_in();
        repo.record_stock_in(stock_in(&color_id, 5, Some("2024-01-10"))).await.unwrap();
        repo.record_stock_in(stock_in(&color_id, 7, Some("2024-02-10"))).await.unwrap();
        repo.record_stock_in(stock_in(&color_id, 9, Some("2024-03-10"))).await.unwrap();

        let all = repo.list_stock_in(StockInFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].quantity, 9);
        assert_eq!(all[0].company, "Berger");
        assert_eq!(all[0].color_code, "IV-01");

        let february = repo
            .list_stock_in(StockInFilter {
                from: NaiveDate::from_ymd_opt(2024, 2, 1),
                to: NaiveDate::from_ymd_opt(2024, 2, 29),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(february.len(), 1);
        assert_eq!(february[0].quantity, 7);

        let by_color = repo
            .list_stock_in(StockInFilter {
                color_query: Some("ivo".to_string()),
                company: Some("Berger".to_string()),
                limit: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_color.len(), 2);

        let other_company = repo
            .list_stock_in(StockInFilter {
                company: Some("Dulux".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(other_company.is_empty());

        // Wildcards in the query match literally
        for query in ["%", "I_-01"] {
            let hits = repo
                .list_stock_in(StockInFilter {
                    color_query: Some(query.to_string()),
                    ..Default::default()
                })
                .await
                .unwrap();
            assert!(hits.is_empty(), "{} matched {} rows", query, hits.len());
        }
    }

    #[tokio::test]
    async fn test_update_quantity_writes_recorded_level() {
        let (db, color_id) = setup().await;
        let entry = db
            .stock_in()
            .record_stock_in(stock_in(&color_id, 20, None))
            .await
            .unwrap();

        let updated = db
            .stock_in()
            .update_stock_in(
                &entry.id,
                StockInUpdate {
                    quantity: Some(25),
                    notes: Some("recount".to_string()),
                    stock_in_date: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.new_stock, 55);
        assert_eq!(updated.previous_stock, 30);
        assert_eq!(updated.notes.as_deref(), Some("recount"));
        assert_eq!(db.catalog().get_color(&color_id).await.unwrap().stock_quantity, 55);
    }

    #[tokio::test]
    async fn test_delete_removes_quantity() {
        let (db, color_id) = setup().await;
        let entry = db
            .stock_in()
            .record_stock_in(stock_in(&color_id, 20, None))
            .await
            .unwrap();

        db.stock_in().delete_stock_in(&entry.id).await.unwrap();

        assert_eq!(db.catalog().get_color(&color_id).await.unwrap().stock_quantity, 30);
        assert!(db.stock_in().get_stock_in(&entry.id).await.unwrap_err().is_not_found());
        assert!(db.stock_in().delete_stock_in(&entry.id).await.unwrap_err().is_not_found());
    }
}

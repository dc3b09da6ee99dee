//! # Catalog Repository
//!
//! Database operations for the three-level paint catalog.
//!
//! ## Catalog Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Product → Variant → Color                            │
//! │                                                                         │
//! │  Product  "Weathershield" (company: Dulux)                             │
//! │    ├── Variant "1L"     rate 1450.00                                   │
//! │    │     ├── Color "Ivory"      IV-01   stock 24                       │
//! │    │     └── Color "Sky Blue"   SB-14   stock 6   override 1520.00     │
//! │    └── Variant "4L"     rate 5400.00                                   │
//! │          └── Color "Ivory"      IV-01   stock 9                        │
//! │                                                                         │
//! │  Deleting a level removes everything under it (FK cascade).            │
//! │  No stock reconciliation happens on delete; a color that sale or       │
//! │  return lines still reference cannot be deleted (FK restrict).         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Stock
//! `colors.stock_quantity` is the single source of truth for on-hand units.
//! Everything that moves stock goes through [`adjust_stock`] on the
//! caller's transaction, except the admin overwrite
//! [`CatalogRepository::update_stock`].

use chrono::Utc;
use shade_core::ledger::check_stock;
use shade_core::validation::{
    normalize_optional_text, validate_rate, validate_required_text, validate_search_query,
    validate_stock_level,
};
use shade_core::{
    ChangeEntity, ChangeOperation, Color, ColorUpdate, LedgerPolicy, Money, NewColor, NewProduct,
    NewStockIn, NewVariant, Product, ProductUpdate, StockInHistory, Variant, VariantUpdate,
};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::change_feed::append_change;
use crate::repository::new_id;
use crate::repository::stock_in::StockInRepository;

const PRODUCT_COLUMNS: &str = "id, company, product_name, created_at";
const VARIANT_COLUMNS: &str = "id, product_id, packing_size, rate, created_at";
const COLOR_COLUMNS: &str =
    "id, variant_id, color_name, color_code, stock_quantity, rate_override, created_at";

// =============================================================================
// Connection Helpers
// =============================================================================

pub(crate) async fn fetch_product(conn: &mut SqliteConnection, id: &str) -> DbResult<Product> {
    let sql = format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS);
    sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Product", id))
}

pub(crate) async fn fetch_variant(conn: &mut SqliteConnection, id: &str) -> DbResult<Variant> {
    let sql = format!("SELECT {} FROM variants WHERE id = ?1", VARIANT_COLUMNS);
    sqlx::query_as::<_, Variant>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Variant", id))
}

pub(crate) async fn fetch_color(conn: &mut SqliteConnection, id: &str) -> DbResult<Color> {
    let sql = format!("SELECT {} FROM colors WHERE id = ?1", COLOR_COLUMNS);
    sqlx::query_as::<_, Color>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Color", id))
}

/// Moves a color's stock by `delta` units (negative takes units off the
/// shelf) and records the change.
///
/// Fails with `NotFound` for an unknown color, and with
/// `InsufficientStock` when the policy forbids going below zero.
pub(crate) async fn adjust_stock(
    conn: &mut SqliteConnection,
    color_id: &str,
    delta: i64,
    policy: &LedgerPolicy,
) -> DbResult<Color> {
    let color = fetch_color(conn, color_id).await?;
    if delta == 0 {
        return Ok(color);
    }

    let draw = check_stock(color_id, color.stock_quantity, -delta, policy)?;
    if draw.oversold {
        warn!(
            color_id = %color_id,
            available = color.stock_quantity,
            requested = -delta,
            new_stock = draw.new_stock,
            "Stock going below zero"
        );
    }

    debug!(color_id = %color_id, delta, new_stock = draw.new_stock, "Adjusting stock");

    sqlx::query("UPDATE colors SET stock_quantity = ?2 WHERE id = ?1")
        .bind(color_id)
        .bind(draw.new_stock)
        .execute(&mut *conn)
        .await?;

    let color = Color {
        stock_quantity: draw.new_stock,
        ..color
    };
    append_change(conn, ChangeEntity::Color, &color.id, ChangeOperation::Updated, &color).await?;

    Ok(color)
}

/// Writes an absolute stock level onto a color and records the change.
pub(crate) async fn set_stock(
    conn: &mut SqliteConnection,
    color_id: &str,
    stock_quantity: i64,
) -> DbResult<Color> {
    let color = fetch_color(conn, color_id).await?;

    sqlx::query("UPDATE colors SET stock_quantity = ?2 WHERE id = ?1")
        .bind(color_id)
        .bind(stock_quantity)
        .execute(&mut *conn)
        .await?;

    let color = Color {
        stock_quantity,
        ..color
    };
    append_change(conn, ChangeEntity::Color, &color.id, ChangeOperation::Updated, &color).await?;

    Ok(color)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for catalog database operations.
///
/// ## Usage
/// ```rust,ignore
/// let catalog = db.catalog();
///
/// let product = catalog.create_product(NewProduct { .. }).await?;
/// let variant = catalog.create_variant(NewVariant { product_id: product.id, .. }).await?;
/// let colors = catalog.search_colors("IV-", 20).await?;
/// ```
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
    policy: LedgerPolicy,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool, policy: LedgerPolicy) -> Self {
        CatalogRepository { pool, policy }
    }

    // =========================================================================
    // Products
    // =========================================================================

    pub async fn create_product(&self, req: NewProduct) -> DbResult<Product> {
        let product = Product {
            id: new_id(),
            company: validate_required_text(&req.company, "company")?,
            product_name: validate_required_text(&req.product_name, "product_name")?,
            created_at: Utc::now(),
        };

        debug!(id = %product.id, company = %product.company, "Creating product");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO products (id, company, product_name, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&product.id)
        .bind(&product.company)
        .bind(&product.product_name)
        .bind(product.created_at)
        .execute(&mut *tx)
        .await?;

        append_change(&mut tx, ChangeEntity::Product, &product.id, ChangeOperation::Created, &product)
            .await?;
        tx.commit().await?;

        Ok(product)
    }

    pub async fn get_product(&self, id: &str) -> DbResult<Product> {
        let mut conn = self.pool.acquire().await?;
        fetch_product(&mut conn, id).await
    }

    /// All products, by company then name.
    pub async fn list_products(&self) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {} FROM products ORDER BY company, product_name",
            PRODUCT_COLUMNS
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    pub async fn update_product(&self, id: &str, update: ProductUpdate) -> DbResult<Product> {
        let mut tx = self.pool.begin().await?;
        let mut product = fetch_product(&mut tx, id).await?;

        if let Some(company) = update.company {
            product.company = validate_required_text(&company, "company")?;
        }
        if let Some(name) = update.product_name {
            product.product_name = validate_required_text(&name, "product_name")?;
        }

        sqlx::query("UPDATE products SET company = ?2, product_name = ?3 WHERE id = ?1")
            .bind(&product.id)
            .bind(&product.company)
            .bind(&product.product_name)
            .execute(&mut *tx)
            .await?;

        append_change(&mut tx, ChangeEntity::Product, &product.id, ChangeOperation::Updated, &product)
            .await?;
        tx.commit().await?;

        Ok(product)
    }

    /// Deletes a product with its variants and colors.
    pub async fn delete_product(&self, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        let product = fetch_product(&mut tx, id).await?;

        sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        append_change(&mut tx, ChangeEntity::Product, id, ChangeOperation::Deleted, &product).await?;
        tx.commit().await?;

        info!(product_id = %id, "Product deleted");
        Ok(())
    }

    // =========================================================================
    // Variants
    // =========================================================================

    pub async fn create_variant(&self, req: NewVariant) -> DbResult<Variant> {
        validate_rate(req.rate)?;
        let packing_size = validate_required_text(&req.packing_size, "packing_size")?;

        let mut tx = self.pool.begin().await?;
        fetch_product(&mut tx, &req.product_id).await?;

        let variant = Variant {
            id: new_id(),
            product_id: req.product_id,
            packing_size,
            rate: req.rate,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO variants (id, product_id, packing_size, rate, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&variant.id)
        .bind(&variant.product_id)
        .bind(&variant.packing_size)
        .bind(variant.rate)
        .bind(variant.created_at)
        .execute(&mut *tx)
        .await?;

        append_change(&mut tx, ChangeEntity::Variant, &variant.id, ChangeOperation::Created, &variant)
            .await?;
        tx.commit().await?;

        Ok(variant)
    }

    pub async fn get_variant(&self, id: &str) -> DbResult<Variant> {
        let mut conn = self.pool.acquire().await?;
        fetch_variant(&mut conn, id).await
    }

    /// Variants of one product, in creation order.
    pub async fn list_variants(&self, product_id: &str) -> DbResult<Vec<Variant>> {
        let sql = format!(
            "SELECT {} FROM variants WHERE product_id = ?1 ORDER BY created_at, rowid",
            VARIANT_COLUMNS
        );
        let variants = sqlx::query_as::<_, Variant>(&sql)
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(variants)
    }

    pub async fn update_variant(&self, id: &str, update: VariantUpdate) -> DbResult<Variant> {
        let mut tx = self.pool.begin().await?;
        let mut variant = fetch_variant(&mut tx, id).await?;

        if let Some(size) = update.packing_size {
            variant.packing_size = validate_required_text(&size, "packing_size")?;
        }
        if let Some(rate) = update.rate {
            validate_rate(rate)?;
            variant.rate = rate;
        }

        sqlx::query("UPDATE variants SET packing_size = ?2, rate = ?3 WHERE id = ?1")
            .bind(&variant.id)
            .bind(&variant.packing_size)
            .bind(variant.rate)
            .execute(&mut *tx)
            .await?;

        append_change(&mut tx, ChangeEntity::Variant, &variant.id, ChangeOperation::Updated, &variant)
            .await?;
        tx.commit().await?;

        Ok(variant)
    }

    /// Changes the default rate of a variant. Existing sale lines keep the
    /// rate they were sold at.
    pub async fn update_rate(&self, variant_id: &str, rate: Money) -> DbResult<Variant> {
        self.update_variant(
            variant_id,
            VariantUpdate {
                packing_size: None,
                rate: Some(rate),
            },
        )
        .await
    }

    pub async fn delete_variant(&self, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        let variant = fetch_variant(&mut tx, id).await?;

        sqlx::query("DELETE FROM variants WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        append_change(&mut tx, ChangeEntity::Variant, id, ChangeOperation::Deleted, &variant).await?;
        tx.commit().await?;

        Ok(())
    }

    // =========================================================================
    // Colors
    // =========================================================================

    pub async fn create_color(&self, req: NewColor) -> DbResult<Color> {
        let color_name = validate_required_text(&req.color_name, "color_name")?;
        let color_code = validate_required_text(&req.color_code, "color_code")?;
        validate_stock_level(req.stock_quantity, false)?;
        if let Some(rate) = req.rate_override {
            validate_rate(rate)?;
        }

        let mut tx = self.pool.begin().await?;
        fetch_variant(&mut tx, &req.variant_id).await?;

        let color = Color {
            id: new_id(),
            variant_id: req.variant_id,
            color_name,
            color_code,
            stock_quantity: req.stock_quantity,
            rate_override: req.rate_override,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO colors (
                id, variant_id, color_name, color_code,
                stock_quantity, rate_override, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&color.id)
        .bind(&color.variant_id)
        .bind(&color.color_name)
        .bind(&color.color_code)
        .bind(color.stock_quantity)
        .bind(color.rate_override)
        .bind(color.created_at)
        .execute(&mut *tx)
        .await?;

        append_change(&mut tx, ChangeEntity::Color, &color.id, ChangeOperation::Created, &color).await?;
        tx.commit().await?;

        Ok(color)
    }

    pub async fn get_color(&self, id: &str) -> DbResult<Color> {
        let mut conn = self.pool.acquire().await?;
        fetch_color(&mut conn, id).await
    }

    /// Colors of one variant, by color code.
    pub async fn list_colors(&self, variant_id: &str) -> DbResult<Vec<Color>> {
        let sql = format!(
            "SELECT {} FROM colors WHERE variant_id = ?1 ORDER BY color_code, color_name",
            COLOR_COLUMNS
        );
        let colors = sqlx::query_as::<_, Color>(&sql)
            .bind(variant_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(colors)
    }

    /// Finds colors by code or name (case-insensitive substring).
    ///
    /// ## Arguments
    /// * `query` - Search term; empty returns the first `limit` colors
    /// * `limit` - Maximum results to return
    ///
    /// Exact code matches sort first, so typing a full shade code at the
    /// counter puts that shade on top.
    pub async fn search_colors(&self, query: &str, limit: u32) -> DbResult<Vec<Color>> {
        let query = validate_search_query(query)?;

        debug!(query = %query, limit, "Searching colors");

        let pattern = format!("%{}%", escape_like(&query));
        let sql = format!(
            r#"
            SELECT {} FROM colors
            WHERE color_code LIKE ?1 ESCAPE '\' OR color_name LIKE ?1 ESCAPE '\'
            ORDER BY (color_code = ?2 COLLATE NOCASE) DESC, color_code, color_name
            LIMIT ?3
            "#,
            COLOR_COLUMNS
        );

        let colors = sqlx::query_as::<_, Color>(&sql)
            .bind(pattern)
            .bind(&query)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = colors.len(), "Color search returned");
        Ok(colors)
    }

    pub async fn update_color(&self, id: &str, update: ColorUpdate) -> DbResult<Color> {
        let mut tx = self.pool.begin().await?;
        let mut color = fetch_color(&mut tx, id).await?;

        if let Some(name) = update.color_name {
            color.color_name = validate_required_text(&name, "color_name")?;
        }
        if let Some(code) = update.color_code {
            color.color_code = validate_required_text(&code, "color_code")?;
        }
        if update.clear_rate_override {
            color.rate_override = None;
        } else if let Some(rate) = update.rate_override {
            validate_rate(rate)?;
            color.rate_override = Some(rate);
        }

        sqlx::query(
            "UPDATE colors SET color_name = ?2, color_code = ?3, rate_override = ?4 WHERE id = ?1",
        )
        .bind(&color.id)
        .bind(&color.color_name)
        .bind(&color.color_code)
        .bind(color.rate_override)
        .execute(&mut *tx)
        .await?;

        append_change(&mut tx, ChangeEntity::Color, &color.id, ChangeOperation::Updated, &color).await?;
        tx.commit().await?;

        Ok(color)
    }

    /// Overwrites a color's stock level (admin correction). No history row
    /// is written.
    pub async fn update_stock(&self, color_id: &str, stock_quantity: i64) -> DbResult<Color> {
        validate_stock_level(stock_quantity, self.policy.allow_negative_stock)?;

        let mut tx = self.pool.begin().await?;
        let before = fetch_color(&mut tx, color_id).await?.stock_quantity;
        let color = set_stock(&mut tx, color_id, stock_quantity).await?;
        tx.commit().await?;

        info!(
            color_id = %color_id,
            before,
            after = stock_quantity,
            "Stock overwritten"
        );
        Ok(color)
    }

    pub async fn delete_color(&self, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        let color = fetch_color(&mut tx, id).await?;

        sqlx::query("DELETE FROM colors WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        append_change(&mut tx, ChangeEntity::Color, id, ChangeOperation::Deleted, &color).await?;
        tx.commit().await?;

        Ok(())
    }

    /// Adds stock to a color and writes a history row.
    ///
    /// Same as [`StockInRepository::record_stock_in`].
    pub async fn stock_in(
        &self,
        color_id: &str,
        quantity: i64,
        notes: Option<&str>,
        stock_in_date: Option<&str>,
    ) -> DbResult<StockInHistory> {
        StockInRepository::new(self.pool.clone(), self.policy.clone())
            .record_stock_in(NewStockIn {
                color_id: color_id.to_string(),
                quantity,
                notes: normalize_optional_text(notes, "notes")?,
                stock_in_date: stock_in_date.map(str::to_string),
            })
            .await
    }
}

/// Escapes LIKE wildcards so user input matches literally.
pub(crate) fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// =============================================================================
// Unit Tests
// =============================================================================

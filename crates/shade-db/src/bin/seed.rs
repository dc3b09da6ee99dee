//! # Seed Data Generator
//!
//! Populates the ledger with a demo paint catalog for development.
//!
//! ## Usage
//! ```bash
//! # Use shade.toml / SHADE_DB_PATH
//! cargo run -p shade-db --bin seed
//!
//! # Specify database path
//! cargo run -p shade-db --bin seed -- --db ./data/ledger.db
//!
//! # Specify config file
//! cargo run -p shade-db --bin seed -- --config ./shade.toml
//! ```
//!
//! ## Generated Catalog
//! Every product gets every packing size of its line, and every size gets
//! the product's shades. Opening stock is booked through stock-in so the
//! history screen has something to show.

use std::env;
use std::path::PathBuf;

use shade_core::{Money, NewColor, NewProduct, NewStockIn, NewVariant};
use shade_db::{Database, LedgerConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// (company, product, base rate per litre in whole rupees)
const PRODUCTS: &[(&str, &str, i64)] = &[
    ("Dulux", "Weathershield", 1450),
    ("Dulux", "Supercover", 980),
    ("Berger", "Weathercoat", 1320),
    ("Berger", "Robbialac Emulsion", 890),
    ("Nippon", "Vinilex", 760),
    ("Jotun", "Fenomastic", 1150),
];

/// (packing size, litres)
const SIZES: &[(&str, i64)] = &[("1L", 1), ("4L", 4), ("Gallon", 4), ("Drum", 16)];

/// (color name, color code, opening stock)
const SHADES: &[(&str, &str, i64)] = &[
    ("Brilliant White", "BW-00", 40),
    ("Ivory", "IV-01", 25),
    ("Magnolia", "MG-07", 18),
    ("Sky Blue", "SB-14", 10),
    ("Sage Green", "SG-22", 6),
    ("Terracotta", "TC-31", 0),
];

fn print_help() {
    println!("Shade POS Seed Data Generator");
    println!();
    println!("Usage: seed [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -d, --db <PATH>      Database file path (overrides config)");
    println!("  -c, --config <PATH>  Config file (default: platform config dir)");
    println!("  -h, --help           Show this help message");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,shade=debug,sqlx=warn")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut db_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            other => warn!(arg = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    let mut config = LedgerConfig::load(config_path)?;
    if let Some(path) = db_path {
        config.database.path = path;
    }
    if let Some(parent) = config.database.path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    info!(path = %config.database.path.display(), "Seeding ledger");
    let db = Database::new(config.db_config()).await?;
    let health = db.health_check().await?;
    info!(
        schema_version = ?health.migrations.latest_version,
        pending_changes = health.pending_changes,
        "Ledger database ready"
    );

    let existing = db.catalog().list_products().await?;
    if !existing.is_empty() {
        warn!(
            products = existing.len(),
            "Database already has products, skipping seed. Delete the file to regenerate."
        );
        return Ok(());
    }

    let start = std::time::Instant::now();
    let catalog = db.catalog();
    let mut colors = 0usize;
    let mut units = 0i64;

    for (company, product_name, per_litre) in PRODUCTS {
        let product = catalog
            .create_product(NewProduct {
                company: company.to_string(),
                product_name: product_name.to_string(),
            })
            .await?;

        for (size, litres) in SIZES {
            let variant = catalog
                .create_variant(NewVariant {
                    product_id: product.id.clone(),
                    packing_size: size.to_string(),
                    rate: Money::from_major(per_litre * litres),
                })
                .await?;

            for (name, code, opening) in SHADES {
                let color = catalog
                    .create_color(NewColor {
                        variant_id: variant.id.clone(),
                        color_name: name.to_string(),
                        color_code: code.to_string(),
                        stock_quantity: 0,
                        rate_override: None,
                    })
                    .await?;
                colors += 1;

                // Bigger packs are stocked in smaller numbers
                let quantity = opening / litres;
                if quantity > 0 {
                    db.stock_in()
                        .record_stock_in(NewStockIn {
                            color_id: color.id,
                            quantity,
                            notes: Some("opening stock".to_string()),
                            stock_in_date: None,
                        })
                        .await?;
                    units += quantity;
                }
            }
        }
    }

    info!(
        products = PRODUCTS.len(),
        colors,
        units,
        elapsed = ?start.elapsed(),
        "Seed complete"
    );

    let hits = catalog.search_colors("IV-01", 50).await?;
    info!(hits = hits.len(), "Search 'IV-01'");

    Ok(())
}

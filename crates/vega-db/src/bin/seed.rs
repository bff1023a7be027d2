//! # Seed Data Generator
//!
//! Populates the database with development data: stock for every catalog
//! variant, a few registered customers with store credit, and a set of
//! promotions.
//!
//! ## Usage
//! ```bash
//! # Seed the database named in vega.toml (or the platform default)
//! cargo run -p vega-db --bin seed
//!
//! # Specify database path and stock per variant
//! cargo run -p vega-db --bin seed -- --db ./data/vega.db --stock 40
//!
//! # More logging
//! RUST_LOG=debug cargo run -p vega-db --bin seed
//! ```
//!
//! ## Generated Data
//! - Variants: `{PRODUCT}-{SIZE}` (e.g. `TEE-M`), stock N, min stock 3
//! - Customers: three, with 0 / 250.00 / 1,000.00 store credit
//! - Promotions: 10% storewide, 50.00 off purchases over 500.00, and a
//!   high-priority 20% on jeans only

use std::env;
use std::path::PathBuf;

use chrono::{Duration, Utc};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;
use vega_core::promotion::{Promotion, PromotionKind, PromotionScope};
use vega_core::Money;
use vega_db::{Database, DbConfig, PosConfig};

/// Apparel catalog: (product code, sizes).
const PRODUCTS: &[(&str, &[&str])] = &[
    ("TEE", &["S", "M", "L", "XL"]),
    ("HOODIE", &["S", "M", "L"]),
    ("JEANS", &["28", "30", "32", "34", "36"]),
    ("CAP", &["OS"]),
    ("SOCKS", &["S", "M", "L"]),
];

/// (name, store credit in cents).
const CUSTOMERS: &[(&str, i64)] = &[
    ("María López", 0),
    ("Jorge Ramírez", 25_000),
    ("Lucía Fernández", 100_000),
];

const DEFAULT_STOCK: i64 = 25;
const MIN_STOCK: i64 = 3;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,vega=debug,sqlx=warn")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut config = PosConfig::load_or_default(None);
    let mut stock = DEFAULT_STOCK;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config.database.path = PathBuf::from(&args[i + 1]);
                    i += 1;
                }
            }
            "--stock" | "-s" => {
                if i + 1 < args.len() {
                    stock = args[i + 1].parse().unwrap_or(DEFAULT_STOCK);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Vega POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>     Database file path (default: from vega.toml)");
                println!("  -s, --stock <N>     Units per variant (default: {DEFAULT_STOCK})");
                println!("  -h, --help          Show this help message");
                return Ok(());
            }
            other => warn!(arg = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    if let Some(parent) = config.database.path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    info!(path = %config.database.path.display(), store = %config.store.id, "Seeding database");
    let db = Database::new(DbConfig::from(&config.database)).await?;

    let store_id = config.store.id.as_str();
    let first_variant = format!("{}-{}", PRODUCTS[0].0, PRODUCTS[0].1[0]);
    if db.inventory().get(&first_variant, store_id).await?.is_some() {
        warn!(store = %store_id, "Store already has inventory, skipping seed (delete the database file to regenerate)");
        return Ok(());
    }

    let now = Utc::now();
    let start = std::time::Instant::now();

    let mut variants = 0;
    for (product, sizes) in PRODUCTS {
        for size in sizes.iter() {
            let variant_id = format!("{product}-{size}");
            db.inventory().set_stock(&variant_id, store_id, stock, "seed", now).await?;
            db.inventory().set_min_stock(&variant_id, store_id, MIN_STOCK).await?;
            variants += 1;
        }
    }
    info!(variants, stock, "Inventory seeded");

    for (name, credit) in CUSTOMERS {
        let customer = db.customers().insert(name, Money::from_cents(*credit), now).await?;
        info!(id = %customer.id, name = %customer.name, credit = %customer.store_credit(), "Customer seeded");
    }

    for promotion in promotions(now) {
        db.promotions().insert(&promotion).await?;
    }

    info!(elapsed = ?start.elapsed(), "Seed complete");
    Ok(())
}

fn promotions(now: chrono::DateTime<Utc>) -> Vec<Promotion> {
    let storewide = Promotion::new(
        Uuid::new_v4().to_string(),
        "10% storewide",
        PromotionKind::Percentage,
        1_000,
        1,
        now,
    );

    let mut big_basket = Promotion::new(
        Uuid::new_v4().to_string(),
        "50.00 off over 500.00",
        PromotionKind::FixedAmount,
        5_000,
        5,
        now,
    );
    big_basket.min_purchase_cents = 50_000;

    let mut jeans_week = Promotion::new(
        Uuid::new_v4().to_string(),
        "Jeans week 20%",
        PromotionKind::Percentage,
        2_000,
        10,
        now,
    );
    jeans_week.starts_at = Some(now);
    jeans_week.ends_at = Some(now + Duration::days(7));
    jeans_week.scope = PromotionScope::VariantSet(
        ["28", "30", "32", "34", "36"]
            .iter()
            .map(|size| format!("JEANS-{size}"))
            .collect(),
    );

    vec![storewide, big_basket, jeans_week]
}

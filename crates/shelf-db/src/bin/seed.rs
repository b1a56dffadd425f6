//! # Seed Data Generator
//!
//! Populates the database with vendors, products and a consumption history
//! for development and demos.
//!
//! ## Usage
//! ```bash
//! # 45 days of history (default)
//! cargo run -p shelf-db --bin seed
//!
//! # Longer history
//! cargo run -p shelf-db --bin seed -- --days 120
//!
//! # Specify database path
//! cargo run -p shelf-db --bin seed -- --db ./data/shelf.db
//! ```
//!
//! ## Generated Data
//! - One vendor per category, each supplying that category's products
//! - Every product gets an opening IN movement before the history starts
//! - Daily OUT movements with a per-product rate, so the restock report
//!   shows a spread of urgencies
//!
//! All stock changes go through the same conditional update and movement
//! insert the ledger uses, so quantities always match the movement history.

use chrono::{DateTime, Duration, Utc};
use shelf_core::{MovementDirection, Product, StockMovement};
use shelf_db::{
    generate_id, Database, DbConfig, MovementRepository, NewProduct, ProductRepository, StockUpdate,
};
use std::env;

/// Vendor name, email and the products they supply.
const CATALOG: &[(&str, &str, &str, &[&str])] = &[
    (
        "BEV",
        "Fizz Distribution",
        "orders@fizz.example.com",
        &["Cola 330ml", "Lemonade 330ml", "Sparkling Water 1L", "Orange Juice 1L", "Iced Tea 500ml"],
    ),
    (
        "DRY",
        "Meadow Dairy",
        "supply@meadow.example.com",
        &["Whole Milk 1L", "Greek Yogurt 500g", "Cheddar 200g", "Butter 250g", "Eggs Dozen"],
    ),
    (
        "SNK",
        "Crunch Wholesale",
        "sales@crunch.example.com",
        &["Salted Crisps 150g", "Pretzels 200g", "Chocolate Bar 50g", "Oat Cookies 300g"],
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut days: i64 = 45;
    let mut db_path = String::from("./shelf_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--days" | "-n" => {
                if i + 1 < args.len() {
                    days = args[i + 1].parse().unwrap_or(45);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Shelf Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -n, --days <N>     Days of consumption history (default: 45)");
                println!("  -d, --db <PATH>    Database file path (default: ./shelf_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let days = days.clamp(1, 365);

    println!("🌱 Shelf Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!("History:  {} days", days);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let history_start = Utc::now() - Duration::days(days);
    let mut products_created = 0usize;
    let mut movements_created = 0usize;

    for (category_idx, (code, vendor_name, vendor_email, names)) in CATALOG.iter().enumerate() {
        let vendor = db.vendors().insert(vendor_name, vendor_email).await?;
        println!("✓ Vendor {} <{}>", vendor.name, vendor.email);

        for (product_idx, name) in names.iter().enumerate() {
            let seed = category_idx * 10 + product_idx;
            let new = NewProduct::new(format!("{}-{:03}", code, seed), *name)
                .reorder(10 + (seed % 3) as i64 * 5, 40)
                .vendor(&vendor.id)
                .price_cents(99 + (seed as i64 * 37) % 900);

            let product = match db.products().insert(new).await {
                Ok(product) => product,
                Err(e) => {
                    eprintln!("Failed to insert {}: {}", name, e);
                    continue;
                }
            };
            products_created += 1;

            // Opening stock large enough to cover most of the history
            let daily_rate = 1 + (seed % 6) as i64;
            let opening = daily_rate * days + 15 - (seed as i64 * 7) % 40;
            record(&db, &product, MovementDirection::In, opening.max(1), history_start - Duration::hours(1), "Opening stock").await?;
            movements_created += 1;

            for day in 0..days {
                let qty = daily_rate + ((seed as i64 + day) % 3) - 1;
                if qty <= 0 {
                    continue;
                }
                let at = history_start + Duration::days(day) + Duration::hours(9 + (day % 8));
                if record(&db, &product, MovementDirection::Out, qty, at, "Shelf sale").await? {
                    movements_created += 1;
                }
            }
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!(
        "✓ Generated {} products and {} movements in {:?}",
        products_created, movements_created, elapsed
    );

    let low = db.products().list_low_stock().await?;
    let summary = serde_json::json!({
        "products": products_created,
        "movements": movements_created,
        "low_stock": low.iter().map(|p| &p.sku).collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Writes one backdated movement. Returns false when stock ran out.
async fn record(
    db: &Database,
    product: &Product,
    direction: MovementDirection,
    quantity: i64,
    at: DateTime<Utc>,
    notes: &str,
) -> Result<bool, Box<dyn std::error::Error>> {
    let delta = match direction {
        MovementDirection::In => quantity,
        MovementDirection::Out => -quantity,
    };

    let mut tx = db.begin().await?;
    match ProductRepository::try_adjust_quantity(&mut tx, &product.id, delta, at).await? {
        StockUpdate::Applied(_) => {}
        StockUpdate::Missing | StockUpdate::Insufficient { .. } => {
            tx.rollback().await?;
            return Ok(false);
        }
    }

    let movement = StockMovement {
        id: generate_id(),
        product_id: product.id.clone(),
        direction,
        quantity,
        notes: Some(notes.to_string()),
        actor: "seed".to_string(),
        occurred_at: at,
    };
    MovementRepository::insert(&mut tx, &movement).await?;
    tx.commit().await?;

    Ok(true)
}

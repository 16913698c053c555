//! # Seed Data Generator
//!
//! Populates a development database with products, stock, customers and a
//! few promo codes.
//!
//! ## Usage
//! ```bash
//! # 200 products (default)
//! cargo run -p retail-db --bin seed
//!
//! # Custom amount and path
//! cargo run -p retail-db --bin seed -- --count 1000 --db ./data/retail.db
//! ```
//!
//! ## Generated Data
//! - Products across a handful of electronics/office categories, each with
//!   an inventory row (stock 0-60, so some land under the low stock
//!   threshold)
//! - Customers
//! - Promotions: `SAVE10` (10%, min 1,000.00, 100 uses), `WELCOME50`
//!   (50.00 off, unlimited), `EXPIRED5` (window in the past), `PAUSED`
//!   (inactive)

use chrono::{Duration, NaiveDate, Utc};
use retail_core::{
    Customer, DiscountType, Product, Promotion, PromotionStatus, DEFAULT_LOW_STOCK_THRESHOLD,
};
use retail_db::{Database, DbConfig};
use std::env;
use uuid::Uuid;

/// Category code and base names.
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "CMP",
        &["Laptop", "Desktop Tower", "Mini PC", "Tablet", "Chromebook"],
    ),
    (
        "PER",
        &["Keyboard", "Mouse", "Webcam", "Headset", "USB Hub", "Docking Station"],
    ),
    (
        "DSP",
        &["Monitor 24in", "Monitor 27in", "Monitor 32in", "Projector"],
    ),
    (
        "NET",
        &["Router", "Switch 8-Port", "Wi-Fi Extender", "Patch Cable"],
    ),
    (
        "OFC",
        &["Desk Lamp", "Office Chair", "Standing Desk", "Paper Shredder"],
    ),
];

/// Variant names and their price add-on in minor units.
const VARIANTS: &[(&str, i64)] = &[
    ("Basic", 0),
    ("Plus", 15_000),
    ("Pro", 45_000),
    ("Max", 90_000),
];

const CUSTOMERS: &[&str] = &[
    "Walk-in Customer",
    "Ana Souza",
    "Bao Nguyen",
    "Chidi Okafor",
    "Dana Levi",
    "Emil Novak",
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut db_path = String::from("./retail_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(200);
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
                println!("Retail Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 200)");
                println!("  -d, --db <PATH>    Database file path (default: ./retail_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            other => eprintln!("Ignoring unknown argument '{}'", other),
        }
        i += 1;
    }

    println!("Retail Seed Data Generator");
    println!("==========================");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected, migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let mut generated = 0;

    'outer: for (category_idx, (category_code, names)) in CATEGORIES.iter().enumerate() {
        for (name_idx, name) in names.iter().enumerate() {
            for (variant_idx, (variant, addon)) in VARIANTS.iter().enumerate() {
                if generated >= count {
                    break 'outer;
                }

                let seed = category_idx * 1000 + name_idx * 20 + variant_idx;
                let product = generate_product(category_code, name, variant, *addon, seed);
                let stock = (seed % 61) as i64;

                if let Err(e) = db.products().insert(&product).await {
                    eprintln!("Failed to insert {}: {}", product.name, e);
                    continue;
                }
                db.inventory().init(&product.id, stock).await?;

                generated += 1;
            }
        }
    }

    println!("✓ Generated {} products in {:?}", generated, start.elapsed());

    for name in CUSTOMERS {
        db.customers().insert(&generate_customer(name)).await?;
    }
    println!("✓ Inserted {} customers", CUSTOMERS.len());

    let today = Utc::now().date_naive();
    for promotion in generate_promotions(today) {
        db.promotions().insert(&promotion).await?;
        println!("  promo {}", promotion.code);
    }

    let low = db.inventory().low_stock(DEFAULT_LOW_STOCK_THRESHOLD).await?;
    println!();
    println!(
        "{} products under the low stock threshold ({})",
        low.len(),
        DEFAULT_LOW_STOCK_THRESHOLD
    );
    println!("✓ Seed complete!");

    Ok(())
}

fn generate_product(category: &str, name: &str, variant: &str, addon: i64, seed: usize) -> Product {
    let now = Utc::now();

    // 49.00 - 1,248.00 plus the variant add-on
    let price_cents = 4_900 + ((seed * 37) % 120) as i64 * 1_000 + addon;

    Product {
        id: Uuid::new_v4().to_string(),
        name: format!("{} {}", name, variant),
        barcode: Some(format!("590{:010}", seed)),
        price_cents,
        category_id: Some(category.to_string()),
        supplier_id: None,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    }
}

fn generate_customer(name: &str) -> Customer {
    let slug = name.to_lowercase().replace(' ', ".");
    Customer {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        phone: None,
        email: Some(format!("{}@example.com", slug)),
        created_at: Utc::now(),
        deleted_at: None,
    }
}

fn generate_promotions(today: NaiveDate) -> Vec<Promotion> {
    let now = Utc::now();
    let promo = |code: &str,
                 discount_type: DiscountType,
                 discount_value: i64,
                 start_date: NaiveDate,
                 end_date: NaiveDate,
                 min_order_cents: i64,
                 usage_limit: i64,
                 status: PromotionStatus| Promotion {
        id: Uuid::new_v4().to_string(),
        code: code.to_string(),
        description: None,
        discount_type,
        discount_value,
        start_date,
        end_date,
        min_order_cents,
        usage_limit,
        used_count: 0,
        status,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };

    vec![
        promo(
            "SAVE10",
            DiscountType::Percent,
            1_000,
            today - Duration::days(30),
            today + Duration::days(30),
            100_000,
            100,
            PromotionStatus::Active,
        ),
        promo(
            "WELCOME50",
            DiscountType::Fixed,
            5_000,
            today - Duration::days(30),
            today + Duration::days(365),
            0,
            0,
            PromotionStatus::Active,
        ),
        promo(
            "EXPIRED5",
            DiscountType::Percent,
            500,
            today - Duration::days(60),
            today - Duration::days(1),
            0,
            0,
            PromotionStatus::Active,
        ),
        promo(
            "PAUSED",
            DiscountType::Percent,
            2_000,
            today - Duration::days(1),
            today + Duration::days(30),
            0,
            0,
            PromotionStatus::Inactive,
        ),
    ]
}

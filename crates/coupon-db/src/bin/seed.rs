//! # Seed Data Generator
//!
//! Populates the database with demonstration coupons for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./coupons_dev.db, coupons valid for 365 days from now
//! cargo run -p coupon-db --bin seed
//!
//! # Specify database path and validity
//! cargo run -p coupon-db --bin seed -- --db ./data/coupons.db --days 30
//! ```
//!
//! ## Generated Coupons
//! | code         | discount                        | restriction              |
//! |--------------|---------------------------------|--------------------------|
//! | SAVE20       | 20% off order, min 100.50       | pain_relief, fever       |
//! | FLAT50       | 50.00 off order, capped at 30   | none                     |
//! | FREESHIP     | 4.99 off delivery               | none, 3 uses per user    |
//! | DIABETES10   | 10% off medicine, cap 15.00     | diabetes                 |
//! | MED001DEAL   | 5.00 off medicine               | item med001              |

use chrono::{Duration, Utc};
use coupon_core::{
    Coupon, DiscountTarget, DiscountType, Money, UsageType, ValidityWindow,
};
use coupon_db::{Database, DbConfig};
use std::collections::BTreeSet;
use std::env;

/// (code, type, value in hundredths, target, min order cents, max uses, cap cents,
///  item ids, categories, terms)
type SeedRow = (
    &'static str,
    DiscountType,
    i64,
    DiscountTarget,
    i64,
    i64,
    i64,
    &'static [&'static str],
    &'static [&'static str],
    &'static str,
);

const COUPONS: &[SeedRow] = &[
    (
        "SAVE20",
        DiscountType::Percentage,
        2000,
        DiscountTarget::TotalOrderValue,
        10050,
        1,
        0,
        &[],
        &["pain_relief", "fever"],
        "20% off orders above 100.50 containing pain relief or fever medicine",
    ),
    (
        "FLAT50",
        DiscountType::Flat,
        5000,
        DiscountTarget::TotalOrderValue,
        0,
        1,
        3000,
        &[],
        &[],
        "50 off, capped at 30",
    ),
    (
        "FREESHIP",
        DiscountType::Flat,
        499,
        DiscountTarget::Delivery,
        0,
        3,
        0,
        &[],
        &[],
        "Free delivery, three times per customer",
    ),
    (
        "DIABETES10",
        DiscountType::Percentage,
        1000,
        DiscountTarget::Medicine,
        0,
        2,
        1500,
        &[],
        &["diabetes"],
        "Applicable on diabetes category",
    ),
    (
        "MED001DEAL",
        DiscountType::Flat,
        500,
        DiscountTarget::Medicine,
        2000,
        1,
        0,
        &["med001"],
        &[],
        "5 off when buying med001",
    ),
];

fn set_of(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Builds the demo coupons, valid from now for `days` days.
fn generate_coupons(days: i64) -> Vec<Coupon> {
    let now = Utc::now();
    let end = now + Duration::days(days);

    COUPONS
        .iter()
        .map(
            |&(code, discount_type, value, target, min_cents, max_uses, cap_cents, items, cats, terms)| {
                Coupon {
                    code: code.to_string(),
                    discount_type,
                    discount_value: value,
                    discount_target: target,
                    min_order_value: Money::from_cents(min_cents),
                    max_usage_per_user: max_uses,
                    expiry_date: end,
                    valid_window: ValidityWindow::new(now, end),
                    applicable_item_ids: set_of(items),
                    applicable_categories: set_of(cats),
                    usage_type: if max_uses == 1 {
                        UsageType::SingleUse
                    } else {
                        UsageType::MultiUse
                    },
                    terms_and_conditions: terms.to_string(),
                    max_discount_amount: Money::from_cents(cap_cents),
                }
            },
        )
        .collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut days: i64 = 365;
    let mut db_path = String::from("./coupons_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--days" | "-n" => {
                if i + 1 < args.len() {
                    days = args[i + 1].parse().unwrap_or(365);
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
                println!("Coupon Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -n, --days <N>     Days the coupons stay valid (default: 365)");
                println!("  -d, --db <PATH>    Database file path (default: ./coupons_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Coupon Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!("Valid for: {} days", days);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.coupons().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} coupons", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let now = Utc::now();
    for coupon in generate_coupons(days) {
        coupon_core::validation::validate_coupon(&coupon)?;
        db.coupons().insert(&coupon, now).await?;
        println!("  + {}", coupon.code);
    }

    println!();
    println!("✓ Seeded {} coupons", db.coupons().count().await?);

    db.close().await;
    Ok(())
}

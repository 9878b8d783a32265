//! Seed data script - populates the items table with a demo catalog
//!
//! Run with: cargo run --bin seed-data -- --database-url sqlite://orders.db?mode=rwc

use clap::{ArgAction, Parser};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, Set};
use tracing::info;

use order_orchestrator::{
    db::{self, DbConfig},
    entities::{item, order, order_item},
};

/// Demo catalog: name, stock, unit price
const CATALOG: [(&str, i32, Decimal); 5] = [
    ("Item A", 20, dec!(89.99)),
    ("Item B", 50, dec!(42.50)),
    ("Item C", 30, dec!(64.00)),
    ("Item D", 15, dec!(179.95)),
    ("Item E", 40, dec!(24.75)),
];

#[derive(Parser)]
#[command(name = "seed-data", about = "Populate the order database with demo items", version)]
struct Cli {
    #[arg(long, help = "Database URL; defaults to $DATABASE_URL")]
    database_url: Option<String>,
    #[arg(long, default_value_t = 1, help = "Multiply every item's stock by this factor")]
    stock_multiplier: i32,
    #[arg(
        long,
        action = ArgAction::SetTrue,
        help = "Delete existing orders and items before seeding"
    )]
    reset: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let cli = Cli::parse();
    anyhow::ensure!(cli.stock_multiplier >= 1, "--stock-multiplier must be at least 1");

    let database_url = cli
        .database_url
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .unwrap_or_else(|| "sqlite://orders.db?mode=rwc".to_string());

    info!("Connecting to database: {}", database_url);
    let pool = db::establish_connection_with_config(&DbConfig {
        url: database_url,
        max_connections: 2,
        ..Default::default()
    })
    .await?;

    db::run_migrations(&pool).await?;

    if cli.reset {
        info!("Removing existing orders and items...");
        order_item::Entity::delete_many().exec(&pool).await?;
        order::Entity::delete_many().exec(&pool).await?;
        item::Entity::delete_many().exec(&pool).await?;
    }

    info!("Creating items...");
    for (name, stock, price) in CATALOG {
        let created = item::ActiveModel {
            name: Set(name.to_string()),
            quantity: Set(stock * cli.stock_multiplier),
            price: Set(price),
            ..Default::default()
        }
        .insert(&pool)
        .await?;
        info!(
            "  #{} {} (stock {}, price {})",
            created.id, created.name, created.quantity, created.price
        );
    }

    info!(backend = ?pool.get_database_backend(), "Seed data complete");
    info!("Try: curl http://localhost:8080/items/1");

    Ok(())
}

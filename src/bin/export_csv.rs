// src/bin/export_csv.rs

//! One-shot export of all type-the-answer data into `CSV_DIR`.

use std::path::Path;

use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use type_the_answer::{config::Config, utils::csv_sync};

#[tokio::main]
async fn main() {
    dotenv().ok();

    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(EnvFilter::new(&config.rust_log))
        .with(fmt::layer().with_target(false))
        .init();

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    match csv_sync::sync_csv(&pool, Path::new(&config.csv_dir)).await {
        Ok(summary) => tracing::info!(
            "Exported {} games, {} questions and {} results to {}",
            summary.games,
            summary.questions,
            summary.results,
            config.csv_dir
        ),
        Err(e) => {
            tracing::error!("CSV export failed: {}", e);
            std::process::exit(1);
        }
    }
}

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod catalog;
mod cli;
mod config;
mod error;
mod executor;
mod models;
mod pipeline;
mod report;
mod services;

use cli::CliArgs;
use config::AppConfig;
use pipeline::{Pipeline, RunOptions};

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse_args();
    args.validate().map_err(anyhow::Error::msg)?;

    // Initialize tracing; RUST_LOG wins over --log-level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("stardex={}", args.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = AppConfig::load(&args)?;
    config.log_config();

    let opts = RunOptions::from_cli(&args);
    let mut pipeline = Pipeline::new(config);
    let summary = pipeline.run(&opts).await?;

    tracing::info!(
        "catalog ready: {} era(s), {} item(s), {} episode(s), quality {:.2}, {} skip(s){}",
        summary.eras,
        summary.items,
        summary.episodes,
        summary.quality_average,
        summary.skips,
        if summary.wrote_catalog {
            ""
        } else {
            " (not written)"
        }
    );

    Ok(())
}

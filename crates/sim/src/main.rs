//! Scripted walk-through that drives the grasp runtime end to end.
//!
//! An agent walks along the X axis past the targets of an interaction table.
//! Runtime events are printed to stdout as JSON lines; logs go to stderr.
mod config;
mod scenario;

use anyhow::Result;
use config::SimConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = SimConfig::from_env();
    scenario::run(&config).await
}

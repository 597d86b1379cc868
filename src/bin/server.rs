//! HTTP server for the rate-limited URL shortener.
//!
//! # Usage
//!
//! ```bash
//! # Defaults: listen on 0.0.0.0:8090, text logs at info
//! cargo run --bin server
//!
//! # JSON logs, tighter per-client limit
//! LOG_FORMAT=json CLIENT_LIMITER_MAX_REQUESTS=5 cargo run --bin server
//! ```
//!
//! See [`rate_limited_shortener::config`] for every environment variable.

use anyhow::{Context, Result};
use rate_limited_shortener::config::{Config, load_from_env};
use rate_limited_shortener::server;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = load_from_env().context("Invalid configuration")?;
    init_tracing(&config)?;
    config.print_summary();

    server::run(config).await
}

fn init_tracing(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_new(&config.log_level)
        .with_context(|| format!("RUST_LOG has invalid value '{}'", config.log_level))?;

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);

    if config.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}

//! chatterm - a terminal client for a chat-assistant API.
//!
//! Handles login, token refresh, and a simple line-oriented chat loop
//! against the remote backend.

use std::io;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use chatterm::app::App;
use chatterm::config::Config;

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();
    info!("chatterm starting");

    let config = Config::load()?;
    let mut app = App::new(config)?;
    let result = app.run().await;

    if let Err(e) = result {
        eprintln!("Error: {e}");
    }

    info!("chatterm shutting down");
    Ok(())
}

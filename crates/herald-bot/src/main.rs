//! Playlist bot entry point
//!
//! Run with:
//! ```bash
//! cargo run -p herald-bot
//! ```
//!
//! Configuration is loaded from environment variables.

use herald_common::{try_init_tracing_with_config, AppConfig, TracingConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = try_init_tracing_with_config(TracingConfig::for_environment(config.app.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    info!(
        name = %config.app.name,
        env = ?config.app.env,
        api_base = %config.discord.api_base,
        "Configuration loaded"
    );

    if let Err(e) = herald_bot::run(config).await {
        error!(error = %format!("{e:#}"), "Bot stopped with an error");
        std::process::exit(1);
    }
}

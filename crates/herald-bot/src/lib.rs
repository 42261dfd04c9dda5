//! # herald-bot
//!
//! Watches a video playlist and announces newly added videos in a chat
//! channel. Commands arrive over the gateway; announcements leave through
//! the rate-limited REST dispatcher.

pub mod bot;
pub mod commands;
pub mod notify;
pub mod youtube;

pub use bot::{Bot, BotState, DEFAULT_POLL_INTERVAL};
pub use commands::{Command, HELP_TEXT};
pub use youtube::{VideoSource, YoutubeClient, YoutubeError};

use anyhow::Context;
use herald_common::AppConfig;
use herald_gateway::protocol::IdentifyProperties;
use herald_gateway::{DispatchEvent, GatewayClient, GatewayConfig};
use herald_rest::{Dispatcher, HttpRestTransport, RateBudget};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Run the bot until the gateway stops delivering events or Ctrl+C
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    info!(name = %config.app.name, "Starting bot...");

    let transport = HttpRestTransport::new(&config.discord.api_base, &config.discord.token)
        .with_user_agent(&config.discord.user_agent);
    let dispatcher = Dispatcher::new(transport)
        .with_budget(RateBudget::new(
            config.rate_limit.capacity,
            config.rate_limit.reset_delay,
        ))
        .spawn();

    let gateway_config = GatewayConfig::new(&config.discord.token)
        .with_intents(config.gateway.intents)
        .with_version(config.gateway.version)
        .with_reconnect_delay(config.gateway.reconnect_delay)
        .with_properties(IdentifyProperties::new().with_library(&config.app.name));
    let gateway = GatewayClient::new(gateway_config).spawn();

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    gateway
        .on_event(move |event: DispatchEvent| {
            // The receiver only goes away while shutting down
            let _ = event_tx.send(event);
        })
        .await
        .context("Failed to register event handler")?;

    gateway
        .connect(&config.discord.discovery_url())
        .await
        .context("Failed to connect to the gateway")?;

    let source = YoutubeClient::new(&config.youtube.api_base, &config.youtube.api_key);
    let bot = Bot::new(source, dispatcher, config.youtube.poll_interval);

    tokio::select! {
        () = bot.run(event_rx) => warn!("Bot loop ended"),
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for shutdown signal")?;
            info!("Shutdown signal received");
        }
    }

    if let Err(e) = gateway.shutdown().await {
        warn!(error = %e, "Gateway already stopped");
    }

    info!("Bot stopped");
    Ok(())
}

//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file when present).

use herald_core::Intents;
use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app: AppSettings,
    pub discord: DiscordConfig,
    pub gateway: GatewaySettings,
    pub rate_limit: RateLimitDefaults,
    pub youtube: YoutubeConfig,
}

/// General application settings
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub name: String,
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// Credentials and REST endpoint of the messaging platform
#[derive(Clone)]
pub struct DiscordConfig {
    pub token: String,
    pub api_base: String,
    pub user_agent: String,
}

impl DiscordConfig {
    /// Endpoint returning the gateway base URL
    #[must_use]
    pub fn discovery_url(&self) -> String {
        format!("{}/gateway", self.api_base.trim_end_matches('/'))
    }
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("token", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// Gateway connection settings
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub version: u8,
    pub intents: Intents,
    pub reconnect_delay: Duration,
}

/// Rate budget used before the first response reports the real window
#[derive(Debug, Clone)]
pub struct RateLimitDefaults {
    pub capacity: u32,
    pub reset_delay: Duration,
}

/// Playlist polling settings
#[derive(Clone)]
pub struct YoutubeConfig {
    pub api_key: String,
    pub api_base: String,
    pub poll_interval: Duration,
}

impl std::fmt::Debug for YoutubeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoutubeConfig")
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

// Default value functions
fn default_app_name() -> String {
    "herald".to_string()
}

fn default_api_base() -> String {
    "https://discord.com/api/v10".to_string()
}

fn default_user_agent() -> String {
    format!("herald (https://github.com/herald-bot/herald, {})", env!("CARGO_PKG_VERSION"))
}

fn default_gateway_version() -> u8 {
    10
}

fn default_reconnect_delay_ms() -> u64 {
    5000
}

fn default_rate_limit_capacity() -> u32 {
    1
}

fn default_rate_limit_reset_ms() -> u64 {
    5000
}

fn default_youtube_api_base() -> String {
    "https://www.googleapis.com/youtube/v3".to_string()
}

fn default_poll_interval_secs() -> u64 {
    1800 // 30 minutes
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing or malformed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::MissingVar(key))
        };

        Ok(Self {
            app: AppSettings {
                name: lookup("APP_NAME").unwrap_or_else(default_app_name),
                env: lookup("APP_ENV")
                    .as_deref()
                    .and_then(Environment::parse)
                    .unwrap_or_default(),
            },
            discord: DiscordConfig {
                token: required("DISCORD_TOKEN")?,
                api_base: lookup("DISCORD_API_BASE").unwrap_or_else(default_api_base),
                user_agent: lookup("HTTP_USER_AGENT").unwrap_or_else(default_user_agent),
            },
            gateway: GatewaySettings {
                version: parse_or(&lookup, "GATEWAY_VERSION", default_gateway_version)?,
                intents: match lookup("GATEWAY_INTENTS") {
                    Some(raw) => Intents::parse(&raw)
                        .map_err(|e| ConfigError::InvalidValue("GATEWAY_INTENTS", e.to_string()))?,
                    None => Intents::default(),
                },
                reconnect_delay: Duration::from_millis(parse_or(
                    &lookup,
                    "GATEWAY_RECONNECT_DELAY_MS",
                    default_reconnect_delay_ms,
                )?),
            },
            rate_limit: RateLimitDefaults {
                capacity: parse_or(&lookup, "RATE_LIMIT_DEFAULT_CAPACITY", default_rate_limit_capacity)?,
                reset_delay: Duration::from_millis(parse_or(
                    &lookup,
                    "RATE_LIMIT_DEFAULT_RESET_MS",
                    default_rate_limit_reset_ms,
                )?),
            },
            youtube: YoutubeConfig {
                api_key: required("YOUTUBE_API_KEY")?,
                api_base: lookup("YOUTUBE_API_BASE").unwrap_or_else(default_youtube_api_base),
                poll_interval: Duration::from_secs(parse_or(
                    &lookup,
                    "POLL_INTERVAL_SECS",
                    default_poll_interval_secs,
                )?),
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: fn() -> T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue(key, e.to_string())),
        None => Ok(default()),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

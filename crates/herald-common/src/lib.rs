//! # herald-common
//!
//! Shared utilities including configuration, telemetry and timers.

pub mod config;
pub mod telemetry;
pub mod timer;

// Re-export commonly used types at crate root
pub use config::{
    AppConfig, AppSettings, ConfigError, DiscordConfig, Environment, GatewaySettings,
    RateLimitDefaults, YoutubeConfig,
};
pub use telemetry::{try_init_tracing, try_init_tracing_with_config, TracingConfig, TracingError};
pub use timer::Timer;

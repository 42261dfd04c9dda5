//! # herald-core
//!
//! Value objects used across the workspace. No I/O, no async.

pub mod value_objects;

pub use value_objects::{ChannelId, Intents, Snowflake, SnowflakeParseError};

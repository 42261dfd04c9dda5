//! Value objects - immutable types that represent protocol concepts

mod intents;
mod snowflake;

pub use intents::Intents;
pub use snowflake::{ChannelId, Snowflake, SnowflakeParseError};

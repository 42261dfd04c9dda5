//! Typed views of dispatch event data
//!
//! Only the fields collaborators read; everything else stays in the raw JSON.

use herald_core::{ChannelId, Snowflake};
use serde::Deserialize;

/// Channel type of a guild text channel
pub const GUILD_TEXT_CHANNEL: u8 = 0;

/// `MESSAGE_CREATE` data
#[derive(Debug, Clone, Deserialize)]
pub struct MessageCreateEvent {
    pub id: Snowflake,
    pub channel_id: ChannelId,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    pub author: MessageAuthor,
    /// Empty unless the MESSAGE_CONTENT intent was granted
    #[serde(default)]
    pub content: String,
}

/// Author of a message
#[derive(Debug, Clone, Deserialize)]
pub struct MessageAuthor {
    pub id: Snowflake,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub bot: bool,
}

/// `GUILD_CREATE` data
#[derive(Debug, Clone, Deserialize)]
pub struct GuildCreateEvent {
    pub id: Snowflake,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub channels: Vec<GuildChannel>,
}

impl GuildCreateEvent {
    /// First text channel in the order the server listed them
    #[must_use]
    pub fn first_text_channel(&self) -> Option<ChannelId> {
        self.channels
            .iter()
            .find(|channel| channel.kind == GUILD_TEXT_CHANNEL)
            .map(|channel| channel.id)
    }
}

/// Channel entry inside `GUILD_CREATE`
#[derive(Debug, Clone, Deserialize)]
pub struct GuildChannel {
    pub id: ChannelId,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub name: Option<String>,
}

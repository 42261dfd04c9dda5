//! Gateway intents
//!
//! The capability bitmask declared in IDENTIFY. The server only pushes dispatch
//! events for the intents a client declared.

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

bitflags! {
    /// Gateway intent flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Intents: u64 {
        /// Guild create/update/delete, channel events
        const GUILDS                  = 1 << 0;
        const GUILD_MEMBERS           = 1 << 1;
        const GUILD_MODERATION        = 1 << 2;
        const GUILD_PRESENCES         = 1 << 8;
        /// Message create/update/delete in guild channels
        const GUILD_MESSAGES          = 1 << 9;
        const GUILD_MESSAGE_REACTIONS = 1 << 10;
        const DIRECT_MESSAGES         = 1 << 12;
        /// Privileged: message bodies are empty without it
        const MESSAGE_CONTENT         = 1 << 15;

        /// What a command bot watching guild text channels needs
        const DEFAULT = Self::GUILDS.bits()
            | Self::GUILD_MESSAGES.bits()
            | Self::MESSAGE_CONTENT.bits();
    }
}

impl Intents {
    /// Parse from string representation (decimal number)
    ///
    /// Unknown bits are kept so newer intents can be declared without a code change.
    pub fn parse(s: &str) -> Result<Self, std::num::ParseIntError> {
        s.trim().parse::<u64>().map(Intents::from_bits_retain)
    }
}

impl Default for Intents {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl Serialize for Intents {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(self.bits())
    }
}

impl<'de> Deserialize<'de> for Intents {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = u64::deserialize(deserializer)?;
        Ok(Intents::from_bits_retain(bits))
    }
}

//! Chat commands understood by the bot

/// Prefix shared by every command
pub const PREFIX: &str = "yp!";

/// Reply to `yp!help`
pub const HELP_TEXT: &str = "**YouTube Playlist Bot Commands:**\n\
`yp!set [playlistId]` - Set playlist to monitor\n\
`yp!get` - Manually check for new videos\n\
`yp!channel` - Set this channel for notifications\n\
`yp!help` - Show this help message";

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `yp!set <playlistId>`
    SetPlaylist(String),
    /// `yp!get`
    CheckNow,
    /// `yp!channel`
    SetChannel,
    /// `yp!help`
    Help,
}

impl Command {
    /// Parse a message body
    ///
    /// Commands must start the message. `yp!set` needs a single whitespace
    /// character followed by the playlist id; anything after the id is
    /// ignored. The other commands match on prefix alone.
    pub fn parse(content: &str) -> Option<Self> {
        let rest = content.strip_prefix(PREFIX)?;

        if let Some(args) = rest.strip_prefix("set") {
            if let Some(id) = playlist_argument(args) {
                return Some(Self::SetPlaylist(id.to_string()));
            }
        }

        if rest.starts_with("get") {
            Some(Self::CheckNow)
        } else if rest.starts_with("channel") {
            Some(Self::SetChannel)
        } else if rest.starts_with("help") {
            Some(Self::Help)
        } else {
            None
        }
    }
}

fn playlist_argument(args: &str) -> Option<&str> {
    let mut chars = args.chars();
    if !chars.next().is_some_and(char::is_whitespace) {
        return None;
    }
    let rest = chars.as_str();
    let id = rest.split(char::is_whitespace).next().unwrap_or_default();
    (!id.is_empty()).then_some(id)
}

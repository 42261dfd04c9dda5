//! Notification text

use crate::youtube::PlaylistItem;

/// Shown when the playlist API does not report the uploader
pub const UNKNOWN_CHANNEL: &str = "Unknown Channel";

/// Short link for a video id
pub fn video_url(video_id: &str) -> String {
    format!("https://youtu.be/{video_id}")
}

/// Message announcing a video newly added to the watched playlist
pub fn format_notification(item: &PlaylistItem) -> String {
    let snippet = &item.snippet;
    let channel = snippet
        .video_owner_channel_title
        .as_deref()
        .filter(|title| !title.is_empty())
        .unwrap_or(UNKNOWN_CHANNEL);

    format!(
        "🎥 **New video added to playlist!**\n**{}**\nChannel: {}\n{}",
        snippet.title,
        channel,
        video_url(&snippet.resource_id.video_id)
    )
}

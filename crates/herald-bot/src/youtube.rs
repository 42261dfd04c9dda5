//! Playlist API client
//!
//! The bot needs four lookups: the channel owning a playlist, that channel's
//! uploads playlist, one page of a playlist, and whether a video is in a
//! playlist. [`VideoSource`] is the seam; [`YoutubeClient`] talks to the
//! YouTube Data API v3 over reqwest.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Items requested per uploads page
pub const UPLOADS_PAGE_SIZE: u32 = 25;

/// Items requested when looking a video up in the watched playlist
pub const LOOKUP_PAGE_SIZE: u32 = 50;

/// Playlist API errors
#[derive(Debug, Error)]
pub enum YoutubeError {
    #[error("Playlist API request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API answered with an error envelope
    #[error("Playlist API error {code}: {message}")]
    Api { code: u16, message: String },

    #[error("Unexpected playlist API response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// One page of playlist items, newest first for an uploads playlist
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistPage {
    #[serde(default)]
    pub items: Vec<PlaylistItem>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistItem {
    pub snippet: ItemSnippet,
}

impl PlaylistItem {
    pub fn video_id(&self) -> &str {
        &self.snippet.resource_id.video_id
    }

    pub fn published_at(&self) -> DateTime<Utc> {
        self.snippet.published_at
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSnippet {
    #[serde(default)]
    pub title: String,
    pub published_at: DateTime<Utc>,
    pub resource_id: ResourceId,
    #[serde(default)]
    pub video_owner_channel_title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceId {
    pub video_id: String,
}

/// Lookups the bot performs against the playlist service
#[async_trait]
pub trait VideoSource: Send + Sync + 'static {
    /// Channel owning `playlist_id`, `None` when the playlist is missing or private
    async fn playlist_owner(&self, playlist_id: &str) -> Result<Option<String>, YoutubeError>;

    /// Uploads playlist of `channel_id`
    async fn uploads_playlist(&self, channel_id: &str) -> Result<Option<String>, YoutubeError>;

    /// One page of `playlist_id`
    async fn playlist_items_page(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<PlaylistPage, YoutubeError>;

    /// The entry for `video_id` in `playlist_id`, if present
    async fn find_in_playlist(
        &self,
        playlist_id: &str,
        video_id: &str,
    ) -> Result<Option<PlaylistItem>, YoutubeError>;
}

#[derive(Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct ItemList<T> {
    #[serde(default)]
    items: Vec<T>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistResource {
    snippet: PlaylistSnippet,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistSnippet {
    channel_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelResource {
    content_details: ChannelContentDetails,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelContentDetails {
    related_playlists: RelatedPlaylists,
}

#[derive(Deserialize)]
struct RelatedPlaylists {
    uploads: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
}

/// Decode a response body, mapping the error envelope to [`YoutubeError::Api`]
///
/// The API reports failures as `{"error": {"code": .., "message": ..}}`,
/// with or without a non-success status.
fn decode<T: DeserializeOwned>(body: &str) -> Result<T, YoutubeError> {
    let value: Value = serde_json::from_str(body)?;
    if value.get("error").is_some() {
        let envelope: ErrorEnvelope = serde_json::from_value(value)?;
        return Err(YoutubeError::Api {
            code: envelope.error.code,
            message: envelope.error.message,
        });
    }
    Ok(serde_json::from_value(value)?)
}

/// YouTube Data API v3 client
#[derive(Clone)]
pub struct YoutubeClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl YoutubeClient {
    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    #[must_use]
    pub fn with_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    async fn get<T: DeserializeOwned>(
        &self,
        resource: &str,
        query: &[(&str, &str)],
    ) -> Result<T, YoutubeError> {
        let body = self
            .http
            .get(format!("{}/{resource}", self.api_base))
            .query(query)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?
            .text()
            .await?;

        decode(&body)
    }
}

#[async_trait]
impl VideoSource for YoutubeClient {
    async fn playlist_owner(&self, playlist_id: &str) -> Result<Option<String>, YoutubeError> {
        let list: ItemList<PlaylistResource> = self
            .get(
                "playlists",
                &[("part", "snippet"), ("id", playlist_id), ("maxResults", "1")],
            )
            .await?;

        Ok(list.items.into_iter().next().map(|playlist| playlist.snippet.channel_id))
    }

    async fn uploads_playlist(&self, channel_id: &str) -> Result<Option<String>, YoutubeError> {
        let list: ItemList<ChannelResource> = self
            .get(
                "channels",
                &[("part", "contentDetails"), ("id", channel_id), ("maxResults", "1")],
            )
            .await?;

        Ok(list
            .items
            .into_iter()
            .next()
            .and_then(|channel| channel.content_details.related_playlists.uploads))
    }

    async fn playlist_items_page(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<PlaylistPage, YoutubeError> {
        let page_size = UPLOADS_PAGE_SIZE.to_string();
        self.get(
            "playlistItems",
            &[
                ("part", "snippet"),
                ("playlistId", playlist_id),
                ("maxResults", page_size.as_str()),
                ("pageToken", page_token.unwrap_or_default()),
            ],
        )
        .await
    }

    async fn find_in_playlist(
        &self,
        playlist_id: &str,
        video_id: &str,
    ) -> Result<Option<PlaylistItem>, YoutubeError> {
        let page_size = LOOKUP_PAGE_SIZE.to_string();
        let page: PlaylistPage = self
            .get(
                "playlistItems",
                &[
                    ("part", "snippet"),
                    ("playlistId", playlist_id),
                    ("maxResults", page_size.as_str()),
                    ("videoId", video_id),
                ],
            )
            .await?;

        Ok(page.items.into_iter().next())
    }
}

impl fmt::Debug for YoutubeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("YoutubeClient")
            .field("api_base", &self.api_base)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

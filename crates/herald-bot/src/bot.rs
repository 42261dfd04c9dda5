//! Bot loop
//!
//! Consumes dispatch events forwarded by the gateway, answers commands and
//! polls the watched playlist on a fixed schedule. Every message goes to the
//! output channel through the dispatcher.

use crate::commands::{Command, HELP_TEXT};
use crate::notify::format_notification;
use crate::youtube::{VideoSource, YoutubeError};
use chrono::{DateTime, Utc};
use herald_core::ChannelId;
use herald_gateway::events::{GuildCreateEvent, MessageCreateEvent};
use herald_gateway::DispatchEvent;
use herald_rest::{DispatchError, DispatcherHandle};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Time between scheduled playlist checks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// What the bot is watching and where it reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotState {
    pub playlist_id: Option<String>,
    pub uploads_playlist: Option<String>,
    pub output_channel: Option<ChannelId>,
    /// Videos published before this were already considered
    pub last_check: DateTime<Utc>,
}

impl BotState {
    pub fn new(last_check: DateTime<Utc>) -> Self {
        Self {
            playlist_id: None,
            uploads_playlist: None,
            output_channel: None,
            last_check,
        }
    }
}

/// Playlist notification bot
pub struct Bot<S> {
    source: S,
    dispatcher: DispatcherHandle,
    poll_interval: Duration,
    schedule: Option<Interval>,
    state: BotState,
}

impl<S: VideoSource> Bot<S> {
    pub fn new(source: S, dispatcher: DispatcherHandle, poll_interval: Duration) -> Self {
        Self {
            source,
            dispatcher,
            poll_interval,
            schedule: None,
            state: BotState::new(Utc::now()),
        }
    }

    pub fn state(&self) -> &BotState {
        &self.state
    }

    /// Process events until the sender side is dropped
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<DispatchEvent>) {
        info!(poll_interval_secs = self.poll_interval.as_secs(), "Bot started");

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => break,
                },
                () = next_tick(&mut self.schedule) => self.poll().await,
            }
        }

        info!("Event stream closed, bot stopped");
    }

    pub async fn handle_event(&mut self, event: DispatchEvent) {
        if let Some(message) = event.as_message_create() {
            self.handle_message(message).await;
        } else if let Some(guild) = event.as_guild_create() {
            self.handle_guild(&guild);
        }
    }

    async fn handle_message(&mut self, message: MessageCreateEvent) {
        if message.author.bot {
            return;
        }
        let Some(command) = Command::parse(&message.content) else {
            return;
        };

        debug!(?command, channel_id = %message.channel_id, "Command received");

        match command {
            Command::SetPlaylist(playlist_id) => self.set_playlist(playlist_id).await,
            Command::CheckNow => self.poll().await,
            Command::SetChannel => {
                self.state.output_channel = Some(message.channel_id);
                info!(channel_id = %message.channel_id, "Output channel set");
                self.reply("Output channel set").await;
            }
            Command::Help => self.reply(HELP_TEXT).await,
        }
    }

    fn handle_guild(&mut self, guild: &GuildCreateEvent) {
        if let Some(channel_id) = guild.first_text_channel() {
            info!(guild_id = %guild.id, channel_id = %channel_id, "Using first text channel for output");
            self.state.output_channel = Some(channel_id);
        }
    }

    async fn set_playlist(&mut self, playlist_id: String) {
        self.reply(format!("Playlist set to {playlist_id}")).await;
        self.state.playlist_id = Some(playlist_id.clone());
        self.resolve_uploads(&playlist_id).await;

        if self.schedule.is_none() {
            let mut schedule = time::interval_at(Instant::now() + self.poll_interval, self.poll_interval);
            schedule.set_missed_tick_behavior(MissedTickBehavior::Delay);
            self.schedule = Some(schedule);
        }
    }

    /// Find the uploads playlist of the channel owning `playlist_id`
    async fn resolve_uploads(&mut self, playlist_id: &str) {
        let owner = match self.source.playlist_owner(playlist_id).await {
            Ok(Some(owner)) => owner,
            Ok(None) => {
                warn!(playlist_id, "Playlist not found");
                self.reply("Playlist not found or is private").await;
                self.state.playlist_id = None;
                return;
            }
            Err(YoutubeError::Api { code, message }) => {
                error!(playlist_id, code, message = %message, "Playlist lookup rejected");
                self.reply(format!("Error: {message}")).await;
                return;
            }
            Err(e) => {
                error!(playlist_id, error = %e, "Playlist lookup failed");
                return;
            }
        };

        match self.source.uploads_playlist(&owner).await {
            Ok(Some(uploads)) => {
                info!(playlist_id, channel_id = %owner, uploads = %uploads, "Watching uploads");
                self.state.uploads_playlist = Some(uploads);
            }
            Ok(None) => warn!(channel_id = %owner, "Channel has no uploads playlist"),
            Err(e) => error!(channel_id = %owner, error = %e, "Uploads lookup failed"),
        }
    }

    /// Announce uploads newer than the last check that are in the watched playlist
    ///
    /// Pages are newest first; paging stops at the first page whose last item
    /// predates the last check. A failed page leaves the last check untouched
    /// so the next poll covers the same window.
    pub async fn poll(&mut self) {
        let Some(uploads) = self.state.uploads_playlist.clone() else {
            warn!("No uploads playlist resolved, skipping check");
            return;
        };
        let Some(playlist_id) = self.state.playlist_id.clone() else {
            warn!("No playlist set, skipping check");
            return;
        };

        let started = Utc::now();
        let since = self.state.last_check;
        let mut page_token: Option<String> = None;

        loop {
            let page = match self
                .source
                .playlist_items_page(&uploads, page_token.as_deref())
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    error!(uploads = %uploads, error = %e, "Failed to fetch uploads page");
                    return;
                }
            };

            for item in page.items.iter().take_while(|item| item.published_at() >= since) {
                self.check_video(&playlist_id, item.video_id()).await;
            }

            let more = page
                .items
                .last()
                .is_some_and(|item| item.published_at() >= since);
            match page.next_page_token {
                Some(token) if more => page_token = Some(token),
                _ => break,
            }
        }

        self.state.last_check = started;
    }

    async fn check_video(&self, playlist_id: &str, video_id: &str) {
        match self.source.find_in_playlist(playlist_id, video_id).await {
            Ok(Some(item)) => {
                info!(video_id, "New video found in playlist");
                self.reply(format_notification(&item)).await;
            }
            Ok(None) => debug!(video_id, "Upload not in playlist"),
            Err(e) => warn!(video_id, error = %e, "Playlist lookup failed"),
        }
    }

    /// Queue a message for the output channel and log its outcome
    async fn reply(&self, content: impl Into<String>) {
        match self.dispatcher.enqueue(self.state.output_channel, content).await {
            Ok(outcome) => {
                tokio::spawn(async move {
                    match outcome.await {
                        Ok(delivery) => debug!(status = delivery.status, "Message delivered"),
                        Err(e) => log_failure(&e),
                    }
                });
            }
            Err(e) => log_failure(&e),
        }
    }
}

fn log_failure(err: &DispatchError) {
    match err {
        DispatchError::MissingTarget => error!("No output channel set, message dropped"),
        other => warn!(error = %other, "Message not delivered"),
    }
}

async fn next_tick(schedule: &mut Option<Interval>) {
    match schedule {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

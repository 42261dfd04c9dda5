//! REST transport seam
//!
//! The dispatcher hands one message at a time to a [`RestTransport`] and
//! reads the status and rate-limit headers of what comes back.

use async_trait::async_trait;
use herald_core::ChannelId;
use reqwest::header::{HeaderMap, AUTHORIZATION, USER_AGENT};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Header carrying the window capacity
pub const RATE_LIMIT_LIMIT: &str = "x-ratelimit-limit";

/// Header carrying seconds until the window resets
pub const RATE_LIMIT_RESET_AFTER: &str = "x-ratelimit-reset-after";

/// User agent sent when none is configured
pub const DEFAULT_USER_AGENT: &str = concat!("DiscordBot (herald, ", env!("CARGO_PKG_VERSION"), ")");

/// A message bound for one channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub channel_id: ChannelId,
    pub content: String,
}

/// Rate-limit information reported by a response
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimitHeaders {
    pub limit: Option<u32>,
    pub reset_after: Option<Duration>,
}

impl RateLimitHeaders {
    /// Read the headers, ignoring values that do not parse
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let limit = header_str(headers, RATE_LIMIT_LIMIT).and_then(|value| value.trim().parse().ok());
        let reset_after = header_str(headers, RATE_LIMIT_RESET_AFTER)
            .and_then(|value| value.trim().parse::<f64>().ok())
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok());

        Self { limit, reset_after }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// What the server answered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestResponse {
    pub status: u16,
    pub rate_limit: RateLimitHeaders,
    pub body: String,
}

impl RestResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request never produced a response
#[derive(Debug, Clone, Error)]
#[error("Request failed: {0}")]
pub struct TransportError(pub String);

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        Self(err.to_string())
    }
}

/// Delivers one message
#[async_trait]
pub trait RestTransport: Send + Sync + 'static {
    async fn post_message(&self, message: &OutboundMessage) -> Result<RestResponse, TransportError>;
}

#[derive(Serialize)]
struct CreateMessageBody<'a> {
    content: &'a str,
    tts: bool,
}

/// `POST {api_base}/channels/{id}/messages` over reqwest
#[derive(Clone)]
pub struct HttpRestTransport {
    http: reqwest::Client,
    api_base: String,
    token: String,
    user_agent: String,
}

impl HttpRestTransport {
    pub fn new(api_base: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    #[must_use]
    pub fn with_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    fn message_url(&self, channel_id: ChannelId) -> String {
        format!("{}/channels/{channel_id}/messages", self.api_base)
    }
}

#[async_trait]
impl RestTransport for HttpRestTransport {
    async fn post_message(&self, message: &OutboundMessage) -> Result<RestResponse, TransportError> {
        let response = self
            .http
            .post(self.message_url(message.channel_id))
            .header(AUTHORIZATION, format!("Bot {}", self.token))
            .header(USER_AGENT, &self.user_agent)
            .json(&CreateMessageBody {
                content: &message.content,
                tts: false,
            })
            .send()
            .await?;

        let status = response.status().as_u16();
        let rate_limit = RateLimitHeaders::from_headers(response.headers());
        let body = response.text().await.unwrap_or_default();

        Ok(RestResponse {
            status,
            rate_limit,
            body,
        })
    }
}

impl fmt::Debug for HttpRestTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRestTransport")
            .field("api_base", &self.api_base)
            .field("token", &"[redacted]")
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

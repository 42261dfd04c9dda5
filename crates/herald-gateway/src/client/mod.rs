//! Gateway client
//!
//! [`GatewayClient`] configures and spawns the driver task; the returned
//! [`GatewayHandle`] is the only way collaborators talk to it.

mod driver;
mod error;

pub use error::GatewayError;

use crate::connection::ConnectionState;
use crate::discovery;
use crate::events::DispatchEvent;
use crate::protocol::IdentifyProperties;
use crate::transport::{Connector, WebSocketConnector};
use driver::{Command, GatewayDriver};
use herald_core::Intents;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};

/// Protocol version appended to the gateway URL
pub const DEFAULT_GATEWAY_VERSION: u8 = 10;

/// Fixed delay before reconnecting after a lost connection
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(5_000);

/// Random backoff window after an invalidated session, in milliseconds
pub const INVALID_SESSION_BACKOFF_MS: Range<u64> = 1_000..6_000;

const COMMAND_BUFFER_SIZE: usize = 32;

/// Receives every dispatch event except READY
pub trait EventHandler: Send + Sync + 'static {
    fn handle(&self, event: DispatchEvent);
}

impl<F> EventHandler for F
where
    F: Fn(DispatchEvent) + Send + Sync + 'static,
{
    fn handle(&self, event: DispatchEvent) {
        self(event);
    }
}

/// Gateway connection settings
#[derive(Clone)]
pub struct GatewayConfig {
    pub token: String,
    pub intents: Intents,
    pub version: u8,
    pub reconnect_delay: Duration,
    pub invalid_session_backoff_ms: Range<u64>,
    pub properties: IdentifyProperties,
}

impl GatewayConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            intents: Intents::DEFAULT,
            version: DEFAULT_GATEWAY_VERSION,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            invalid_session_backoff_ms: INVALID_SESSION_BACKOFF_MS,
            properties: IdentifyProperties::new(),
        }
    }

    #[must_use]
    pub fn with_intents(mut self, intents: Intents) -> Self {
        self.intents = intents;
        self
    }

    #[must_use]
    pub fn with_version(mut self, version: u8) -> Self {
        self.version = version;
        self
    }

    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    #[must_use]
    pub fn with_invalid_session_backoff(mut self, backoff_ms: Range<u64>) -> Self {
        self.invalid_session_backoff_ms = backoff_ms;
        self
    }

    #[must_use]
    pub fn with_properties(mut self, properties: IdentifyProperties) -> Self {
        self.properties = properties;
        self
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("token", &"[redacted]")
            .field("intents", &self.intents)
            .field("version", &self.version)
            .field("reconnect_delay", &self.reconnect_delay)
            .field("invalid_session_backoff_ms", &self.invalid_session_backoff_ms)
            .finish()
    }
}

/// Builder for the gateway driver
pub struct GatewayClient<C = WebSocketConnector> {
    config: GatewayConfig,
    connector: C,
    http: reqwest::Client,
}

impl GatewayClient<WebSocketConnector> {
    /// Client that opens real WebSocket connections
    pub fn new(config: GatewayConfig) -> Self {
        Self::with_connector(config, WebSocketConnector)
    }
}

impl<C: Connector> GatewayClient<C> {
    pub fn with_connector(config: GatewayConfig, connector: C) -> Self {
        Self {
            config,
            connector,
            http: reqwest::Client::new(),
        }
    }

    /// HTTP client used for gateway discovery
    #[must_use]
    pub fn with_http(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Spawn the driver task
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(self) -> GatewayHandle {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER_SIZE);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

        let driver = GatewayDriver::new(self.config, self.connector, command_rx, state_tx);
        tokio::spawn(driver.run());

        GatewayHandle {
            commands: command_tx,
            state: state_rx,
            http: self.http,
        }
    }
}

/// Handle to a running gateway driver
#[derive(Clone)]
pub struct GatewayHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<ConnectionState>,
    http: reqwest::Client,
}

impl GatewayHandle {
    /// Discover the gateway through `discovery_endpoint` and connect to it
    pub async fn connect(&self, discovery_endpoint: &str) -> Result<(), GatewayError> {
        let base = discovery::discover(&self.http, discovery_endpoint).await?;
        self.connect_gateway(base).await
    }

    /// Connect to an already known gateway base URL
    pub async fn connect_gateway(&self, base: impl Into<String>) -> Result<(), GatewayError> {
        self.command(Command::Connect { base: base.into() }).await
    }

    /// Register the event handler, replacing any previous one
    pub async fn on_event(&self, handler: impl EventHandler) -> Result<(), GatewayError> {
        self.command(Command::SetHandler(Arc::new(handler))).await
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Receiver that observes every published state change
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Wait until the connection reaches `target`
    pub async fn wait_for_state(&self, target: ConnectionState) -> Result<(), GatewayError> {
        let mut state = self.state.clone();
        state
            .wait_for(|current| *current == target)
            .await
            .map(|_| ())
            .map_err(|_| GatewayError::DriverStopped)
    }

    /// Close the connection normally and stop the driver
    pub async fn shutdown(&self) -> Result<(), GatewayError> {
        let (done_tx, done_rx) = oneshot::channel();
        self.command(Command::Shutdown(done_tx)).await?;
        done_rx.await.map_err(|_| GatewayError::DriverStopped)
    }

    async fn command(&self, command: Command) -> Result<(), GatewayError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| GatewayError::DriverStopped)
    }
}

impl fmt::Debug for GatewayHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayHandle")
            .field("state", &self.state())
            .finish()
    }
}

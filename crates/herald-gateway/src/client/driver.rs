//! Gateway connection state machine
//!
//! A single task owns the socket, the session, the heartbeat monitor and
//! the recovery timer. Everything that can change them arrives through one
//! `select!`, so frames are handled strictly in arrival order.

use super::{EventHandler, GatewayConfig};
use crate::connection::{Connection, ConnectionState, SessionState};
use crate::discovery::gateway_url;
use crate::events::DispatchEvent;
use crate::heartbeat::{Beat, HeartbeatMonitor};
use crate::protocol::{
    CloseCode, GatewayMessage, HelloPayload, IdentifyPayload, InboundFrame, ReadyPayload,
    ResumePayload, NORMAL_CLOSE, RESUMABLE_CLOSE,
};
use crate::transport::{Connector, SocketEvent};
use herald_common::Timer;
use rand::Rng;
use serde_json::Value;
use std::future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};

/// Requests from a [`GatewayHandle`](super::GatewayHandle)
pub(crate) enum Command {
    Connect { base: String },
    SetHandler(Arc<dyn EventHandler>),
    Shutdown(oneshot::Sender<()>),
}

/// What the recovery timer does when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Recovery {
    /// Resume if the session allows it, otherwise connect fresh
    Reconnect,
    /// Connect fresh and identify
    Fresh,
}

pub(crate) struct GatewayDriver<C> {
    config: GatewayConfig,
    connector: C,
    commands: mpsc::Receiver<Command>,
    state: watch::Sender<ConnectionState>,
    handler: Option<Arc<dyn EventHandler>>,
    gateway_base: Option<String>,
    connection: Option<Connection>,
    session: SessionState,
    heartbeat: HeartbeatMonitor,
    recovery: Timer<Recovery>,
}

impl<C: Connector> GatewayDriver<C> {
    pub(crate) fn new(
        config: GatewayConfig,
        connector: C,
        commands: mpsc::Receiver<Command>,
        state: watch::Sender<ConnectionState>,
    ) -> Self {
        Self {
            config,
            connector,
            commands,
            state,
            handler: None,
            gateway_base: None,
            connection: None,
            session: SessionState::new(),
            heartbeat: HeartbeatMonitor::new(),
            recovery: Timer::new(),
        }
    }

    pub(crate) async fn run(mut self) {
        loop {
            tokio::select! {
                biased;

                command = self.commands.recv() => match command {
                    Some(Command::Connect { base }) => self.handle_connect(base).await,
                    Some(Command::SetHandler(handler)) => self.handler = Some(handler),
                    Some(Command::Shutdown(done)) => {
                        self.shutdown().await;
                        let _ = done.send(());
                        return;
                    }
                    None => {
                        self.shutdown().await;
                        return;
                    }
                },

                event = next_socket_event(&mut self.connection) => {
                    self.handle_socket_event(event).await;
                }

                () = self.heartbeat.tick() => self.handle_heartbeat_tick().await,

                recovery = self.recovery.fired() => self.handle_recovery(recovery).await,
            }
        }
    }

    fn current_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    fn set_state(&self, next: ConnectionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            tracing::debug!(from = %previous, to = %next, "Gateway state changed");
        }
    }

    async fn handle_connect(&mut self, base: String) {
        if self.current_state().is_active() {
            tracing::warn!(state = %self.current_state(), "Already connected, ignoring connect");
            return;
        }
        self.gateway_base = Some(base);
        self.open_fresh().await;
    }

    /// Open a socket to the discovered gateway; HELLO will drive IDENTIFY
    async fn open_fresh(&mut self) {
        let Some(base) = self.gateway_base.as_deref() else {
            tracing::error!("No gateway URL known, cannot connect");
            self.set_state(ConnectionState::Disconnected);
            return;
        };
        let url = gateway_url(base, self.config.version);

        self.set_state(ConnectionState::Connecting);
        tracing::info!(url = %url, "Connecting to gateway");

        match self.connector.connect(&url).await {
            Ok(socket) => {
                self.connection = Some(Connection::fresh(socket, url));
                self.set_state(ConnectionState::AwaitingHello);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to open gateway connection");
                self.begin_recovery().await;
            }
        }
    }

    /// Open a socket to the resume endpoint and send RESUME right away
    async fn open_resume(&mut self) {
        let target = self
            .session
            .session_id()
            .zip(self.session.resume_url())
            .map(|(id, base)| (id.to_string(), gateway_url(base, self.config.version)));
        let Some((session_id, url)) = target else {
            self.open_fresh().await;
            return;
        };
        let sequence = self.session.sequence();

        tracing::info!(url = %url, session_id = %session_id, seq = ?sequence, "Resuming session");

        let socket = match self.connector.connect(&url).await {
            Ok(socket) => socket,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to open resume connection");
                self.begin_recovery().await;
                return;
            }
        };

        let connection = Connection::resuming(socket, url, sequence);
        let payload = ResumePayload {
            token: self.config.token.clone(),
            session_id,
            seq: sequence.unwrap_or(0),
        };
        match GatewayMessage::resume(&payload) {
            Ok(message) => {
                if let Err(e) = connection.send(&message).await {
                    tracing::warn!(error = %e, "Failed to send RESUME");
                }
            }
            Err(e) => tracing::error!(error = %e, "Failed to encode RESUME"),
        }

        self.connection = Some(connection);
        self.set_state(ConnectionState::Resuming);
    }

    async fn handle_recovery(&mut self, recovery: Recovery) {
        match recovery {
            Recovery::Reconnect if self.session.is_resumable() => self.open_resume().await,
            Recovery::Reconnect | Recovery::Fresh => self.open_fresh().await,
        }
    }

    /// Tear the socket down and schedule a reconnect after the fixed delay
    ///
    /// The heartbeat is stopped before anything else.
    async fn begin_recovery(&mut self) {
        self.heartbeat.stop();
        if let Some(connection) = self.connection.take() {
            self.session.record_sequence(connection.last_sequence());
            connection.close(RESUMABLE_CLOSE).await;
        }

        let delay = self.config.reconnect_delay;
        tracing::info!(
            delay_ms = delay.as_millis() as u64,
            resumable = self.session.is_resumable(),
            "Reconnecting after delay"
        );
        self.set_state(ConnectionState::Reconnecting);
        self.recovery.schedule(delay, Recovery::Reconnect);
    }

    /// Stop everything and stay disconnected
    async fn disconnect(&mut self, close_code: Option<u16>) {
        self.heartbeat.stop();
        self.recovery.cancel();
        if let Some(connection) = self.connection.take() {
            self.session.record_sequence(connection.last_sequence());
            if let Some(code) = close_code {
                connection.close(code).await;
            }
        }
        self.set_state(ConnectionState::Disconnected);
    }

    async fn shutdown(&mut self) {
        tracing::info!("Shutting down gateway connection");
        self.disconnect(Some(NORMAL_CLOSE)).await;
    }

    async fn handle_socket_event(&mut self, event: Option<SocketEvent>) {
        match event {
            Some(SocketEvent::Text(text)) => self.handle_text(&text).await,
            Some(SocketEvent::Closed { code, reason }) => self.handle_close(code, &reason).await,
            Some(SocketEvent::Error(error)) => {
                tracing::warn!(error = %error, "Gateway socket error");
                self.begin_recovery().await;
            }
            None => self.handle_close(None, "stream ended").await,
        }
    }

    async fn handle_close(&mut self, code: Option<u16>, reason: &str) {
        match code {
            Some(NORMAL_CLOSE) => {
                tracing::info!(reason = %reason, "Gateway closed normally");
                self.disconnect(None).await;
            }
            Some(value) => match CloseCode::from_u16(value) {
                Some(close) if close.is_fatal() => {
                    tracing::error!(code = value, reason = %close.description(), "Gateway closed with fatal code");
                    self.session.clear();
                    self.disconnect(None).await;
                }
                Some(close) if close.invalidates_session() => {
                    tracing::warn!(code = value, reason = %close.description(), "Session can not be resumed");
                    self.session.clear();
                    self.begin_recovery().await;
                }
                _ => {
                    tracing::warn!(code = value, reason = %reason, "Gateway connection closed");
                    self.begin_recovery().await;
                }
            },
            None => {
                tracing::warn!(reason = %reason, "Gateway connection lost");
                self.begin_recovery().await;
            }
        }
    }

    async fn handle_text(&mut self, text: &str) {
        let raw: Value = match serde_json::from_str(text) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping malformed frame");
                return;
            }
        };

        // Recorded before decoding so unrecognised frames still count
        if let Some(connection) = self.connection.as_mut() {
            connection.observe_sequence(raw.get("s").and_then(Value::as_u64));
        }

        let frame = match serde_json::from_value::<GatewayMessage>(raw)
            .map_err(Into::into)
            .and_then(InboundFrame::try_from)
        {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping undecodable frame");
                return;
            }
        };

        tracing::trace!(frame = %frame.name(), "Frame received");

        match frame {
            InboundFrame::Hello(hello) => self.handle_hello(hello).await,
            InboundFrame::HeartbeatRequest => self.send_heartbeat().await,
            InboundFrame::HeartbeatAck => self.heartbeat.acknowledge(),
            InboundFrame::Reconnect => {
                tracing::info!("Server requested reconnect");
                self.begin_recovery().await;
            }
            InboundFrame::InvalidSession { resumable } => {
                self.handle_invalid_session(resumable).await;
            }
            InboundFrame::Ready(ready) => self.handle_ready(ready),
            InboundFrame::Dispatch(event) => self.handle_dispatch(event),
        }
    }

    async fn handle_hello(&mut self, hello: HelloPayload) {
        self.heartbeat
            .start(Duration::from_millis(hello.heartbeat_interval));

        let Some(connection) = self.connection.as_ref() else {
            return;
        };
        if connection.is_resuming() || self.current_state() != ConnectionState::AwaitingHello {
            tracing::debug!(interval_ms = hello.heartbeat_interval, "Heartbeat restarted");
            return;
        }

        let identify = IdentifyPayload {
            token: self.config.token.clone(),
            intents: self.config.intents,
            properties: self.config.properties.clone(),
        };
        match GatewayMessage::identify(&identify) {
            Ok(message) => {
                if let Err(e) = connection.send(&message).await {
                    tracing::warn!(error = %e, "Failed to send IDENTIFY");
                }
            }
            Err(e) => tracing::error!(error = %e, "Failed to encode IDENTIFY"),
        }

        tracing::debug!(interval_ms = hello.heartbeat_interval, "Identifying");
        self.set_state(ConnectionState::Identifying);
    }

    async fn handle_heartbeat_tick(&mut self) {
        match self.heartbeat.on_tick() {
            Beat::Send => self.send_heartbeat().await,
            Beat::Missed => {
                tracing::warn!("Heartbeat not acknowledged, connection is dead");
                self.set_state(ConnectionState::Degraded);
                self.begin_recovery().await;
            }
        }
    }

    async fn send_heartbeat(&self) {
        let Some(connection) = self.connection.as_ref() else {
            return;
        };
        let sequence = connection.last_sequence();
        tracing::trace!(seq = ?sequence, "Sending heartbeat");
        if let Err(e) = connection.send(&GatewayMessage::heartbeat(sequence)).await {
            tracing::warn!(error = %e, "Failed to send heartbeat");
        }
    }

    /// The session is gone for good, whatever `resumable` says
    async fn handle_invalid_session(&mut self, resumable: bool) {
        tracing::warn!(resumable, "Session invalidated");
        self.session.clear();
        self.heartbeat.stop();
        if let Some(connection) = self.connection.take() {
            connection.close(NORMAL_CLOSE).await;
        }

        let window = &self.config.invalid_session_backoff_ms;
        let backoff = if window.is_empty() {
            window.start
        } else {
            rand::thread_rng().gen_range(window.clone())
        };

        tracing::info!(delay_ms = backoff, "Identifying again after backoff");
        self.set_state(ConnectionState::Reconnecting);
        self.recovery
            .schedule(Duration::from_millis(backoff), Recovery::Fresh);
    }

    fn handle_ready(&mut self, ready: ReadyPayload) {
        let sequence = self.connection.as_ref().and_then(Connection::last_sequence);
        tracing::info!(
            session_id = %ready.session_id,
            user_id = %ready.user.id,
            username = %ready.user.username,
            "Gateway session ready"
        );
        self.session
            .save(ready.session_id, ready.resume_gateway_url, sequence);
        self.set_state(ConnectionState::Ready);
    }

    fn handle_dispatch(&mut self, event: DispatchEvent) {
        if self.current_state() == ConnectionState::Resuming {
            tracing::info!(event = %event.name, "Session resumed");
            self.set_state(ConnectionState::Ready);
        }

        match &self.handler {
            Some(handler) => handler.handle(event),
            None => tracing::trace!(event = %event.name, "No event handler registered"),
        }
    }
}

async fn next_socket_event(connection: &mut Option<Connection>) -> Option<SocketEvent> {
    match connection {
        Some(connection) => connection.next_event().await,
        None => future::pending().await,
    }
}

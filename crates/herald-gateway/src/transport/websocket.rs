//! tokio-tungstenite connector

use super::{Connector, Outbound, SocketEvent, SocketHandle, TransportError, SOCKET_BUFFER_SIZE};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

/// Opens real WebSocket connections (TLS through rustls)
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, url: &str) -> Result<SocketHandle, TransportError> {
        let (stream, _response) =
            tokio_tungstenite::connect_async(url)
                .await
                .map_err(|e| TransportError::Connect {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;

        tracing::debug!(url = %url, "WebSocket opened");

        let (mut ws_sink, mut ws_stream) = stream.split();
        let (out_tx, mut out_rx) = mpsc::channel::<Outbound>(SOCKET_BUFFER_SIZE);
        let (event_tx, event_rx) = mpsc::channel::<SocketEvent>(SOCKET_BUFFER_SIZE);

        // Writer: drains queued frames, stops after a close frame
        tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                match frame {
                    Outbound::Text(text) => {
                        if let Err(e) = ws_sink.send(Message::Text(text)).await {
                            tracing::warn!(error = %e, "Failed to write frame");
                            break;
                        }
                    }
                    Outbound::Close(code) => {
                        let close = CloseFrame {
                            code: CloseCode::from(code),
                            reason: "".into(),
                        };
                        if let Err(e) = ws_sink.send(Message::Close(Some(close))).await {
                            tracing::debug!(error = %e, "Failed to write close frame");
                        }
                        break;
                    }
                }
            }
            let _ = ws_sink.close().await;
        });

        // Reader: forwards text frames until the stream terminates
        let reader = tokio::spawn(async move {
            while let Some(message) = ws_stream.next().await {
                let event = match message {
                    Ok(Message::Text(text)) => SocketEvent::Text(text),
                    Ok(Message::Close(frame)) => {
                        let (code, reason) = frame.map_or((None, String::new()), |f| {
                            (Some(u16::from(f.code)), f.reason.into_owned())
                        });
                        let _ = event_tx.send(SocketEvent::Closed { code, reason }).await;
                        return;
                    }
                    Ok(Message::Binary(_)) => {
                        tracing::debug!("Binary frames not supported, dropping");
                        continue;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        let _ = event_tx.send(SocketEvent::Error(e.to_string())).await;
                        return;
                    }
                };
                if event_tx.send(event).await.is_err() {
                    return;
                }
            }
            let _ = event_tx
                .send(SocketEvent::Closed {
                    code: None,
                    reason: "stream ended".to_string(),
                })
                .await;
        });

        Ok(SocketHandle::new(out_tx, event_rx).with_reader(reader.abort_handle()))
    }
}

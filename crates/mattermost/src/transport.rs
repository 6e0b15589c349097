use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("stream failed to connect: {0}")]
    Connect(String),
    #[error("stream read failed: {0}")]
    Receive(String),
    #[error("stream write failed: {0}")]
    Send(String),
}

/// The realtime client's view of the event stream. `connect` must leave the
/// stream authenticated; `next_frame` yields text frames until the peer
/// closes (`Ok(None)`).
#[async_trait]
pub trait StreamTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    async fn next_frame(&self) -> Result<Option<String>, TransportError>;
}

/// Derives the event stream URL from the REST base URL by upgrading the
/// scheme to its streaming equivalent.
pub fn stream_url(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let upgraded = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };
    format!("{upgraded}/api/v4/websocket")
}

fn authentication_challenge(token: &SecretString) -> String {
    serde_json::json!({
        "seq": 1,
        "action": "authentication_challenge",
        "data": { "token": token.expose_secret() },
    })
    .to_string()
}

/// Real WebSocket transport against the platform.
///
/// Single logical task owns the connection, so the stream sits behind one
/// async mutex rather than a split reader/writer pair.
pub struct WebSocketTransport {
    ws_url: String,
    token: SecretString,
    stream: Mutex<Option<WsStream>>,
}

impl WebSocketTransport {
    pub fn new(base_url: &str, token: SecretString) -> Self {
        Self { ws_url: stream_url(base_url), token, stream: Mutex::new(None) }
    }
}

#[async_trait]
impl StreamTransport for WebSocketTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        info!(
            event_name = "ingress.stream.connecting",
            url = %self.ws_url,
            "connecting to event stream"
        );

        let (mut ws_stream, _response) = connect_async(self.ws_url.as_str())
            .await
            .map_err(|error| TransportError::Connect(error.to_string()))?;

        // First outbound frame authenticates the stream.
        ws_stream
            .send(WsMessage::Text(authentication_challenge(&self.token)))
            .await
            .map_err(|error| TransportError::Send(error.to_string()))?;

        info!(event_name = "ingress.stream.auth_sent", "sent authentication challenge");

        *self.stream.lock().await = Some(ws_stream);
        Ok(())
    }

    async fn next_frame(&self) -> Result<Option<String>, TransportError> {
        let mut guard = self.stream.lock().await;
        if guard.is_none() {
            return Err(TransportError::Receive("stream is not connected".to_string()));
        }

        loop {
            let next = match guard.as_mut() {
                Some(stream) => stream.next().await,
                None => return Ok(None),
            };

            let Some(message) = next else {
                *guard = None;
                return Ok(None);
            };

            let message = message.map_err(|error| TransportError::Receive(error.to_string()))?;

            match message {
                WsMessage::Text(text) => return Ok(Some(text)),
                WsMessage::Ping(payload) => {
                    if let Some(stream) = guard.as_mut() {
                        stream
                            .send(WsMessage::Pong(payload))
                            .await
                            .map_err(|error| TransportError::Send(error.to_string()))?;
                    }
                }
                WsMessage::Close(_) => {
                    debug!(event_name = "ingress.stream.closed", "received close frame");
                    *guard = None;
                    return Ok(None);
                }
                // Binary, Pong, raw frames carry nothing for us.
                _ => {}
            }
        }
    }
}

//! WebSocket transport - framing and endpoint URL construction
//!
//! Knows nothing about message semantics beyond encoding an outbound
//! command into a text frame and decoding an inbound one into an event.

use anyhow::{anyhow, Context, Result};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::protocol::{self, ClientCommand, ProtocolError};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Build the WebSocket endpoint URL for a session from the HTTP base URL.
pub fn session_url(base_url: &str, session_id: i64, token: Option<&str>) -> Result<String> {
    let base = base_url.trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else if base.starts_with("wss://") || base.starts_with("ws://") {
        base.to_string()
    } else {
        return Err(anyhow!(ProtocolError::UnsupportedScheme(base.to_string())));
    };

    let mut url = format!("{ws_base}/ws/session/{session_id}/");
    if let Some(token) = token {
        url.push_str("?token=");
        url.push_str(token);
    }
    Ok(url)
}

/// Open a WebSocket connection to the session endpoint.
pub async fn connect(url: &str) -> Result<WsStream> {
    let (stream, _) = tokio_tungstenite::connect_async(url)
        .await
        .with_context(|| format!("failed to connect to {url}"))?;
    Ok(stream)
}

/// Encode an outbound command into a text frame.
pub fn command_frame(cmd: &ClientCommand) -> Result<Message> {
    Ok(Message::Text(protocol::encode(cmd)?.into()))
}

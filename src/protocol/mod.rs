//! Wire protocol for the session endpoint
//!
//! The authoritative peer speaks JSON text frames: every message is an
//! object discriminated by its `type` field.

mod message;

pub use message::{
    ClientCommand, ControlKind, FocusDistribution, Role, ServerEvent, SessionStats,
};

use anyhow::{anyhow, Result};
use thiserror::Error;

/// Maximum accepted chat message length in bytes, matching the peer's limit.
pub const MAX_CHAT_LEN: usize = 1000;

/// Maximum accepted inbound frame size (64 KB); anything larger is dropped.
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

/// Protocol-specific errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge { size: usize, max: usize },

    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),
}

/// Serialize an outbound command to its JSON text frame.
pub fn encode(cmd: &ClientCommand) -> Result<String> {
    Ok(serde_json::to_string(cmd)?)
}

/// Deserialize an inbound text frame into a [`ServerEvent`].
///
/// Unknown discriminants succeed as [`ServerEvent::Unknown`]; a frame that
/// is not a valid envelope at all is an error for the caller to log and drop.
pub fn decode(text: &str) -> Result<ServerEvent> {
    if text.len() > MAX_FRAME_SIZE {
        return Err(anyhow!(ProtocolError::FrameTooLarge {
            size: text.len(),
            max: MAX_FRAME_SIZE,
        }));
    }

    serde_json::from_str(text)
        .map_err(|e| anyhow!(ProtocolError::MalformedEnvelope(e.to_string())))
}

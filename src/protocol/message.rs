//! Message types for the session wire protocol

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Participant role within a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Instructor,
    #[default]
    Student,
}

/// Session lifecycle verbs carried by `session.control` messages.
///
/// Verbs added by newer servers decode to [`ControlKind::Unknown`] and are
/// ignored by the reducer with a logged warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    Start,
    Pause,
    Resume,
    End,
    #[serde(other)]
    Unknown,
}

/// Three-bucket focus score distribution (high >= 0.8, medium [0.6, 0.8),
/// low < 0.6).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusDistribution {
    pub high: u32,
    pub medium: u32,
    pub low: u32,
}

/// Aggregate session statistics, pushed wholesale by the authoritative peer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionStats {
    pub total_participants: u32,
    pub active_participants: u32,
    pub average_focus_score: f64,
    /// Session duration in seconds.
    pub session_duration: f64,
    pub focus_distribution: FocusDistribution,
}

/// Messages received from the session endpoint.
///
/// The envelope is a JSON object discriminated by its `type` field.
/// Discriminants this client does not know decode to [`ServerEvent::Unknown`]
/// so newer servers never tear down the connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Sent once per accepted connection; carries the local user's identity.
    #[serde(rename = "connection.established")]
    ConnectionEstablished {
        session_id: i64,
        #[serde(default)]
        user_id: Option<i64>,
        #[serde(default)]
        user_role: Role,
        #[serde(default)]
        message: Option<String>,
    },

    /// A participant joined (or rejoined) the session.
    #[serde(rename = "session.joined")]
    SessionJoined {
        user_id: i64,
        #[serde(default)]
        user_name: Option<String>,
        #[serde(default)]
        user_role: Role,
        #[serde(default)]
        timestamp: Option<DateTime<Utc>>,
    },

    /// A participant left the session.
    #[serde(rename = "session.left")]
    SessionLeft {
        user_id: i64,
        #[serde(default)]
        user_name: Option<String>,
        #[serde(default)]
        user_role: Role,
        #[serde(default)]
        timestamp: Option<DateTime<Utc>>,
    },

    /// A participant's latest focus score.
    #[serde(rename = "focus.update")]
    FocusUpdate {
        user_id: i64,
        #[serde(default)]
        user_name: Option<String>,
        #[serde(default)]
        user_role: Role,
        focus_score: f64,
        #[serde(default)]
        timestamp: Option<DateTime<Utc>>,
    },

    /// Instructor lifecycle command broadcast to all participants.
    #[serde(rename = "session.control")]
    SessionControl {
        control_type: ControlKind,
        #[serde(default)]
        sent_by: Option<i64>,
        #[serde(default)]
        sent_by_name: Option<String>,
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        timestamp: Option<DateTime<Utc>>,
    },

    /// Terminal override: the session is over regardless of prior ordering.
    #[serde(rename = "session.ended")]
    SessionEnded {
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        end_time: Option<DateTime<Utc>>,
        #[serde(default)]
        sent_by: Option<i64>,
    },

    /// Authoritative elapsed-time correction.
    #[serde(rename = "timer.update")]
    TimerUpdate {
        elapsed_time: f64,
        #[serde(default)]
        sent_by: Option<i64>,
        #[serde(default)]
        timestamp: Option<DateTime<Utc>>,
    },

    /// Chat broadcast from any participant.
    #[serde(rename = "chat.message")]
    ChatMessage {
        user_id: i64,
        #[serde(default)]
        user_name: Option<String>,
        #[serde(default)]
        user_role: Role,
        message: String,
        #[serde(default)]
        timestamp: Option<DateTime<Utc>>,
    },

    /// Aggregate statistics snapshot; replaces the previous one wholesale.
    #[serde(rename = "session.stats")]
    SessionStatsUpdate {
        stats: SessionStats,
        #[serde(default)]
        timestamp: Option<DateTime<Utc>>,
    },

    /// Server-side acknowledgement of a focus update.
    #[serde(rename = "focus.update.ack")]
    FocusUpdateAck {
        #[serde(default)]
        message: Option<String>,
    },

    /// Non-fatal error report from the peer.
    #[serde(rename = "error")]
    Error {
        #[serde(default)]
        message: Option<String>,
    },

    /// Keepalive response.
    #[serde(rename = "pong")]
    Pong {
        #[serde(default)]
        ts: Option<DateTime<Utc>>,
    },

    /// Forward-compatibility catch-all for discriminants added server-side.
    #[serde(other)]
    Unknown,
}

/// Messages sent to the session endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ClientCommand {
    /// Report the local user's focus score, in [0, 1].
    #[serde(rename = "focus_update")]
    FocusUpdate { focus_score: f64 },

    /// Send a chat message to all participants.
    #[serde(rename = "chat_message")]
    ChatMessage { message: String },

    /// Instructor lifecycle command.
    #[serde(rename = "session_control")]
    SessionControl { control_type: ControlKind },

    /// Leave the session without dropping the connection.
    #[serde(rename = "leave_session")]
    LeaveSession,

    /// Ask the peer to rebroadcast the aggregate statistics snapshot.
    #[serde(rename = "request_session_stats")]
    RequestStats,

    /// Keepalive probe; answered with `pong`.
    #[serde(rename = "ping")]
    Ping,
}

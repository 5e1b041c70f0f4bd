//! Session domain model - the client-side view of one live session

mod state;

pub use state::{Applied, SessionState};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::protocol::Role;

/// Transport-level connection state, distinct from [`SessionStatus`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connecting,
    Open,
    Closing,
    #[default]
    Closed,
}

/// Session-level control status; survives reconnects unchanged until an
/// authoritative control message updates it. `Ended` is terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Waiting,
    Active,
    Paused,
    Ended,
}

/// One member of the session roster.
///
/// Participants are unique per `user_id` and never removed: a `session.left`
/// event marks them inactive so historical presence is preserved for the
/// session's duration.
#[derive(Debug, Clone, Serialize)]
pub struct Participant {
    pub user_id: i64,
    pub name: String,
    pub role: Role,
    pub is_active: bool,
    /// Latest reported focus score, clamped to [0, 1].
    pub focus_score: f64,
    pub last_focus_update: Option<DateTime<Utc>>,
    pub joined_at: DateTime<Utc>,
}

/// One chat log entry.
#[derive(Debug, Clone, Serialize)]
pub struct ChatEntry {
    /// Locally synthesized; unique within this client only.
    pub id: Uuid,
    pub user_id: i64,
    pub author: String,
    pub role: Role,
    pub body: String,
    pub timestamp: DateTime<Utc>,
}

/// Identity of the local user, learned from `connection.established`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LocalUser {
    pub user_id: i64,
    pub role: Role,
}

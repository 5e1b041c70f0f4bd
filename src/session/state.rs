//! Session state reducer - the single authoritative client-side view
//!
//! Every inbound event funnels through [`SessionState::apply`]; nothing else
//! mutates the view. The engine publishes a full snapshot after each apply,
//! so readers never observe a partial update.

use std::collections::VecDeque;

use chrono::Utc;
use uuid::Uuid;

use super::{ChatEntry, ConnectionState, LocalUser, Participant, SessionStatus};
use crate::protocol::{ControlKind, FocusDistribution, Role, ServerEvent, SessionStats};

/// Outcome of applying one event, for the engine to act on.
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    /// State may have changed; nothing further to do.
    None,
    /// The connection handshake completed and local identity is known.
    Established,
    /// The local user's own focus score came back from the peer.
    LocalFocus(f64),
    /// The peer reported a non-fatal error.
    PeerError(String),
    /// The session reached its terminal status; the engine must quiesce.
    Ended,
}

/// Client-side view of one live session.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub session_id: i64,
    pub connection: ConnectionState,
    /// True while the engine is between retry attempts.
    pub reconnecting: bool,
    pub reconnect_attempt: u32,
    pub local_user: Option<LocalUser>,
    pub status: SessionStatus,
    pub participants: Vec<Participant>,
    pub chat: VecDeque<ChatEntry>,
    /// Total chat messages ever appended, including ones the ring dropped.
    pub chat_seen: u64,
    /// Latest aggregate snapshot from the peer, if any has arrived.
    pub stats: Option<SessionStats>,
    pub elapsed_secs: f64,
    pub my_focus_score: f64,
    chat_capacity: usize,
}

impl SessionState {
    pub fn new(session_id: i64, chat_capacity: usize) -> Self {
        Self {
            session_id,
            connection: ConnectionState::Closed,
            reconnecting: false,
            reconnect_attempt: 0,
            local_user: None,
            status: SessionStatus::Waiting,
            participants: Vec::new(),
            chat: VecDeque::new(),
            chat_seen: 0,
            stats: None,
            elapsed_secs: 0.0,
            my_focus_score: 0.0,
            chat_capacity: chat_capacity.max(1),
        }
    }

    /// Apply one inbound event. This is the only mutation path for
    /// session-level state; connection-level transitions go through the
    /// `note_*` methods, also called only from the engine loop.
    pub fn apply(&mut self, event: &ServerEvent) -> Applied {
        match event {
            ServerEvent::ConnectionEstablished {
                user_id, user_role, ..
            } => {
                if let Some(id) = user_id {
                    self.local_user = Some(LocalUser {
                        user_id: *id,
                        role: *user_role,
                    });
                }
                self.connection = ConnectionState::Open;
                self.reconnecting = false;
                self.reconnect_attempt = 0;
                Applied::Established
            }

            ServerEvent::SessionJoined {
                user_id,
                user_name,
                user_role,
                ..
            } => {
                self.upsert_participant(*user_id, user_name.as_deref(), *user_role, None);
                Applied::None
            }

            ServerEvent::SessionLeft { user_id, .. } => {
                if let Some(p) = self.participants.iter_mut().find(|p| p.user_id == *user_id) {
                    p.is_active = false;
                } else {
                    tracing::debug!("session.left for unknown participant {}", user_id);
                }
                Applied::None
            }

            ServerEvent::FocusUpdate {
                user_id,
                user_name,
                user_role,
                focus_score,
                timestamp,
            } => {
                let score = focus_score.clamp(0.0, 1.0);
                let p =
                    self.upsert_participant(*user_id, user_name.as_deref(), *user_role, Some(score));
                p.last_focus_update = Some(timestamp.unwrap_or_else(Utc::now));

                if self.local_user.map(|u| u.user_id) == Some(*user_id) {
                    self.my_focus_score = score;
                    Applied::LocalFocus(score)
                } else {
                    Applied::None
                }
            }

            ServerEvent::SessionControl { control_type, .. } => {
                if self.status == SessionStatus::Ended {
                    tracing::debug!("ignoring {:?} control after session end", control_type);
                    return Applied::None;
                }
                match control_type {
                    ControlKind::Start | ControlKind::Resume => {
                        self.status = SessionStatus::Active;
                        Applied::None
                    }
                    ControlKind::Pause => {
                        self.status = SessionStatus::Paused;
                        Applied::None
                    }
                    ControlKind::End => {
                        self.status = SessionStatus::Ended;
                        Applied::Ended
                    }
                    ControlKind::Unknown => {
                        tracing::warn!("unrecognized session control verb, ignoring");
                        Applied::None
                    }
                }
            }

            ServerEvent::SessionEnded { .. } => {
                // Terminal override, independent of session.control ordering.
                let first = self.status != SessionStatus::Ended;
                self.status = SessionStatus::Ended;
                self.connection = ConnectionState::Closed;
                if first {
                    Applied::Ended
                } else {
                    Applied::None
                }
            }

            ServerEvent::TimerUpdate { elapsed_time, .. } => {
                // Server clock wins over the local estimate: snap, never
                // interpolate.
                self.elapsed_secs = elapsed_time.max(0.0);
                Applied::None
            }

            ServerEvent::ChatMessage {
                user_id,
                user_name,
                user_role,
                message,
                timestamp,
            } => {
                self.chat.push_back(ChatEntry {
                    id: Uuid::new_v4(),
                    user_id: *user_id,
                    author: user_name.clone().unwrap_or_else(|| "Unknown".to_string()),
                    role: *user_role,
                    body: message.clone(),
                    timestamp: timestamp.unwrap_or_else(Utc::now),
                });
                self.chat_seen += 1;
                while self.chat.len() > self.chat_capacity {
                    self.chat.pop_front();
                }
                Applied::None
            }

            ServerEvent::SessionStatsUpdate { stats, .. } => {
                self.stats = Some(stats.clone());
                Applied::None
            }

            ServerEvent::FocusUpdateAck { .. } | ServerEvent::Pong { .. } => Applied::None,

            ServerEvent::Error { message } => Applied::PeerError(
                message
                    .clone()
                    .unwrap_or_else(|| "unspecified server error".to_string()),
            ),

            ServerEvent::Unknown => {
                tracing::trace!("dropping unknown server event");
                Applied::None
            }
        }
    }

    /// Advance the local elapsed-time clock by one second.
    ///
    /// Ticks only while the session is active; paused and ended sessions
    /// keep their last value until an authoritative `timer.update` arrives.
    pub fn tick(&mut self) -> bool {
        if self.status == SessionStatus::Active {
            self.elapsed_secs += 1.0;
            true
        } else {
            false
        }
    }

    /// Transport is dialing (attempt 0) or redialing (attempt > 0).
    pub fn note_connecting(&mut self, attempt: u32) {
        self.connection = ConnectionState::Connecting;
        self.reconnecting = attempt > 0;
        self.reconnect_attempt = attempt;
    }

    /// Transport opened; identity confirmation still pending.
    pub fn note_open(&mut self) {
        self.connection = ConnectionState::Open;
        self.reconnecting = false;
        self.reconnect_attempt = 0;
    }

    /// Local side is flushing a close frame.
    pub fn note_closing(&mut self) {
        self.connection = ConnectionState::Closing;
    }

    /// Transport is down.
    pub fn note_closed(&mut self) {
        self.connection = ConnectionState::Closed;
    }

    /// A retry is scheduled after a dropped connection.
    pub fn note_reconnecting(&mut self, attempt: u32) {
        self.connection = ConnectionState::Closed;
        self.reconnecting = true;
        self.reconnect_attempt = attempt;
    }

    /// Number of participants currently marked active.
    pub fn active_participants(&self) -> usize {
        self.participants.iter().filter(|p| p.is_active).count()
    }

    pub fn participant(&self, user_id: i64) -> Option<&Participant> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }

    /// The aggregate statistics to display: the peer's snapshot when one has
    /// arrived, otherwise a fallback derived from the roster we hold.
    pub fn stats_view(&self) -> SessionStats {
        if let Some(stats) = &self.stats {
            return stats.clone();
        }

        let students: Vec<&Participant> = self
            .participants
            .iter()
            .filter(|p| p.role == Role::Student)
            .collect();
        let active: Vec<&&Participant> = students.iter().filter(|p| p.is_active).collect();

        let mut distribution = FocusDistribution::default();
        let mut sum = 0.0;
        for p in &active {
            sum += p.focus_score;
            if p.focus_score >= 0.8 {
                distribution.high += 1;
            } else if p.focus_score >= 0.6 {
                distribution.medium += 1;
            } else {
                distribution.low += 1;
            }
        }

        SessionStats {
            total_participants: students.len() as u32,
            active_participants: active.len() as u32,
            average_focus_score: if active.is_empty() {
                0.0
            } else {
                sum / active.len() as f64
            },
            session_duration: self.elapsed_secs,
            focus_distribution: distribution,
        }
    }

    /// Insert or update a roster entry, preserving join order.
    fn upsert_participant(
        &mut self,
        user_id: i64,
        name: Option<&str>,
        role: Role,
        focus_score: Option<f64>,
    ) -> &mut Participant {
        let idx = match self.participants.iter().position(|p| p.user_id == user_id) {
            Some(idx) => {
                let p = &mut self.participants[idx];
                p.is_active = true;
                if let Some(name) = name {
                    p.name = name.to_string();
                }
                if let Some(score) = focus_score {
                    p.focus_score = score;
                }
                idx
            }
            None => {
                self.participants.push(Participant {
                    user_id,
                    name: name.unwrap_or("Unknown").to_string(),
                    role,
                    is_active: true,
                    focus_score: focus_score.unwrap_or(0.0),
                    last_focus_update: None,
                    joined_at: Utc::now(),
                });
                self.participants.len() - 1
            }
        };
        &mut self.participants[idx]
    }
}

//! Session client - the public handle over the sync engine
//!
//! A [`SessionClient`] owns exactly one engine task for one live session
//! view. Commands flow in over an mpsc channel, state snapshots flow out
//! over a watch channel, and out-of-band signals (reconnect exhaustion,
//! server errors, session end) arrive as [`Notice`]s.

mod backoff;
mod engine;
mod transport;

pub use backoff::ReconnectPolicy;
pub use transport::session_url;

use std::time::Duration;

use anyhow::Result;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::protocol::ControlKind;
use crate::session::{ConnectionState, SessionState};

/// Caller-originated operations, consumed by the engine loop.
#[derive(Debug)]
pub(crate) enum Command {
    Focus(f64),
    Chat(String),
    Control(ControlKind),
    Leave,
    RequestStats,
    Disconnect,
}

/// Out-of-band signals emitted by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// The connection handshake completed.
    Connected,
    /// A retry is scheduled after a dropped connection.
    Reconnecting { attempt: u32 },
    /// The retry budget is spent; the engine has quiesced. A fresh
    /// [`SessionClient::connect`] is the manual retry affordance.
    ReconnectFailed,
    /// The local user's own focus score echoed back from the peer.
    LocalFocus { score: f64 },
    /// Non-fatal error reported by the peer.
    ServerError { message: String },
    /// The session reached its terminal status.
    Ended,
}

/// Handle to one live session view.
///
/// Dropping the handle closes the command channel, which the engine treats
/// as a disconnect request.
pub struct SessionClient {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<SessionState>,
    task: JoinHandle<()>,
}

impl SessionClient {
    /// Spawn the engine for `session_id` and start connecting.
    ///
    /// Returns the handle and the notice stream. Connection establishment
    /// happens on the engine task; observe progress through [`state`] and
    /// the notices.
    ///
    /// [`state`]: SessionClient::state
    pub fn connect(config: &Config, session_id: i64) -> Result<(Self, mpsc::Receiver<Notice>)> {
        let url = transport::session_url(
            &config.server.base_url,
            session_id,
            config.server.token.as_deref(),
        )?;

        let policy = ReconnectPolicy::new(
            Duration::from_millis(config.reconnect.base_delay_ms),
            Duration::from_millis(config.reconnect.max_delay_ms),
            config.reconnect.max_attempts,
        );

        let (command_tx, command_rx) = mpsc::channel(64);
        let (notice_tx, notice_rx) = mpsc::channel(64);
        let initial = SessionState::new(session_id, config.session.chat_history_limit);
        let (state_tx, state_rx) = watch::channel(initial.clone());

        let engine = engine::Engine::new(
            url,
            policy,
            Duration::from_secs(config.session.keepalive_secs.max(1)),
            Duration::from_millis(config.focus.min_send_interval_ms),
            command_rx,
            state_tx,
            notice_tx,
            initial,
        );
        let task = tokio::spawn(engine.run());

        Ok((
            Self {
                commands: command_tx,
                state: state_rx,
                task,
            },
            notice_rx,
        ))
    }

    /// Subscribe to state snapshots.
    pub fn state(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Current state snapshot.
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// True while the transport is open.
    pub fn is_open(&self) -> bool {
        self.state.borrow().connection == ConnectionState::Open
    }

    /// Report the local focus score. Silently dropped while disconnected or
    /// inside the minimum send interval; stale telemetry is never queued.
    pub fn send_focus_update(&self, score: f64) {
        self.command(Command::Focus(score));
    }

    /// Send a chat message. Silently dropped while disconnected; the local
    /// chat log changes only when the message arrives back from the peer.
    pub fn send_chat_message(&self, text: impl Into<String>) {
        self.command(Command::Chat(text.into()));
    }

    /// Send an instructor lifecycle command.
    pub fn send_session_control(&self, control: ControlKind) {
        self.command(Command::Control(control));
    }

    /// Announce departure without tearing down the connection.
    pub fn send_leave_session(&self) {
        self.command(Command::Leave);
    }

    /// Ask the peer to rebroadcast aggregate statistics.
    pub fn request_stats(&self) {
        self.command(Command::RequestStats);
    }

    /// Tear down the connection and suppress further auto-reconnect.
    /// Idempotent; cancels a pending backoff retry deterministically.
    pub async fn disconnect(self) {
        let _ = self.commands.try_send(Command::Disconnect);
        drop(self.commands);
        let _ = self.task.await;
    }

    fn command(&self, cmd: Command) {
        // try_send on purpose: a full or closed channel means the engine is
        // busy tearing down or gone, and sends while disconnected are
        // defined to be silent no-ops.
        if let Err(e) = self.commands.try_send(cmd) {
            tracing::trace!("command dropped: {e}");
        }
    }
}
